//! Core domain logic for the LibraryMan backend.
//! This crate is the single source of truth for member and newsletter
//! business invariants; HTTP or CLI hosts call into its services.

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod security;
pub mod service;

pub use cache::{FillTicket, InMemoryMemberCache, MemberLookupCache};
pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, init_logging_with, logging_status};
pub use model::member::{
    Member, MemberId, MemberValidationError, MemberView, NewMember, PasswordChangeRequest, Role,
    UpdateRequest,
};
pub use model::newsletter::{SubscribeOutcome, Subscriber, UnsubscribeOutcome};
pub use model::page::{Page, PageRequest, SortDirection, SortOrder};
pub use notify::{NotificationKind, NotificationRecord, NotificationSink, SqliteNotificationLog};
pub use repo::member_repo::{MemberStore, SqliteMemberStore};
pub use repo::obligations_repo::{Obligations, ObligationsChecker, SqliteObligationsChecker};
pub use repo::subscriber_repo::{SqliteSubscriberRepository, SubscriberRepository};
pub use repo::{StoreError, StoreResult};
pub use security::password::{BcryptPasswordVerifier, PasswordHashError, PasswordVerifier};
pub use service::member_service::{MemberService, MemberServiceError, MemberServiceResult};
pub use service::newsletter_service::{NewsletterError, NewsletterService};

/// Member service wired to the SQLite collaborators of one connection.
pub type SqliteMemberService<'conn> = MemberService<
    SqliteMemberStore<'conn>,
    SqliteObligationsChecker<'conn>,
    BcryptPasswordVerifier,
    SqliteNotificationLog<'conn>,
>;

/// Builds a member service over `conn` using configured security and paging.
pub fn sqlite_member_service<'conn>(
    conn: &'conn rusqlite::Connection,
    config: &CoreConfig,
    cache: std::sync::Arc<dyn MemberLookupCache>,
) -> Result<SqliteMemberService<'conn>, PasswordHashError> {
    let service = MemberService::new(
        SqliteMemberStore::new(conn),
        SqliteObligationsChecker::new(conn),
        config.password_verifier()?,
        SqliteNotificationLog::new(conn),
        cache,
    )
    .with_max_page_size(config.members.max_page_size);
    Ok(service)
}

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
