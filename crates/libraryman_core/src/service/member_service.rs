//! Member lifecycle and credential use-case service.
//!
//! # Responsibility
//! - Create, read, update and delete members through a `MemberStore`.
//! - Verify and rotate member passwords through a `PasswordVerifier`.
//! - Emit account notifications after successful writes.
//! - Keep the member lookup cache coherent with the store.
//!
//! # Invariants
//! - Every validation step runs before the first store write of a workflow.
//! - Every mutating path goes through `write_through`, which evicts the
//!   cached snapshot before and after the store write.
//! - Cache fills take a ticket before the store read; a fill racing a write
//!   is refused by the cache, so no pre-write snapshot is served once the
//!   write has returned.
//! - Notifications for create/update are sent only after the write succeeds.
//! - Deletion is refused while the member has outstanding obligations.

use crate::cache::MemberLookupCache;
use crate::model::member::{
    Member, MemberId, MemberValidationError, MemberView, NewMember, PasswordChangeRequest,
    UpdateRequest,
};
use crate::model::page::{Page, PageRequest};
use crate::notify::NotificationSink;
use crate::repo::member_repo::MemberStore;
use crate::repo::obligations_repo::ObligationsChecker;
use crate::repo::{StoreError, StoreResult};
use crate::security::password::{PasswordHashError, PasswordVerifier};
use chrono::Utc;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Default upper bound for `PageRequest::size`.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

const CURRENT_PASSWORD_INCORRECT: &str = "current password is incorrect";
const NEW_PASSWORD_UNCHANGED: &str = "new password must be different from the current password";

/// Errors returned by member workflows.
#[derive(Debug)]
pub enum MemberServiceError {
    /// No member exists with the given id.
    ResourceNotFound(MemberId),
    /// Pagination requested a property members cannot be sorted by.
    InvalidSortField(String),
    /// Wrong current password, or new password equal to the current one.
    InvalidCredential(&'static str),
    /// Unpaid fines or unreturned books prevent account deletion.
    DeletionBlocked {
        member_id: MemberId,
        outstanding_fines: u32,
        active_borrowings: u32,
    },
    /// Payload failed member field validation.
    Validation(MemberValidationError),
    /// Username or email already belongs to another member.
    Conflict(String),
    /// Store outage, hashing failure or corrupt persisted data.
    UnexpectedFailure(Box<dyn Error + Send + Sync>),
}

impl MemberServiceError {
    /// Stable machine-readable code for boundary status mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ResourceNotFound(_) => "resource_not_found",
            Self::InvalidSortField(_) => "invalid_sort_field",
            Self::InvalidCredential(_) => "invalid_credential",
            Self::DeletionBlocked { .. } => "deletion_blocked",
            Self::Validation(_) => "validation_failed",
            Self::Conflict(_) => "conflict",
            Self::UnexpectedFailure(_) => "unexpected_failure",
        }
    }
}

impl Display for MemberServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResourceNotFound(id) => write!(f, "member not found: {id}"),
            Self::InvalidSortField(property) => {
                write!(f, "the specified sort field `{property}` is invalid")
            }
            Self::InvalidCredential(reason) => write!(f, "{reason}"),
            Self::DeletionBlocked {
                member_id,
                outstanding_fines,
                active_borrowings,
            } => write!(
                f,
                "member {member_id} cannot be deleted: {outstanding_fines} outstanding fine(s), {active_borrowings} active borrowing(s)"
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict(details) => write!(f, "member already exists: {details}"),
            Self::UnexpectedFailure(err) => write!(f, "unexpected failure: {err}"),
        }
    }
}

impl Error for MemberServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::UnexpectedFailure(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<StoreError> for MemberServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { id, .. } => Self::ResourceNotFound(id),
            StoreError::UnknownSortField(property) => Self::InvalidSortField(property),
            StoreError::Validation(err) => Self::Validation(err),
            StoreError::Conflict(details) => Self::Conflict(details),
            other => Self::UnexpectedFailure(Box::new(other)),
        }
    }
}

impl From<PasswordHashError> for MemberServiceError {
    fn from(value: PasswordHashError) -> Self {
        Self::UnexpectedFailure(Box::new(value))
    }
}

pub type MemberServiceResult<T> = Result<T, MemberServiceError>;

/// Member use-case service over injected collaborators.
pub struct MemberService<S, O, P, N>
where
    S: MemberStore,
    O: ObligationsChecker,
    P: PasswordVerifier,
    N: NotificationSink,
{
    store: S,
    obligations: O,
    passwords: P,
    notifier: N,
    cache: Arc<dyn MemberLookupCache>,
    max_page_size: u32,
}

impl<S, O, P, N> MemberService<S, O, P, N>
where
    S: MemberStore,
    O: ObligationsChecker,
    P: PasswordVerifier,
    N: NotificationSink,
{
    /// Creates a service from its collaborators.
    pub fn new(
        store: S,
        obligations: O,
        passwords: P,
        notifier: N,
        cache: Arc<dyn MemberLookupCache>,
    ) -> Self {
        Self {
            store,
            obligations,
            passwords,
            notifier,
            cache,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Overrides the page size cap applied by `list_members`.
    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    /// Lists one page of members.
    ///
    /// An unknown sort property fails with `InvalidSortField`; the store's own
    /// error never leaks. Page size is clamped to `1..=max_page_size`.
    pub fn list_members(&self, request: &PageRequest) -> MemberServiceResult<Page<MemberView>> {
        let mut request = request.clone();
        request.size = request.size.clamp(1, self.max_page_size);

        match self.store.find_page(&request) {
            Ok(page) => Ok(page.map(MemberView::from)),
            Err(StoreError::UnknownSortField(property)) => {
                warn!(
                    "event=member_list module=member_service status=rejected reason=invalid_sort_field"
                );
                Err(MemberServiceError::InvalidSortField(property))
            }
            Err(err) => Err(MemberServiceError::UnexpectedFailure(Box::new(err))),
        }
    }

    /// Gets one member, serving repeated reads from the lookup cache.
    ///
    /// Absence is `Ok(None)`, never an error, and is not cached.
    pub fn get_member_by_id(&self, member_id: MemberId) -> MemberServiceResult<Option<MemberView>> {
        if let Some(view) = self.cache.get(member_id) {
            return Ok(Some(view));
        }

        let ticket = self.cache.begin_fill(member_id);
        let Some(member) = self.store.find_by_id(member_id).map_err(unexpected)? else {
            return Ok(None);
        };

        let view = MemberView::from(member);
        self.cache.put(view.clone(), ticket);
        Ok(Some(view))
    }

    /// Registers a member from a payload carrying an already-hashed password.
    ///
    /// The created notification receives the row as stored, so values the
    /// store keeps (such as an existing membership date) are reflected.
    pub fn add_member(&self, payload: NewMember) -> MemberServiceResult<MemberView> {
        let member = payload.into_member(Utc::now().date_naive());
        member.validate().map_err(MemberServiceError::Validation)?;

        let stored = self.write_through(member.member_id, || self.store.upsert(&member))?;
        self.notifier.notify_account_created(&stored);

        info!(
            "event=member_create module=member_service status=ok member_id={}",
            stored.member_id
        );
        Ok(MemberView::from(stored))
    }

    /// Overwrites name, username and email of an existing member.
    ///
    /// A member deleted between load and write yields `ResourceNotFound`;
    /// the row is never recreated.
    pub fn update_member(
        &self,
        member_id: MemberId,
        update: &UpdateRequest,
    ) -> MemberServiceResult<MemberView> {
        let mut member = self.load(member_id)?;
        member.apply_update(update);
        member.validate().map_err(MemberServiceError::Validation)?;

        let stored = self.write_through(member_id, || self.store.update(&member))?;
        self.notifier.notify_account_updated(&stored);

        info!("event=member_update module=member_service status=ok member_id={member_id}");
        Ok(MemberView::from(stored))
    }

    /// Deletes a member that has no outstanding fines or active borrowings.
    ///
    /// The deleted notification carries the pre-deletion snapshot and is sent
    /// before the store delete, so a delete that then fails still leaves the
    /// notice behind. Related borrowing and fine rows are removed by the store.
    pub fn delete_member(&self, member_id: MemberId) -> MemberServiceResult<()> {
        let member = self.load(member_id)?;

        let obligations = self.obligations.obligations(member_id).map_err(unexpected)?;
        if !obligations.is_clear() {
            warn!(
                "event=member_delete module=member_service status=blocked member_id={member_id} outstanding_fines={} active_borrowings={}",
                obligations.outstanding_fines, obligations.active_borrowings
            );
            return Err(MemberServiceError::DeletionBlocked {
                member_id,
                outstanding_fines: obligations.outstanding_fines,
                active_borrowings: obligations.active_borrowings,
            });
        }

        self.cache.evict(member_id);
        self.notifier.notify_account_deleted(&member);
        self.write_through(member_id, || self.store.delete(&member))?;

        info!("event=member_delete module=member_service status=ok member_id={member_id}");
        Ok(())
    }

    /// Rotates a member password after verifying the current one.
    ///
    /// # Errors
    /// - `ResourceNotFound` when the member does not exist.
    /// - `InvalidCredential` when `current_password` does not match, or when
    ///   `new_password` already matches the stored hash.
    /// - `UnexpectedFailure` when hashing fails; nothing is persisted.
    pub fn update_password(
        &self,
        member_id: MemberId,
        request: &PasswordChangeRequest,
    ) -> MemberServiceResult<()> {
        let mut member = self.load(member_id)?;

        if !self
            .passwords
            .matches(request.current_password.as_str(), member.password_hash.as_str())
        {
            warn!(
                "event=password_change module=member_service status=rejected member_id={member_id} reason=current_mismatch"
            );
            return Err(MemberServiceError::InvalidCredential(
                CURRENT_PASSWORD_INCORRECT,
            ));
        }

        // Compared against the stored credential rather than the submitted
        // current value, so equivalence follows the hashing scheme.
        if self
            .passwords
            .matches(request.new_password.as_str(), member.password_hash.as_str())
        {
            warn!(
                "event=password_change module=member_service status=rejected member_id={member_id} reason=unchanged"
            );
            return Err(MemberServiceError::InvalidCredential(NEW_PASSWORD_UNCHANGED));
        }

        member.password_hash = self.passwords.hash(request.new_password.as_str())?;
        self.write_through(member_id, || self.store.update(&member))?;

        info!("event=password_change module=member_service status=ok member_id={member_id}");
        Ok(())
    }

    /// Drops every cached member snapshot.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("event=member_cache_clear module=member_service status=ok");
    }

    fn load(&self, member_id: MemberId) -> MemberServiceResult<Member> {
        self.store
            .find_by_id(member_id)
            .map_err(unexpected)?
            .ok_or(MemberServiceError::ResourceNotFound(member_id))
    }

    /// Single write path for every mutation.
    ///
    /// The second eviction also invalidates fill tickets taken while the write
    /// was in flight, so a reader holding the pre-write row cannot cache it.
    fn write_through<T>(
        &self,
        member_id: MemberId,
        write: impl FnOnce() -> StoreResult<T>,
    ) -> MemberServiceResult<T> {
        self.cache.evict(member_id);
        let result = write();
        self.cache.evict(member_id);
        Ok(result?)
    }
}

fn unexpected(err: StoreError) -> MemberServiceError {
    MemberServiceError::UnexpectedFailure(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::MemberServiceError;
    use crate::db::DbError;
    use crate::repo::StoreError;

    #[test]
    fn store_errors_map_to_service_kinds() {
        let err = MemberServiceError::from(StoreError::UnknownSortField("password".to_string()));
        assert_eq!(err.kind(), "invalid_sort_field");

        let err = MemberServiceError::from(StoreError::NotFound {
            entity: "member",
            id: 9,
        });
        assert!(matches!(err, MemberServiceError::ResourceNotFound(9)));

        let err = MemberServiceError::from(StoreError::Conflict("members.email".to_string()));
        assert_eq!(err.kind(), "conflict");

        let err = MemberServiceError::from(StoreError::Db(DbError::UnsupportedSchemaVersion {
            db_version: 9,
            latest_supported: 4,
        }));
        assert_eq!(err.kind(), "unexpected_failure");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn deletion_blocked_message_names_counts() {
        let err = MemberServiceError::DeletionBlocked {
            member_id: 7,
            outstanding_fines: 1,
            active_borrowings: 2,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("1 outstanding fine"));
        assert!(rendered.contains("2 active borrowing"));
        assert_eq!(err.kind(), "deletion_blocked");
    }
}
