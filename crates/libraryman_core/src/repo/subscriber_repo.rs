//! Newsletter subscriber repository contract and SQLite implementation.
//!
//! # Invariants
//! - Emails are stored normalized; callers pass normalized values.
//! - Tokens are unique and never reassigned to another address.

use crate::model::newsletter::Subscriber;
use crate::repo::{bool_to_int, int_to_bool, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const SUBSCRIBER_SELECT_SQL: &str = "SELECT
    subscriber_id,
    email,
    token,
    active
FROM newsletter_subscribers";

/// Repository interface for newsletter subscribers.
pub trait SubscriberRepository {
    fn find_by_email(&self, email: &str) -> StoreResult<Option<Subscriber>>;
    fn find_by_token(&self, token: Uuid) -> StoreResult<Option<Subscriber>>;
    /// Inserts an active subscriber and returns the stored row.
    fn insert(&self, email: &str, token: Uuid) -> StoreResult<Subscriber>;
    fn set_active(&self, subscriber_id: i64, active: bool) -> StoreResult<()>;
}

/// SQLite-backed subscriber repository.
pub struct SqliteSubscriberRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSubscriberRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn find_one(&self, column: &str, value: &str) -> StoreResult<Option<Subscriber>> {
        let raw = self
            .conn
            .query_row(
                &format!("{SUBSCRIBER_SELECT_SQL} WHERE {column} = ?1;"),
                [value],
                read_raw_subscriber,
            )
            .optional()?;

        raw.map(RawSubscriber::into_subscriber).transpose()
    }
}

impl SubscriberRepository for SqliteSubscriberRepository<'_> {
    fn find_by_email(&self, email: &str) -> StoreResult<Option<Subscriber>> {
        self.find_one("email", email)
    }

    fn find_by_token(&self, token: Uuid) -> StoreResult<Option<Subscriber>> {
        self.find_one("token", token.to_string().as_str())
    }

    fn insert(&self, email: &str, token: Uuid) -> StoreResult<Subscriber> {
        self.conn.execute(
            "INSERT INTO newsletter_subscribers (email, token, active) VALUES (?1, ?2, 1);",
            params![email, token.to_string()],
        )?;

        Ok(Subscriber {
            subscriber_id: self.conn.last_insert_rowid(),
            email: email.to_string(),
            token,
            active: true,
        })
    }

    fn set_active(&self, subscriber_id: i64, active: bool) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE newsletter_subscribers
             SET
                active = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE subscriber_id = ?1;",
            params![subscriber_id, bool_to_int(active)],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "newsletter subscriber",
                id: subscriber_id,
            });
        }

        Ok(())
    }
}

struct RawSubscriber {
    subscriber_id: i64,
    email: String,
    token: String,
    active: i64,
}

impl RawSubscriber {
    fn into_subscriber(self) -> StoreResult<Subscriber> {
        let token = Uuid::parse_str(&self.token).map_err(|_| {
            StoreError::InvalidData(format!(
                "invalid token in newsletter_subscribers for id {}",
                self.subscriber_id
            ))
        })?;

        Ok(Subscriber {
            subscriber_id: self.subscriber_id,
            email: self.email,
            token,
            active: int_to_bool(self.active, "newsletter_subscribers.active")?,
        })
    }
}

fn read_raw_subscriber(row: &Row<'_>) -> rusqlite::Result<RawSubscriber> {
    Ok(RawSubscriber {
        subscriber_id: row.get("subscriber_id")?,
        email: row.get("email")?,
        token: row.get("token")?,
        active: row.get("active")?,
    })
}
