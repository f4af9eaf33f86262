//! Account notification capability.
//!
//! # Responsibility
//! - Define the fire-and-forget `NotificationSink` used by member workflows.
//! - Provide a SQLite notification log as the default sink.
//!
//! # Invariants
//! - Sinks never return errors to callers; failures are logged and dropped.
//! - Messages carry no credential material.

use crate::model::member::{Member, MemberId};
use log::{info, warn};
use rusqlite::{params, Connection};

/// Kind of account event a notification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    AccountCreated,
    AccountUpdated,
    AccountDeleted,
}

impl NotificationKind {
    /// Stable string id persisted in `notifications.kind`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccountCreated => "account_created",
            Self::AccountUpdated => "account_updated",
            Self::AccountDeleted => "account_deleted",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "account_created" => Some(Self::AccountCreated),
            "account_updated" => Some(Self::AccountUpdated),
            "account_deleted" => Some(Self::AccountDeleted),
            _ => None,
        }
    }

    /// Renders the member-facing message body.
    pub fn render(self, member: &Member) -> String {
        match self {
            Self::AccountCreated => format!(
                "Dear {}, welcome to the library! Your account `{}` was created on {}.",
                member.name, member.username, member.membership_date
            ),
            Self::AccountUpdated => format!(
                "Dear {}, your account details were updated. If this was not you, contact the library.",
                member.name
            ),
            Self::AccountDeleted => format!(
                "Dear {}, your library account `{}` has been deleted. We hope to see you again.",
                member.name, member.username
            ),
        }
    }
}

/// Fire-and-forget account notifications.
pub trait NotificationSink {
    fn notify_account_created(&self, member: &Member);
    fn notify_account_updated(&self, member: &Member);
    fn notify_account_deleted(&self, member: &Member);
}

/// Persisted notification row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub notification_id: i64,
    pub member_id: MemberId,
    pub recipient_email: String,
    pub kind: NotificationKind,
    pub message: String,
}

/// Sink that appends every notification to the `notifications` table.
pub struct SqliteNotificationLog<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationLog<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Lists notifications sent to one member, oldest first.
    pub fn list_for_member(&self, member_id: MemberId) -> rusqlite::Result<Vec<NotificationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT notification_id, member_id, recipient_email, kind, message
             FROM notifications
             WHERE member_id = ?1
             ORDER BY notification_id ASC;",
        )?;
        let rows = stmt.query_map([member_id], |row| {
            let kind_text: String = row.get(3)?;
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                kind_text,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (notification_id, member_id, recipient_email, kind_text, message) = row?;
            // CHECK constraint keeps unknown kinds out of the table.
            if let Some(kind) = NotificationKind::parse(&kind_text) {
                records.push(NotificationRecord {
                    notification_id,
                    member_id,
                    recipient_email,
                    kind,
                    message,
                });
            }
        }
        Ok(records)
    }

    fn record(&self, kind: NotificationKind, member: &Member) {
        let message = kind.render(member);
        let result = self.conn.execute(
            "INSERT INTO notifications (member_id, recipient_email, kind, message)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                member.member_id,
                member.email.as_str(),
                kind.as_str(),
                message
            ],
        );

        match result {
            Ok(_) => info!(
                "event=notification_sent module=notify status=ok kind={} member_id={}",
                kind.as_str(),
                member.member_id
            ),
            Err(err) => warn!(
                "event=notification_sent module=notify status=error kind={} member_id={} error={}",
                kind.as_str(),
                member.member_id,
                err
            ),
        }
    }
}

impl NotificationSink for SqliteNotificationLog<'_> {
    fn notify_account_created(&self, member: &Member) {
        self.record(NotificationKind::AccountCreated, member);
    }

    fn notify_account_updated(&self, member: &Member) {
        self.record(NotificationKind::AccountUpdated, member);
    }

    fn notify_account_deleted(&self, member: &Member) {
        self.record(NotificationKind::AccountDeleted, member);
    }
}
