//! Newsletter subscriber record and subscribe/unsubscribe outcomes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted newsletter subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub subscriber_id: i64,
    /// Normalized (trimmed, lowercase) address.
    pub email: String,
    /// Opaque unsubscribe token handed out in newsletter mails.
    pub token: Uuid,
    pub active: bool,
}

/// Successful result of a subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
    /// First subscription for this address.
    Subscribed,
    /// A previously unsubscribed address was reactivated.
    Resubscribed,
}

impl SubscribeOutcome {
    /// User-facing confirmation message.
    pub fn message(self) -> &'static str {
        match self {
            Self::Subscribed => "You have successfully subscribed!",
            Self::Resubscribed => "You have successfully re-subscribed!",
        }
    }
}

/// Successful result of an unsubscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsubscribeOutcome {
    Unsubscribed,
}

impl UnsubscribeOutcome {
    /// User-facing confirmation message.
    pub fn message(self) -> &'static str {
        match self {
            Self::Unsubscribed => "You have successfully unsubscribed!",
        }
    }
}
