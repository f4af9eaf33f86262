//! Newsletter subscription use-case service.
//!
//! # Responsibility
//! - Subscribe, resubscribe and unsubscribe addresses.
//!
//! # Invariants
//! - Addresses are normalized (trimmed, lowercase) before lookup and storage.
//! - One row per address; resubscribing reactivates it and keeps its token.
//! - Tokens are never logged.

use crate::model::email::{is_valid_email, normalize_email};
use crate::model::newsletter::{SubscribeOutcome, UnsubscribeOutcome};
use crate::repo::subscriber_repo::SubscriberRepository;
use crate::repo::StoreError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Errors returned by newsletter flows.
#[derive(Debug)]
pub enum NewsletterError {
    InvalidEmail,
    AlreadySubscribed,
    /// Token is malformed or unknown.
    InvalidToken,
    AlreadyUnsubscribed,
    Repo(StoreError),
}

impl NewsletterError {
    /// User-facing message, matching the wording of the public endpoints.
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "Invalid email format.",
            Self::AlreadySubscribed => "Email is already subscribed.",
            Self::InvalidToken => "Invalid or expired token.",
            Self::AlreadyUnsubscribed => "You are already unsubscribed.",
            Self::Repo(_) => "An error occurred while processing your request.",
        }
    }
}

impl Display for NewsletterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl Error for NewsletterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for NewsletterError {
    fn from(value: StoreError) -> Self {
        Self::Repo(value)
    }
}

/// Newsletter service facade over a subscriber repository.
pub struct NewsletterService<R: SubscriberRepository> {
    repo: R,
}

impl<R: SubscriberRepository> NewsletterService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Subscribes an address, or reactivates a previously unsubscribed one.
    pub fn subscribe(&self, email: &str) -> Result<SubscribeOutcome, NewsletterError> {
        let email = normalize_email(email);
        if !is_valid_email(email.as_str()) {
            return Err(NewsletterError::InvalidEmail);
        }

        let outcome = match self.repo.find_by_email(email.as_str())? {
            Some(existing) if existing.active => return Err(NewsletterError::AlreadySubscribed),
            Some(existing) => {
                self.repo.set_active(existing.subscriber_id, true)?;
                SubscribeOutcome::Resubscribed
            }
            None => {
                self.repo.insert(email.as_str(), Uuid::new_v4())?;
                SubscribeOutcome::Subscribed
            }
        };

        info!("event=newsletter_subscribe module=newsletter status=ok outcome={outcome:?}");
        Ok(outcome)
    }

    /// Deactivates the subscription owning `token`.
    pub fn unsubscribe(&self, token: &str) -> Result<UnsubscribeOutcome, NewsletterError> {
        let token = Uuid::parse_str(token.trim()).map_err(|_| NewsletterError::InvalidToken)?;
        let subscriber = self
            .repo
            .find_by_token(token)?
            .ok_or(NewsletterError::InvalidToken)?;

        if !subscriber.active {
            return Err(NewsletterError::AlreadyUnsubscribed);
        }

        self.repo.set_active(subscriber.subscriber_id, false)?;
        info!("event=newsletter_unsubscribe module=newsletter status=ok");
        Ok(UnsubscribeOutcome::Unsubscribed)
    }

    /// Returns the unsubscribe token for an address, if subscribed before.
    ///
    /// Used when composing newsletter mails.
    pub fn token_for(&self, email: &str) -> Result<Option<Uuid>, NewsletterError> {
        let email = normalize_email(email);
        Ok(self
            .repo
            .find_by_email(email.as_str())?
            .map(|subscriber| subscriber.token))
    }
}
