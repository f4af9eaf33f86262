//! Member domain model and boundary transfer shapes.
//!
//! # Responsibility
//! - Define the canonical `Member` record persisted by the member store.
//! - Define the transfer shapes used by callers of the member service.
//! - Own the entity <-> view mapping contract.
//!
//! # Invariants
//! - `member_id` is immutable once assigned.
//! - `membership_date` is immutable once set; stores must not rewrite it.
//! - `password_hash` is a one-way hash, never plaintext.
//! - `MemberView` is a strict field subset of `Member` without credentials.

use crate::model::email::is_valid_email;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Stable identifier of a library member.
pub type MemberId = i64;

/// Access role of a member account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular library patron.
    User,
    /// Staff member managing loans and fines.
    Librarian,
    /// Full administrative access.
    Admin,
}

/// Canonical persisted member record.
#[derive(Clone, PartialEq, Eq)]
pub struct Member {
    pub member_id: MemberId,
    pub role: Role,
    pub name: String,
    pub username: String,
    pub email: String,
    /// One-way password hash produced by a `PasswordVerifier`.
    pub password_hash: String,
    pub membership_date: NaiveDate,
}

impl Debug for Member {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member")
            .field("member_id", &self.member_id)
            .field("role", &self.role)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("membership_date", &self.membership_date)
            .finish()
    }
}

/// Validation failures for member records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberValidationError {
    BlankName,
    BlankUsername,
    InvalidEmail(String),
    BlankPasswordHash,
}

impl Display for MemberValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "member name must not be blank"),
            Self::BlankUsername => write!(f, "member username must not be blank"),
            Self::InvalidEmail(value) => write!(f, "invalid member email: `{value}`"),
            Self::BlankPasswordHash => write!(f, "member password hash must not be blank"),
        }
    }
}

impl Error for MemberValidationError {}

impl Member {
    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), MemberValidationError> {
        if self.name.trim().is_empty() {
            return Err(MemberValidationError::BlankName);
        }
        if self.username.trim().is_empty() {
            return Err(MemberValidationError::BlankUsername);
        }
        if !is_valid_email(self.email.as_str()) {
            return Err(MemberValidationError::InvalidEmail(self.email.clone()));
        }
        if self.password_hash.is_empty() {
            return Err(MemberValidationError::BlankPasswordHash);
        }
        Ok(())
    }

    /// Overwrites the profile fields carried by an `UpdateRequest`.
    ///
    /// Role, password hash, membership date and id are left untouched.
    pub fn apply_update(&mut self, update: &UpdateRequest) {
        self.name = update.name.clone();
        self.username = update.username.clone();
        self.email = update.email.clone();
    }
}

/// Public member projection returned across the service boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub member_id: MemberId,
    pub role: Role,
    pub name: String,
    pub username: String,
    pub email: String,
    pub membership_date: NaiveDate,
}

impl From<&Member> for MemberView {
    fn from(member: &Member) -> Self {
        Self {
            member_id: member.member_id,
            role: member.role,
            name: member.name.clone(),
            username: member.username.clone(),
            email: member.email.clone(),
            membership_date: member.membership_date,
        }
    }
}

impl From<Member> for MemberView {
    fn from(member: Member) -> Self {
        Self {
            member_id: member.member_id,
            role: member.role,
            name: member.name,
            username: member.username,
            email: member.email,
            membership_date: member.membership_date,
        }
    }
}

/// Registration payload for `add_member`.
///
/// The password arrives already hashed; hashing fresh plaintext is the
/// caller's job (see `PasswordVerifier::hash`).
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub member_id: MemberId,
    pub role: Role,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// Defaults to the current UTC date when absent.
    pub membership_date: Option<NaiveDate>,
}

impl Debug for NewMember {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewMember")
            .field("member_id", &self.member_id)
            .field("role", &self.role)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("membership_date", &self.membership_date)
            .finish()
    }
}

impl NewMember {
    /// Converts the payload into a persistable record.
    pub fn into_member(self, today: NaiveDate) -> Member {
        Member {
            member_id: self.member_id,
            role: self.role,
            name: self.name,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            membership_date: self.membership_date.unwrap_or(today),
        }
    }
}

/// Profile update payload. Carries no id, password or membership date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub name: String,
    pub username: String,
    pub email: String,
}

/// Password change payload. Both values are transient plaintext.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

impl Debug for PasswordChangeRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordChangeRequest")
            .field("current_password", &"<redacted>")
            .field("new_password", &"<redacted>")
            .finish()
    }
}
