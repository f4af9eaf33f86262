//! Password hashing and verification capability.
//!
//! # Responsibility
//! - Hide the hashing algorithm behind `PasswordVerifier`.
//! - Provide the bcrypt-backed default implementation.
//!
//! # Invariants
//! - `hash` output is salted; two hashes of one password differ.
//! - `matches` never errors: malformed hashes simply do not match.

use bcrypt::{BcryptError, DEFAULT_COST};
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Lowest cost bcrypt accepts.
pub const MIN_BCRYPT_COST: u32 = 4;
/// Highest cost bcrypt accepts.
pub const MAX_BCRYPT_COST: u32 = 31;

/// Hashing failure (invalid cost, backend error).
#[derive(Debug)]
pub struct PasswordHashError {
    message: String,
}

impl PasswordHashError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for PasswordHashError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "password hashing failed: {}", self.message)
    }
}

impl Error for PasswordHashError {}

impl From<BcryptError> for PasswordHashError {
    fn from(value: BcryptError) -> Self {
        Self::new(value.to_string())
    }
}

/// One-way hash + verify capability.
pub trait PasswordVerifier {
    /// Returns whether `plain` hashes to `hash`.
    fn matches(&self, plain: &str, hash: &str) -> bool;
    /// Produces a fresh salted hash of `plain`.
    fn hash(&self, plain: &str) -> Result<String, PasswordHashError>;
}

/// bcrypt implementation with a fixed work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcryptPasswordVerifier {
    cost: u32,
}

impl BcryptPasswordVerifier {
    /// Creates a verifier, rejecting costs outside bcrypt's range.
    pub fn new(cost: u32) -> Result<Self, PasswordHashError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(PasswordHashError::new(format!(
                "bcrypt cost {cost} outside {MIN_BCRYPT_COST}..={MAX_BCRYPT_COST}"
            )));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptPasswordVerifier {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordVerifier for BcryptPasswordVerifier {
    fn matches(&self, plain: &str, hash: &str) -> bool {
        match bcrypt::verify(plain, hash) {
            Ok(matched) => matched,
            Err(err) => {
                warn!("event=password_verify module=security status=error error={err}");
                false
            }
        }
    }

    fn hash(&self, plain: &str) -> Result<String, PasswordHashError> {
        Ok(bcrypt::hash(plain, self.cost)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{BcryptPasswordVerifier, PasswordVerifier, MIN_BCRYPT_COST};

    fn fast_verifier() -> BcryptPasswordVerifier {
        BcryptPasswordVerifier::new(MIN_BCRYPT_COST).expect("min cost is valid")
    }

    #[test]
    fn hash_then_matches_roundtrip() {
        let verifier = fast_verifier();
        let hash = verifier.hash("correct horse").expect("hashing should succeed");

        assert!(verifier.matches("correct horse", &hash));
        assert!(!verifier.matches("battery staple", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let verifier = fast_verifier();
        let first = verifier.hash("same").expect("hash");
        let second = verifier.hash("same").expect("hash");
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_never_matches() {
        assert!(!fast_verifier().matches("anything", "not-a-bcrypt-hash"));
    }

    #[test]
    fn rejects_out_of_range_cost() {
        assert!(BcryptPasswordVerifier::new(3).is_err());
        assert!(BcryptPasswordVerifier::new(32).is_err());
        assert_eq!(fast_verifier().cost(), 4);
    }
}
