//! Domain model for library members and newsletter subscribers.
//!
//! # Responsibility
//! - Define the canonical member record and the transfer shapes that cross
//!   the service boundary.
//! - Keep credential-bearing shapes separate from the public member view.
//!
//! # Invariants
//! - Every member is identified by a stable `MemberId`.
//! - `MemberView` never carries password material.

pub mod email;
pub mod member;
pub mod newsletter;
pub mod page;
