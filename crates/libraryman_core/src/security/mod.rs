//! Credential primitives used by member workflows.

pub mod password;
