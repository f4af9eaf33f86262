//! Outstanding fine and active borrowing lookups.
//!
//! # Responsibility
//! - Answer whether a member still owes the library anything.
//!
//! # Invariants
//! - A fine is outstanding while `paid = 0`.
//! - A borrowing is active while `return_date IS NULL`.

use crate::model::member::MemberId;
use crate::repo::StoreResult;
use rusqlite::Connection;

/// Counts of open obligations for one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Obligations {
    pub outstanding_fines: u32,
    pub active_borrowings: u32,
}

impl Obligations {
    /// Returns true when nothing blocks account deletion.
    pub fn is_clear(&self) -> bool {
        self.outstanding_fines == 0 && self.active_borrowings == 0
    }
}

/// Capability queried before a member is deleted.
pub trait ObligationsChecker {
    fn obligations(&self, member_id: MemberId) -> StoreResult<Obligations>;
}

/// SQLite-backed checker over `fines` and `borrowings`.
pub struct SqliteObligationsChecker<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteObligationsChecker<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ObligationsChecker for SqliteObligationsChecker<'_> {
    fn obligations(&self, member_id: MemberId) -> StoreResult<Obligations> {
        let (fines, borrowings) = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM fines WHERE member_id = ?1 AND paid = 0),
                (SELECT COUNT(*) FROM borrowings WHERE member_id = ?1 AND return_date IS NULL);",
            [member_id],
            |row| Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?)),
        )?;

        Ok(Obligations {
            outstanding_fines: fines,
            active_borrowings: borrowings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Obligations;

    #[test]
    fn clear_only_without_fines_and_borrowings() {
        assert!(Obligations::default().is_clear());
        assert!(!Obligations {
            outstanding_fines: 1,
            active_borrowings: 0
        }
        .is_clear());
        assert!(!Obligations {
            outstanding_fines: 0,
            active_borrowings: 2
        }
        .is_clear());
    }
}
