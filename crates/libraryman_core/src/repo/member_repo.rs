//! Member store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide keyed get, paginated list, upsert, update and delete over
//!   `members`.
//! - Translate sort property names into whitelisted SQL columns.
//!
//! # Invariants
//! - Write paths call `Member::validate()` before SQL mutations.
//! - Upsert never rewrites `membership_date` of an existing row.
//! - Unknown sort properties fail with `StoreError::UnknownSortField` before
//!   any SQL is prepared; property names never reach SQL text.
//! - Deleting a member cascades to its borrowings and fines.

use crate::model::member::{Member, MemberId, Role};
use crate::model::page::{Page, PageRequest, SortDirection, SortOrder};
use crate::repo::{StoreError, StoreResult};
use rusqlite::{params, Connection, Row};

const MEMBER_SELECT_SQL: &str = "SELECT
    member_id,
    role,
    name,
    username,
    email,
    password_hash,
    membership_date
FROM members";

const MEMBER_ENTITY: &str = "member";

/// Storage contract consumed by the member service.
pub trait MemberStore {
    fn find_by_id(&self, id: MemberId) -> StoreResult<Option<Member>>;
    /// Lists one page; fails with `UnknownSortField` on a bad sort key.
    fn find_page(&self, request: &PageRequest) -> StoreResult<Page<Member>>;
    /// Inserts or updates by `member_id` and returns the stored row.
    fn upsert(&self, member: &Member) -> StoreResult<Member>;
    /// Updates an existing row only; `NotFound` if it is gone.
    fn update(&self, member: &Member) -> StoreResult<Member>;
    fn delete(&self, member: &Member) -> StoreResult<()>;
    fn count(&self) -> StoreResult<u64>;
}

/// SQLite-backed member store.
pub struct SqliteMemberStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemberStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MemberStore for SqliteMemberStore<'_> {
    fn find_by_id(&self, id: MemberId) -> StoreResult<Option<Member>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMBER_SELECT_SQL} WHERE member_id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_member_row(row)?));
        }

        Ok(None)
    }

    fn find_page(&self, request: &PageRequest) -> StoreResult<Page<Member>> {
        let order_by = order_by_clause(&request.sort)?;
        let total = self.count()?;

        let sql = format!("{MEMBER_SELECT_SQL} ORDER BY {order_by} LIMIT ?1 OFFSET ?2;");
        let offset = i64::try_from(request.offset()).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![i64::from(request.size), offset])?;
        let mut members = Vec::new();

        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }

        Ok(Page::new(members, request.page, request.size, total))
    }

    fn upsert(&self, member: &Member) -> StoreResult<Member> {
        member.validate()?;

        self.conn.execute(
            "INSERT INTO members (
                member_id,
                role,
                name,
                username,
                email,
                password_hash,
                membership_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (member_id) DO UPDATE SET
                role = excluded.role,
                name = excluded.name,
                username = excluded.username,
                email = excluded.email,
                password_hash = excluded.password_hash,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                member.member_id,
                role_to_db(member.role),
                member.name.as_str(),
                member.username.as_str(),
                member.email.as_str(),
                member.password_hash.as_str(),
                member.membership_date,
            ],
        )?;

        self.find_by_id(member.member_id)?.ok_or_else(|| {
            StoreError::InvalidData(format!(
                "member {} missing in read-back after upsert",
                member.member_id
            ))
        })
    }

    fn update(&self, member: &Member) -> StoreResult<Member> {
        member.validate()?;

        let changed = self.conn.execute(
            "UPDATE members SET
                role = ?2,
                name = ?3,
                username = ?4,
                email = ?5,
                password_hash = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
            WHERE member_id = ?1;",
            params![
                member.member_id,
                role_to_db(member.role),
                member.name.as_str(),
                member.username.as_str(),
                member.email.as_str(),
                member.password_hash.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: MEMBER_ENTITY,
                id: member.member_id,
            });
        }

        self.find_by_id(member.member_id)?.ok_or_else(|| {
            StoreError::InvalidData(format!(
                "member {} missing in read-back after update",
                member.member_id
            ))
        })
    }

    fn delete(&self, member: &Member) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM members WHERE member_id = ?1;", [member.member_id])?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: MEMBER_ENTITY,
                id: member.member_id,
            });
        }

        Ok(())
    }

    fn count(&self) -> StoreResult<u64> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM members;", [], |row| row.get(0))?;
        Ok(u64::try_from(total).unwrap_or(0))
    }
}

fn order_by_clause(sort: &[SortOrder]) -> StoreResult<String> {
    let mut terms = Vec::with_capacity(sort.len() + 1);
    let mut has_id = false;

    for order in sort {
        let column = sort_column(order.property.as_str())
            .ok_or_else(|| StoreError::UnknownSortField(order.property.clone()))?;
        has_id |= column == "member_id";
        let direction = match order.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        terms.push(format!("{column} {direction}"));
    }

    // Stable paging needs a unique tiebreaker.
    if !has_id {
        terms.push("member_id ASC".to_string());
    }

    Ok(terms.join(", "))
}

fn sort_column(property: &str) -> Option<&'static str> {
    match property {
        "memberId" | "member_id" => Some("member_id"),
        "role" => Some("role"),
        "name" => Some("name"),
        "username" => Some("username"),
        "email" => Some("email"),
        "membershipDate" | "membership_date" => Some("membership_date"),
        _ => None,
    }
}

fn parse_member_row(row: &Row<'_>) -> StoreResult<Member> {
    let role_text: String = row.get("role")?;
    let role = parse_role(&role_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid role `{role_text}` in members.role"))
    })?;

    Ok(Member {
        member_id: row.get("member_id")?,
        role,
        name: row.get("name")?,
        username: row.get("username")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        membership_date: row.get("membership_date")?,
    })
}

fn role_to_db(role: Role) -> &'static str {
    match role {
        Role::User => "USER",
        Role::Librarian => "LIBRARIAN",
        Role::Admin => "ADMIN",
    }
}

fn parse_role(value: &str) -> Option<Role> {
    match value {
        "USER" => Some(Role::User),
        "LIBRARIAN" => Some(Role::Librarian),
        "ADMIN" => Some(Role::Admin),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{order_by_clause, parse_role, role_to_db};
    use crate::model::member::Role;
    use crate::model::page::SortOrder;
    use crate::repo::StoreError;

    #[test]
    fn order_by_appends_id_tiebreaker() {
        let clause = order_by_clause(&[SortOrder::desc("name")]).expect("name is sortable");
        assert_eq!(clause, "name DESC, member_id ASC");

        let clause = order_by_clause(&[SortOrder::asc("memberId")]).expect("id is sortable");
        assert_eq!(clause, "member_id ASC");
    }

    #[test]
    fn order_by_rejects_unknown_and_credential_properties() {
        for property in ["password", "password_hash", "name; DROP TABLE members", ""] {
            let err = order_by_clause(&[SortOrder::asc(property)])
                .expect_err("property must be rejected");
            assert!(matches!(err, StoreError::UnknownSortField(p) if p == property));
        }
    }

    #[test]
    fn role_db_mapping_is_symmetric() {
        for role in [Role::User, Role::Librarian, Role::Admin] {
            assert_eq!(parse_role(role_to_db(role)), Some(role));
        }
        assert_eq!(parse_role("user"), None);
    }
}
