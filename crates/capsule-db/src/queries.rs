use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};

use crate::Database;
use crate::models::{CapsuleRow, PublicCapsuleRow, UserRow, to_db_time};

const CAPSULE_COLUMNS: &str = "id, owner_id, title, content, created_at, open_at, opened_at";

impl Database {
    // -- Users --

    /// Insert a user. Returns false if the email is already registered.
    pub fn create_user(&self, id: &str, email: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let res = conn.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)",
                (id, email, password_hash),
            );
            match res {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, password, created_at FROM users WHERE email = ?1",
                [email],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Capsules --

    pub fn insert_capsule(&self, capsule: &CapsuleRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO capsules (id, owner_id, title, content, created_at, open_at, is_opened, opened_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    capsule.id,
                    capsule.owner_id,
                    capsule.title,
                    capsule.content,
                    capsule.created_at,
                    capsule.open_at,
                    capsule.opened_at.is_some(),
                    capsule.opened_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_capsule(&self, id: &str) -> Result<Option<CapsuleRow>> {
        self.with_conn(|conn| query_capsule(conn, id))
    }

    /// Everyone's capsules except `exclude_owner`'s, newest first.
    /// `page` is 1-based. Returns the page and the total row count.
    pub fn list_public(
        &self,
        exclude_owner: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<PublicCapsuleRow>, u64)> {
        let offset = u64::from(page.saturating_sub(1)) * u64::from(page_size);

        self.with_conn(|conn| {
            // NULL exclude_owner matches every row
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM capsules WHERE ?1 IS NULL OR owner_id != ?1",
                [exclude_owner],
                |r| r.get(0),
            )?;

            // JOIN users to fetch the owner email in the same query
            let mut stmt = conn.prepare(
                "SELECT c.id, c.owner_id, u.email, c.created_at, c.open_at, c.is_opened
                 FROM capsules c
                 LEFT JOIN users u ON c.owner_id = u.id
                 WHERE ?1 IS NULL OR c.owner_id != ?1
                 ORDER BY c.created_at DESC
                 LIMIT ?2 OFFSET ?3",
            )?;

            let rows = stmt
                .query_map(
                    rusqlite::params![exclude_owner, page_size, offset as i64],
                    |row| {
                        Ok(PublicCapsuleRow {
                            id: row.get(0)?,
                            owner_id: row.get(1)?,
                            owner_email: row.get(2)?,
                            created_at: row.get(3)?,
                            open_at: row.get(4)?,
                            is_opened: row.get(5)?,
                        })
                    },
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total as u64))
        })
    }

    pub fn list_owned(&self, owner_id: &str) -> Result<Vec<CapsuleRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAPSULE_COLUMNS} FROM capsules WHERE owner_id = ?1 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([owner_id], capsule_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Stamp a capsule as opened if it is still sealed, owned by `owner_id`
    /// and past its `open_at`.
    ///
    /// Returns true only for the call that performed the transition; a
    /// capsule that is already opened keeps its original `opened_at`.
    pub fn open_capsule(&self, id: &str, owner_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let now = to_db_time(now);
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE capsules SET is_opened = 1, opened_at = ?3
                 WHERE id = ?1 AND owner_id = ?2 AND is_opened = 0 AND open_at <= ?3",
                (id, owner_id, &now),
            )?;
            Ok(changed == 1)
        })
    }

    /// Delete a capsule owned by `owner_id` that has not been opened.
    /// Returns false if no row matched.
    pub fn delete_capsule(&self, id: &str, owner_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM capsules WHERE id = ?1 AND owner_id = ?2 AND is_opened = 0",
                (id, owner_id),
            )?;
            Ok(changed == 1)
        })
    }
}

fn query_capsule(conn: &Connection, id: &str) -> Result<Option<CapsuleRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {CAPSULE_COLUMNS} FROM capsules WHERE id = ?1"))?;
    stmt.query_row([id], capsule_from_row).optional()
}

fn capsule_from_row(row: &Row<'_>) -> rusqlite::Result<CapsuleRow> {
    Ok(CapsuleRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        open_at: row.get(5)?,
        opened_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
