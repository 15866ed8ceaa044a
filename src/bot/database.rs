//! Persistent SQLite database for the roster and trip status.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::bot::member::{Member, Phone, Status};
use crate::bot::roster::RosterEntry;
use crate::bot::store::{Store, StoreError, Tally};

const MEMBER_COLUMNS: &str = "phone, first_name, last_name, status, is_counter";

/// SQLite-backed store. The connection is shared behind a mutex, so every
/// method runs to completion before the next one starts.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create a new in-memory database.
    pub fn new() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    /// Open (or create) a database file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let db = Self::with_connection(conn)?;
        info!(
            "Loaded database from {:?} ({} members, fully accounted: {})",
            path,
            db.member_count()?,
            db.fully_accounted()?
        );
        Ok(db)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let db = Self { conn: Mutex::new(conn) };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS members (
                phone TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                first_folded TEXT NOT NULL,
                last_folded TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'UNSET',
                is_counter INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS trip (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                fully_accounted INTEGER NOT NULL DEFAULT 0
            );

            INSERT OR IGNORE INTO trip (id, fully_accounted) VALUES (1, 0);

            CREATE INDEX IF NOT EXISTS idx_members_first_name ON members(first_folded);
            CREATE INDEX IF NOT EXISTS idx_members_status ON members(status);
        "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn query_members(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Member>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(args, member_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn member_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM members", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn fully_accounted(&self) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let flag: bool = conn.query_row("SELECT fully_accounted FROM trip WHERE id = 1", [], |row| row.get(0))?;
        Ok(flag)
    }

    /// Insert a single member. Used by tests and tooling; production rosters
    /// go through `replace_roster`.
    pub fn insert_member(&self, member: &Member) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO members (phone, first_name, last_name, first_folded, last_folded, status, is_counter) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                member.phone.as_str(),
                member.first_name,
                member.last_name,
                fold(&member.first_name),
                fold(&member.last_name),
                member.status.as_str(),
                member.is_counter
            ],
        )?;
        Ok(())
    }
}

/// Case-folded form used for name matching. SQLite's `LOWER()` only folds ASCII.
fn fold(name: &str) -> String {
    name.to_lowercase()
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        phone: Phone::from_canonical(row.get(0)?),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        status: Status::from_column(&row.get::<_, String>(3)?),
        is_counter: row.get(4)?,
    })
}

impl Store for Database {
    fn member(&self, phone: &Phone) -> Result<Option<Member>, StoreError> {
        let conn = self.conn()?;
        let member = conn
            .query_row(
                &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE phone = ?1"),
                params![phone.as_str()],
                member_from_row,
            )
            .optional()?;
        Ok(member)
    }

    fn members_by_first_name(&self, first_name: &str) -> Result<Vec<Member>, StoreError> {
        self.query_members(
            &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE first_folded = ?1 ORDER BY last_name, phone"),
            params![fold(first_name)],
        )
    }

    fn members_by_full_name(&self, first_name: &str, last_name: &str) -> Result<Vec<Member>, StoreError> {
        self.query_members(
            &format!(
                "SELECT {MEMBER_COLUMNS} FROM members WHERE first_folded = ?1 AND last_folded = ?2 ORDER BY phone"
            ),
            params![fold(first_name), fold(last_name)],
        )
    }

    fn members(&self) -> Result<Vec<Member>, StoreError> {
        self.query_members(
            &format!("SELECT {MEMBER_COLUMNS} FROM members ORDER BY first_name, last_name"),
            [],
        )
    }

    fn members_with_status(&self, status: Status) -> Result<Vec<Member>, StoreError> {
        self.query_members(
            &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE status = ?1 ORDER BY first_name, last_name"),
            params![status.as_str()],
        )
    }

    fn missing_members(&self) -> Result<Vec<Member>, StoreError> {
        self.query_members(
            &format!(
                "SELECT {MEMBER_COLUMNS} FROM members WHERE status NOT IN ('IN', 'ABSENT') ORDER BY first_name, last_name"
            ),
            [],
        )
    }

    fn counters(&self) -> Result<Vec<Member>, StoreError> {
        self.query_members(
            &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE is_counter = 1 ORDER BY first_name, last_name"),
            [],
        )
    }

    fn record_status(&self, phone: &Phone, status: Status, clear_accounted: bool) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE members SET status = ?1 WHERE phone = ?2",
            params![status.as_str(), phone.as_str()],
        )?;
        if updated == 0 {
            return Err(StoreError::UnknownMember(phone.clone()));
        }

        let was_accounted: bool = tx.query_row("SELECT fully_accounted FROM trip WHERE id = 1", [], |row| row.get(0))?;
        if clear_accounted {
            tx.execute("UPDATE trip SET fully_accounted = 0 WHERE id = 1", [])?;
        }
        tx.commit()?;

        debug!("Marked {} as {}", phone, status);
        Ok(was_accounted)
    }

    fn set_counter(&self, phone: &Phone, is_counter: bool) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE members SET is_counter = ?1 WHERE phone = ?2",
            params![is_counter, phone.as_str()],
        )?;
        if updated == 0 {
            return Err(StoreError::UnknownMember(phone.clone()));
        }
        Ok(())
    }

    fn reset_statuses(&self) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("UPDATE members SET status = 'UNSET'", [])?;
        tx.execute("UPDATE trip SET fully_accounted = 0 WHERE id = 1", [])?;
        tx.commit()?;
        Ok(())
    }

    fn close_if_accounted(&self) -> Result<Option<Tally>, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let flag: bool = tx.query_row("SELECT fully_accounted FROM trip WHERE id = 1", [], |row| row.get(0))?;
        if flag {
            return Ok(None);
        }

        let (total, absent, riding, missing): (i64, i64, i64, i64) = tx.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(status = 'ABSENT'), 0),
                    COALESCE(SUM(status = 'IN'), 0),
                    COALESCE(SUM(status NOT IN ('IN', 'ABSENT')), 0)
             FROM members",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        if missing > 0 {
            return Ok(None);
        }

        tx.execute("UPDATE trip SET fully_accounted = 1 WHERE id = 1", [])?;
        tx.commit()?;

        Ok(Some(Tally {
            total: total as usize,
            absent: absent as usize,
            riding: riding as usize,
        }))
    }

    fn replace_roster(&self, entries: &[RosterEntry]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM members", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO members (phone, first_name, last_name, first_folded, last_folded, status, is_counter) \
                 VALUES (?1, ?2, ?3, ?4, ?5, 'UNSET', 0)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.phone.as_str(),
                    entry.first_name,
                    entry.last_name,
                    fold(&entry.first_name),
                    fold(&entry.last_name)
                ])?;
            }
        }
        tx.execute("UPDATE trip SET fully_accounted = 0 WHERE id = 1", [])?;
        tx.commit()?;

        info!("📥 Imported {} members", entries.len());
        Ok(())
    }
}
