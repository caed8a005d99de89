// SQLite attendance store; roster, count and missing-set queries see active cadets only

use crate::core::error::StoreError;
use crate::models::cadet::{Cadet, CadetContact, GroupedContact};
use crate::models::checkin::SlotKey;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cadets (
  user_id    INTEGER PRIMARY KEY,
  group_code TEXT NOT NULL,
  full_name  TEXT NOT NULL,
  handle     TEXT,
  phone      TEXT,
  created_at TEXT NOT NULL,
  is_active  INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_cadets_group ON cadets(group_code);

CREATE TABLE IF NOT EXISTS checkins (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id    INTEGER NOT NULL,
  date       TEXT NOT NULL,
  slot       TEXT NOT NULL,
  created_at TEXT NOT NULL,
  UNIQUE(user_id, date, slot)
);

CREATE INDEX IF NOT EXISTS idx_checkins_date_slot ON checkins(date, slot);
CREATE INDEX IF NOT EXISTS idx_checkins_user ON checkins(user_id);
";

/// Columns added after the first schema revision
const LATE_COLUMNS: [(&str, &str); 2] = [("handle", "TEXT"), ("phone", "TEXT")];

pub struct AttendanceStore {
    conn: Mutex<Connection>,
}

impl AttendanceStore {
    /// Open or create the store at `path`, creating the schema if absent
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;

        Ok(store)
    }

    /// In-memory store (tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;

        Ok(store)
    }

    /// Idempotent; safe to run on every startup
    pub fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)?;

        let existing: Vec<String> = {
            let mut stmt = conn.prepare("PRAGMA table_info(cadets)")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        for (column, sql_type) in LATE_COLUMNS {
            if !existing.iter().any(|c| c == column) {
                conn.execute_batch(&format!(
                    "ALTER TABLE cadets ADD COLUMN {} {}",
                    column, sql_type
                ))?;
                info!(column = column, "Added missing cadets column");
            }
        }

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    pub fn get_cadet(&self, user_id: i64) -> Result<Option<Cadet>, StoreError> {
        let conn = self.lock()?;
        let cadet = conn
            .query_row(
                "SELECT user_id, group_code, full_name, handle, phone, created_at, is_active
                 FROM cadets WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(Cadet {
                        user_id: row.get(0)?,
                        group_code: row.get(1)?,
                        full_name: row.get(2)?,
                        handle: row.get(3)?,
                        phone: row.get(4)?,
                        created_at: row.get(5)?,
                        is_active: row.get::<_, i64>(6)? != 0,
                    })
                },
            )
            .optional()?;

        Ok(cadet)
    }

    /// Create or update a cadet; never touches `phone` or `created_at`
    pub fn upsert_cadet(
        &self,
        user_id: i64,
        group_code: &str,
        full_name: &str,
        handle: Option<&str>,
    ) -> Result<(), StoreError> {
        let created_at = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO cadets (user_id, group_code, full_name, handle, created_at, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, 1)
             ON CONFLICT(user_id) DO UPDATE SET
               group_code = excluded.group_code,
               full_name = excluded.full_name,
               handle = excluded.handle",
            params![user_id, group_code, full_name, handle, created_at],
        )?;

        Ok(())
    }

    pub fn set_phone(&self, user_id: i64, phone: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE cadets SET phone = ?2 WHERE user_id = ?1",
            params![user_id, phone],
        )?;
        Ok(())
    }

    pub fn set_handle(&self, user_id: i64, handle: Option<&str>) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE cadets SET handle = ?2 WHERE user_id = ?1",
            params![user_id, handle],
        )?;
        Ok(())
    }

    /// Returns true when this call inserted the row, false when it already existed
    pub fn record_checkin(&self, user_id: i64, key: &SlotKey) -> Result<bool, StoreError> {
        let created_at = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO checkins (user_id, date, slot, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, key.date_str(), key.slot.as_str(), created_at],
        )?;

        Ok(inserted == 1)
    }

    pub fn count_in_group(&self, group_code: &str) -> Result<usize, StoreError> {
        self.count(
            "SELECT COUNT(*) FROM cadets WHERE is_active = 1 AND group_code = ?1",
            params![group_code],
        )
    }

    pub fn count_in_course(&self, excluding: &str) -> Result<usize, StoreError> {
        self.count(
            "SELECT COUNT(*) FROM cadets WHERE is_active = 1 AND group_code <> ?1",
            params![excluding],
        )
    }

    /// (group_code, count) pairs ordered by group code
    pub fn count_by_group(&self, excluding: &str) -> Result<Vec<(String, usize)>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT group_code, COUNT(*) FROM cadets
             WHERE is_active = 1 AND group_code <> ?1
             GROUP BY group_code
             ORDER BY group_code",
        )?;
        let rows = stmt.query_map(params![excluding], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            let (group, n) = row?;
            counts.push((group, n.max(0) as usize));
        }

        Ok(counts)
    }

    pub fn group_total(&self, group_code: &str) -> Result<usize, StoreError> {
        self.count_in_group(group_code)
    }

    pub fn group_checked(&self, group_code: &str, key: &SlotKey) -> Result<usize, StoreError> {
        self.count(
            "SELECT COUNT(*) FROM cadets c
             JOIN checkins ch ON ch.user_id = c.user_id
             WHERE c.is_active = 1 AND c.group_code = ?1 AND ch.date = ?2 AND ch.slot = ?3",
            params![group_code, key.date_str(), key.slot.as_str()],
        )
    }

    /// Active cadets in the group without a check-in for the key, by name
    pub fn missing_in_group(
        &self,
        group_code: &str,
        key: &SlotKey,
    ) -> Result<Vec<CadetContact>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.full_name, c.handle, c.phone
             FROM cadets c
             LEFT JOIN checkins ch
               ON ch.user_id = c.user_id AND ch.date = ?1 AND ch.slot = ?2
             WHERE c.is_active = 1 AND c.group_code = ?3 AND ch.user_id IS NULL
             ORDER BY c.full_name",
        )?;
        let rows = stmt.query_map(
            params![key.date_str(), key.slot.as_str(), group_code],
            contact_from_row,
        )?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Course-wide missing set, by (group_code, full_name)
    pub fn missing_course(
        &self,
        key: &SlotKey,
        excluding: &str,
    ) -> Result<Vec<GroupedContact>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.group_code, c.full_name, c.handle, c.phone
             FROM cadets c
             LEFT JOIN checkins ch
               ON ch.user_id = c.user_id AND ch.date = ?1 AND ch.slot = ?2
             WHERE c.is_active = 1 AND c.group_code <> ?3 AND ch.user_id IS NULL
             ORDER BY c.group_code, c.full_name",
        )?;
        let rows = stmt.query_map(
            params![key.date_str(), key.slot.as_str(), excluding],
            |row| {
                Ok(GroupedContact {
                    group_code: row.get(0)?,
                    cadet: CadetContact {
                        full_name: row.get(1)?,
                        handle: row.get(2)?,
                        phone: row.get(3)?,
                    },
                })
            },
        )?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_group_roster(&self, group_code: &str) -> Result<Vec<CadetContact>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT full_name, handle, phone FROM cadets
             WHERE is_active = 1 AND group_code = ?1
             ORDER BY full_name",
        )?;
        let rows = stmt.query_map(params![group_code], contact_from_row)?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Cheap liveness probe for the health endpoint
    pub fn ping(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    fn count(&self, sql: &str, params: impl rusqlite::Params) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(sql, params, |row| row.get(0))?;
        Ok(n.max(0) as usize)
    }

    #[cfg(test)]
    fn raw_connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}

fn contact_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CadetContact> {
    Ok(CadetContact {
        full_name: row.get(0)?,
        handle: row.get(1)?,
        phone: row.get(2)?,
    })
}
