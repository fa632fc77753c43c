// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable agent flags in the kv table.
//!
//! Flags survive `clear_all` so a wiped queue does not silently unpause the
//! agent or forget schedule overrides.

use rusqlite::params;

use downpour_core::DownpourError;

use crate::database::Database;

/// Global pause flag key.
pub const PAUSED: &str = "paused";
/// Schedule-hour override key (stringified hour 0-23).
pub const SCHEDULE_HOUR: &str = "schedule_hour";
/// Daily-window enabled override key ("1"/"0").
pub const WINDOW_ENABLED: &str = "window_enabled";

pub async fn get(db: &Database, key: &str) -> Result<Option<String>, DownpourError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row("SELECT v FROM kv WHERE k = ?1", params![key], |row| {
                row.get(0)
            }) {
                Ok(v) => Ok(Some(v)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn set(db: &Database, key: &str, value: &str) -> Result<(), DownpourError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO kv (k, v) VALUES (?1, ?2)
                 ON CONFLICT (k) DO UPDATE SET v = excluded.v",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn delete(db: &Database, key: &str) -> Result<(), DownpourError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM kv WHERE k = ?1", params![key])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Whether the global pause flag is set.
pub async fn is_paused(db: &Database) -> Result<bool, DownpourError> {
    Ok(get(db, PAUSED).await?.as_deref() == Some("1"))
}

/// Set or clear the global pause flag. Idempotent.
pub async fn set_paused(db: &Database, paused: bool) -> Result<(), DownpourError> {
    if paused {
        set(db, PAUSED, "1").await
    } else {
        delete(db, PAUSED).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn flag_round_trip() {
        let (db, _dir) = setup_db().await;
        assert!(get(&db, SCHEDULE_HOUR).await.unwrap().is_none());

        set(&db, SCHEDULE_HOUR, "5").await.unwrap();
        assert_eq!(get(&db, SCHEDULE_HOUR).await.unwrap().as_deref(), Some("5"));

        set(&db, SCHEDULE_HOUR, "7").await.unwrap();
        assert_eq!(get(&db, SCHEDULE_HOUR).await.unwrap().as_deref(), Some("7"));

        delete(&db, SCHEDULE_HOUR).await.unwrap();
        assert!(get(&db, SCHEDULE_HOUR).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn pause_flag_is_idempotent() {
        let (db, _dir) = setup_db().await;
        assert!(!is_paused(&db).await.unwrap());

        set_paused(&db, true).await.unwrap();
        set_paused(&db, true).await.unwrap();
        assert!(is_paused(&db).await.unwrap());

        set_paused(&db, false).await.unwrap();
        assert!(!is_paused(&db).await.unwrap());
        db.close().await.unwrap();
    }
}
