// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-flight progress rows, one per running queue item.

use rusqlite::params;

use downpour_core::{DownpourError, ProgressRow};

use crate::database::Database;

/// Upsert the progress row for a queue item.
///
/// A non-positive `total` is stored as NULL: the engine has not reported a
/// real byte count yet, and zero must never read as "complete".
pub async fn upsert(
    db: &Database,
    qid: i64,
    total: Option<i64>,
    downloaded: i64,
) -> Result<(), DownpourError> {
    let total = total.filter(|t| *t > 0);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO progress (qid, total, downloaded, updated_at)
                 VALUES (?1, ?2, ?3, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT (qid) DO UPDATE SET
                     total = excluded.total,
                     downloaded = excluded.downloaded,
                     updated_at = excluded.updated_at",
                params![qid, total, downloaded],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Drop the progress row for a queue item (terminal transitions).
pub async fn clear(db: &Database, qid: i64) -> Result<(), DownpourError> {
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM progress WHERE qid = ?1", params![qid])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All current progress rows, oldest queue item first.
pub async fn all(db: &Database) -> Result<Vec<ProgressRow>, DownpourError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT qid, total, downloaded, updated_at FROM progress ORDER BY qid ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ProgressRow {
                        qid: row.get(0)?,
                        total: row.get(1)?,
                        downloaded: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
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
    async fn upsert_is_idempotent_per_item() {
        let (db, _dir) = setup_db().await;

        upsert(&db, 1, None, 100).await.unwrap();
        upsert(&db, 1, Some(1000), 400).await.unwrap();

        let rows = all(&db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total, Some(1000));
        assert_eq!(rows[0].downloaded, 400);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn non_positive_total_stored_as_unknown() {
        let (db, _dir) = setup_db().await;

        upsert(&db, 1, Some(0), 50).await.unwrap();
        let rows = all(&db).await.unwrap();
        assert_eq!(rows[0].total, None);
        assert!(rows[0].percent().is_none());

        upsert(&db, 1, Some(-1), 60).await.unwrap();
        let rows = all(&db).await.unwrap();
        assert_eq!(rows[0].total, None);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn clear_removes_row() {
        let (db, _dir) = setup_db().await;
        upsert(&db, 7, Some(10), 5).await.unwrap();
        clear(&db, 7).await.unwrap();
        assert!(all(&db).await.unwrap().is_empty());
        // Clearing an absent row is a no-op.
        clear(&db, 7).await.unwrap();
        db.close().await.unwrap();
    }
}
