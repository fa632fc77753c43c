// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue operations for the download queue.
//!
//! Timestamps are written with `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')` so
//! scheduled-at comparisons stay lexicographic.

use rusqlite::params;

use downpour_core::{DownpourError, DueItem, JobKind, JobStatus, QueueItem};

use crate::database::Database;

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

fn parse_col<T: std::str::FromStr>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn map_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueItem> {
    Ok(QueueItem {
        id: row.get(0)?,
        kind: parse_col(1, row.get::<_, String>(1)?)?,
        payload: row.get(2)?,
        status: parse_col(3, row.get::<_, String>(3)?)?,
        scheduled_at: row.get(4)?,
        ext_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const ITEM_COLS: &str =
    "id, kind, payload, status, scheduled_at, ext_id, created_at, updated_at";

/// Insert a new queue item. `scheduled_at = None` means due immediately.
/// Returns the auto-generated item id.
pub async fn add(
    db: &Database,
    kind: JobKind,
    payload: &str,
    scheduled_at: Option<&str>,
) -> Result<i64, DownpourError> {
    let kind = kind.to_string();
    let payload = payload.to_string();
    let scheduled_at = scheduled_at.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO queue (kind, payload, status, scheduled_at)
                     VALUES (?1, ?2, 'queued', COALESCE(?3, {NOW}))"
                ),
                params![kind, payload, scheduled_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one item by id.
pub async fn get(db: &Database, id: i64) -> Result<Option<QueueItem>, DownpourError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!("SELECT {ITEM_COLS} FROM queue WHERE id = ?1"))?;
            match stmt.query_row(params![id], map_item) {
                Ok(item) => Ok(Some(item)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Due candidates in FIFO order: queued items whose scheduled time has
/// passed. `force` ignores the scheduled time and admits everything queued.
pub async fn get_due(db: &Database, force: bool) -> Result<Vec<DueItem>, DownpourError> {
    db.connection()
        .call(move |conn| {
            let sql = if force {
                "SELECT id, kind, payload FROM queue
                 WHERE status = 'queued' ORDER BY id ASC"
                    .to_string()
            } else {
                format!(
                    "SELECT id, kind, payload FROM queue
                     WHERE status = 'queued' AND scheduled_at <= {NOW} ORDER BY id ASC"
                )
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(DueItem {
                        id: row.get(0)?,
                        kind: parse_col(1, row.get::<_, String>(1)?)?,
                        payload: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent items first, capped at `limit`.
pub async fn list(db: &Database, limit: i64) -> Result<Vec<QueueItem>, DownpourError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ITEM_COLS} FROM queue ORDER BY id DESC LIMIT ?1"
            ))?;
            let rows = stmt
                .query_map(params![limit], map_item)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Per-status item counts, for status summaries.
pub async fn count_by_status(db: &Database) -> Result<Vec<(JobStatus, i64)>, DownpourError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM queue GROUP BY status")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        parse_col::<JobStatus>(0, row.get::<_, String>(0)?)?,
                        row.get::<_, i64>(1)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Move an item to a new lifecycle status.
pub async fn update_status(
    db: &Database,
    id: i64,
    status: JobStatus,
) -> Result<(), DownpourError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!("UPDATE queue SET status = ?1, updated_at = {NOW} WHERE id = ?2"),
                params![status, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record the engine handle (aria2 GID, subprocess attempt id) for an item.
pub async fn set_ext_id(db: &Database, id: i64, ext_id: &str) -> Result<(), DownpourError> {
    let ext_id = ext_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!("UPDATE queue SET ext_id = ?1, updated_at = {NOW} WHERE id = ?2"),
                params![ext_id, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Re-queue all failed items as due now. Returns the number affected.
/// The stale engine handle is cleared so the retry starts a fresh transfer
/// instead of reattaching to the dead one.
pub async fn retry_errors(db: &Database) -> Result<usize, DownpourError> {
    db.connection()
        .call(|conn| {
            let n = conn.execute(
                &format!(
                    "UPDATE queue SET status = 'queued', ext_id = NULL,
                     scheduled_at = {NOW}, updated_at = {NOW} WHERE status = 'error'"
                ),
                [],
            )?;
            Ok(n)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Re-queue all paused items as due now (resume path).
pub async fn requeue_paused_now(db: &Database) -> Result<usize, DownpourError> {
    db.connection()
        .call(|conn| {
            let n = conn.execute(
                &format!(
                    "UPDATE queue SET status = 'queued', scheduled_at = {NOW},
                     updated_at = {NOW} WHERE status = 'paused'"
                ),
                [],
            )?;
            Ok(n)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Startup recovery: anything still marked running belonged to a dead
/// process and goes back to queued.
pub async fn recover_running(db: &Database) -> Result<usize, DownpourError> {
    db.connection()
        .call(|conn| {
            let n = conn.execute(
                &format!(
                    "UPDATE queue SET status = 'queued', updated_at = {NOW}
                     WHERE status = 'running'"
                ),
                [],
            )?;
            Ok(n)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete terminal items (done, error, canceled) and their progress rows.
pub async fn purge_finished(db: &Database) -> Result<usize, DownpourError> {
    db.connection()
        .call(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM progress WHERE qid IN
                 (SELECT id FROM queue WHERE status IN ('done', 'error', 'canceled'))",
                [],
            )?;
            let n = tx.execute(
                "DELETE FROM queue WHERE status IN ('done', 'error', 'canceled')",
                [],
            )?;
            tx.commit()?;
            Ok(n)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Wipe the queue and all progress. Agent flags in the kv table survive.
pub async fn clear_all(db: &Database) -> Result<usize, DownpourError> {
    db.connection()
        .call(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM progress", [])?;
            let n = tx.execute("DELETE FROM queue", [])?;
            tx.commit()?;
            Ok(n)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::flags;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn add_and_get_round_trip() {
        let (db, _dir) = setup_db().await;

        let id = add(&db, JobKind::Url, r#"{"url":"https://example.com/a.iso"}"#, None)
            .await
            .unwrap();
        let item = get(&db, id).await.unwrap().unwrap();
        assert_eq!(item.kind, JobKind::Url);
        assert_eq!(item.status, JobStatus::Queued);
        assert!(item.ext_id.is_none());

        assert!(get(&db, id + 1).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn due_selection_respects_schedule_and_force() {
        let (db, _dir) = setup_db().await;

        let now_id = add(&db, JobKind::Url, "{}", None).await.unwrap();
        let future_id = add(&db, JobKind::Url, "{}", Some("2099-01-01T00:00:00.000Z"))
            .await
            .unwrap();

        let due = get_due(&db, false).await.unwrap();
        assert_eq!(due.iter().map(|d| d.id).collect::<Vec<_>>(), vec![now_id]);

        let due = get_due(&db, true).await.unwrap();
        assert_eq!(
            due.iter().map(|d| d.id).collect::<Vec<_>>(),
            vec![now_id, future_id]
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn due_order_is_fifo() {
        let (db, _dir) = setup_db().await;
        let a = add(&db, JobKind::Url, "{}", None).await.unwrap();
        let b = add(&db, JobKind::TgLink, "{}", None).await.unwrap();
        let c = add(&db, JobKind::SelfRef, "{}", None).await.unwrap();

        let due = get_due(&db, false).await.unwrap();
        assert_eq!(due.iter().map(|d| d.id).collect::<Vec<_>>(), vec![a, b, c]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn retry_errors_requeues_only_errors() {
        let (db, _dir) = setup_db().await;
        let failed = add(&db, JobKind::Url, "{}", None).await.unwrap();
        let done = add(&db, JobKind::Url, "{}", None).await.unwrap();
        set_ext_id(&db, failed, "gid-dead").await.unwrap();
        update_status(&db, failed, JobStatus::Error).await.unwrap();
        update_status(&db, done, JobStatus::Done).await.unwrap();

        let n = retry_errors(&db).await.unwrap();
        assert_eq!(n, 1);
        let retried = get(&db, failed).await.unwrap().unwrap();
        assert_eq!(retried.status, JobStatus::Queued);
        assert!(retried.ext_id.is_none());
        assert_eq!(get(&db, done).await.unwrap().unwrap().status, JobStatus::Done);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recover_running_requeues_orphans() {
        let (db, _dir) = setup_db().await;
        let id = add(&db, JobKind::Url, "{}", None).await.unwrap();
        update_status(&db, id, JobStatus::Running).await.unwrap();

        assert_eq!(recover_running(&db).await.unwrap(), 1);
        assert_eq!(get(&db, id).await.unwrap().unwrap().status, JobStatus::Queued);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn purge_finished_removes_terminal_rows_only() {
        let (db, _dir) = setup_db().await;
        let queued = add(&db, JobKind::Url, "{}", None).await.unwrap();
        let done = add(&db, JobKind::Url, "{}", None).await.unwrap();
        let canceled = add(&db, JobKind::Url, "{}", None).await.unwrap();
        update_status(&db, done, JobStatus::Done).await.unwrap();
        update_status(&db, canceled, JobStatus::Canceled).await.unwrap();

        assert_eq!(purge_finished(&db).await.unwrap(), 2);
        assert!(get(&db, queued).await.unwrap().is_some());
        assert!(get(&db, done).await.unwrap().is_none());
        assert!(get(&db, canceled).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn clear_all_preserves_flags() {
        let (db, _dir) = setup_db().await;
        add(&db, JobKind::Url, "{}", None).await.unwrap();
        flags::set(&db, "paused", "1").await.unwrap();

        clear_all(&db).await.unwrap();
        assert!(list(&db, 10).await.unwrap().is_empty());
        assert_eq!(flags::get(&db, "paused").await.unwrap().as_deref(), Some("1"));
        db.close().await.unwrap();
    }
}
