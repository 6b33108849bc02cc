use crate::errors::AggregateError;
use crate::spatial::is_valid_cell_id;
use crate::types::{CellAggregate, CoverageStats, RadioFlags};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tokio::sync::Mutex;

/// Source of truth for per-cell coverage.
///
/// `upsert_merge` must be atomic at the row level: the merge expression runs
/// inside the store, never as an application-side read-modify-write, so
/// concurrent merges for the same cell cannot lose an update.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    async fn get(&self, cell_id: &str) -> Result<Option<CellAggregate>, AggregateError>;

    /// OR-merge flags and MAX-merge the timestamp into the row for `cell_id`,
    /// inserting it (with `created_at = timestamp`) when absent. Returns the
    /// authoritative post-write row.
    async fn upsert_merge(
        &self,
        cell_id: &str,
        flags: RadioFlags,
        timestamp: i64,
    ) -> Result<CellAggregate, AggregateError>;

    async fn list_all(&self) -> Result<Vec<CellAggregate>, AggregateError>;

    async fn aggregate_stats(&self) -> Result<CoverageStats, AggregateError>;
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS hexes (
    cell_id TEXT PRIMARY KEY NOT NULL CHECK(cell_id GLOB '[0-9a-f]*'),
    wifi INTEGER DEFAULT 0 NOT NULL,
    gsm INTEGER DEFAULT 0 NOT NULL,
    wcdma INTEGER DEFAULT 0 NOT NULL,
    lte INTEGER DEFAULT 0 NOT NULL,
    ble INTEGER DEFAULT 0 NOT NULL,
    created_at INTEGER DEFAULT (strftime('%s', 'now')) NOT NULL,
    last_update INTEGER DEFAULT (strftime('%s', 'now')) NOT NULL
)";

const UPSERT_MERGE: &str = "INSERT INTO hexes
    (cell_id, wifi, gsm, wcdma, lte, ble, created_at, last_update)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
    ON CONFLICT(cell_id) DO UPDATE SET
        wifi = MAX(wifi, excluded.wifi),
        gsm = MAX(gsm, excluded.gsm),
        wcdma = MAX(wcdma, excluded.wcdma),
        lte = MAX(lte, excluded.lte),
        ble = MAX(ble, excluded.ble),
        last_update = MAX(last_update, excluded.last_update)
    RETURNING cell_id, wifi, gsm, wcdma, lte, ble, created_at, last_update";

const SELECT_ONE: &str = "SELECT cell_id, wifi, gsm, wcdma, lte, ble, created_at, last_update
    FROM hexes WHERE cell_id = ?1";

const SELECT_ALL: &str =
    "SELECT cell_id, wifi, gsm, wcdma, lte, ble, created_at, last_update FROM hexes";

const SELECT_STATS: &str = "SELECT COUNT(cell_id), COALESCE(SUM(wifi), 0),
    COALESCE(SUM(gsm), 0), COALESCE(SUM(wcdma), 0), COALESCE(SUM(lte), 0),
    COALESCE(SUM(ble), 0) FROM hexes";

/// SQLite-backed aggregate store. One table, one row per cell; the OR/MAX
/// merge happens inside a single upsert statement.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AggregateError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, AggregateError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, AggregateError> {
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute(SCHEMA, [])?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }
}

fn row_to_aggregate(row: &rusqlite::Row<'_>) -> rusqlite::Result<CellAggregate> {
    Ok(CellAggregate {
        cell_id: row.get(0)?,
        flags: RadioFlags {
            wifi: row.get(1)?,
            gsm: row.get(2)?,
            wcdma: row.get(3)?,
            lte: row.get(4)?,
            ble: row.get(5)?,
        },
        created_at: row.get(6)?,
        last_update: row.get(7)?,
    })
}

#[async_trait]
impl AggregateStore for SqliteStore {
    async fn get(&self, cell_id: &str) -> Result<Option<CellAggregate>, AggregateError> {
        let conn = self.conn.lock().await;
        let aggregate = conn
            .query_row(SELECT_ONE, params![cell_id], row_to_aggregate)
            .optional()?;
        Ok(aggregate)
    }

    async fn upsert_merge(
        &self,
        cell_id: &str,
        flags: RadioFlags,
        timestamp: i64,
    ) -> Result<CellAggregate, AggregateError> {
        if !is_valid_cell_id(cell_id) {
            return Err(AggregateError::InvalidCellId(cell_id.to_string()));
        }

        let conn = self.conn.lock().await;
        let merged = conn.query_row(
            UPSERT_MERGE,
            params![
                cell_id, flags.wifi, flags.gsm, flags.wcdma, flags.lte, flags.ble, timestamp
            ],
            row_to_aggregate,
        )?;
        Ok(merged)
    }

    async fn list_all(&self) -> Result<Vec<CellAggregate>, AggregateError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(SELECT_ALL)?;
        let rows = stmt.query_map([], row_to_aggregate)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn aggregate_stats(&self) -> Result<CoverageStats, AggregateError> {
        let conn = self.conn.lock().await;
        let stats = conn.query_row(SELECT_STATS, [], |row| {
            Ok(CoverageStats {
                hexes: row.get::<_, i64>(0)? as u64,
                wifi: row.get::<_, i64>(1)? as u64,
                gsm: row.get::<_, i64>(2)? as u64,
                wcdma: row.get::<_, i64>(3)? as u64,
                lte: row.get::<_, i64>(4)? as u64,
                ble: row.get::<_, i64>(5)? as u64,
            })
        })?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wifi_flags() -> RadioFlags {
        RadioFlags {
            wifi: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let store = SqliteStore::in_memory().unwrap();
        let merged = store
            .upsert_merge("8a1fb46622dffff", wifi_flags(), 1000)
            .await
            .unwrap();

        assert_eq!(merged.cell_id, "8a1fb46622dffff");
        assert!(merged.flags.wifi);
        assert_eq!(merged.created_at, 1000);
        assert_eq!(merged.last_update, 1000);

        let fetched = store.get("8a1fb46622dffff").await.unwrap().unwrap();
        assert_eq!(fetched, merged);
        assert!(store.get("8a1fb46622dfff0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_is_or_and_max() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_merge("8a1fb46622dffff", wifi_flags(), 1000)
            .await
            .unwrap();

        // A later observation with a different flag adds it and advances time.
        let lte = RadioFlags {
            lte: true,
            ..Default::default()
        };
        let merged = store
            .upsert_merge("8a1fb46622dffff", lte, 2000)
            .await
            .unwrap();
        assert!(merged.flags.wifi && merged.flags.lte);
        assert_eq!(merged.created_at, 1000);
        assert_eq!(merged.last_update, 2000);

        // An older observation with no flags never regresses anything.
        let merged = store
            .upsert_merge("8a1fb46622dffff", RadioFlags::default(), 500)
            .await
            .unwrap();
        assert!(merged.flags.wifi && merged.flags.lte);
        assert_eq!(merged.last_update, 2000);
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        let first = store
            .upsert_merge("8a1fb46622dffff", wifi_flags(), 1000)
            .await
            .unwrap();
        let second = store
            .upsert_merge("8a1fb46622dffff", wifi_flags(), 1000)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalid_cell_id_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store
            .upsert_merge("NOT-A-CELL", wifi_flags(), 1000)
            .await;
        assert!(matches!(result, Err(AggregateError::InvalidCellId(_))));

        // Nothing was written.
        assert_eq!(store.aggregate_stats().await.unwrap().hexes, 0);
    }

    #[tokio::test]
    async fn test_stats_match_rows() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_merge("8a1fb46622dffff", wifi_flags(), 1)
            .await
            .unwrap();
        store
            .upsert_merge(
                "8a1fb46622d0fff",
                RadioFlags {
                    wifi: true,
                    gsm: true,
                    ..Default::default()
                },
                2,
            )
            .await
            .unwrap();
        store
            .upsert_merge(
                "8a1fb46622d1fff",
                RadioFlags {
                    ble: true,
                    ..Default::default()
                },
                3,
            )
            .await
            .unwrap();

        let stats = store.aggregate_stats().await.unwrap();
        let rows = store.list_all().await.unwrap();

        assert_eq!(stats.hexes as usize, rows.len());
        assert_eq!(stats.wifi as usize, rows.iter().filter(|r| r.flags.wifi).count());
        assert_eq!(stats.gsm as usize, rows.iter().filter(|r| r.flags.gsm).count());
        assert_eq!(stats.wcdma as usize, rows.iter().filter(|r| r.flags.wcdma).count());
        assert_eq!(stats.lte as usize, rows.iter().filter(|r| r.flags.lte).count());
        assert_eq!(stats.ble as usize, rows.iter().filter(|r| r.flags.ble).count());
    }

    #[tokio::test]
    async fn test_empty_store_stats() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.aggregate_stats().await.unwrap(), CoverageStats::default());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hexes.sqlite");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .upsert_merge("8a1fb46622dffff", wifi_flags(), 1000)
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let row = store.get("8a1fb46622dffff").await.unwrap().unwrap();
        assert!(row.flags.wifi);
        assert_eq!(row.last_update, 1000);
    }
}
