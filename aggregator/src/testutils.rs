//! Test doubles and report builders shared by aggregator and gateway tests.

use crate::errors::AggregateError;
use crate::report::{CellTower, Position, RadioType, Report, ReportBatch, WifiAccessPoint};
use crate::spatial::is_valid_cell_id;
use crate::store::AggregateStore;
use crate::types::{CellAggregate, CoverageStats, RadioFlags};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// In-memory `AggregateStore` with the same OR/MAX merge semantics as the
/// SQLite implementation. The map-wide lock stands in for row-level atomicity.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, CellAggregate>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Make subsequent writes fail with `StoreUnavailable` until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AggregateStore for MemoryStore {
    async fn get(&self, cell_id: &str) -> Result<Option<CellAggregate>, AggregateError> {
        Ok(self.rows.lock().await.get(cell_id).cloned())
    }

    async fn upsert_merge(
        &self,
        cell_id: &str,
        flags: RadioFlags,
        timestamp: i64,
    ) -> Result<CellAggregate, AggregateError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AggregateError::StoreUnavailable(
                "write failure injected".to_string(),
            ));
        }
        if !is_valid_cell_id(cell_id) {
            return Err(AggregateError::InvalidCellId(cell_id.to_string()));
        }

        let mut rows = self.rows.lock().await;
        let merged = rows
            .entry(cell_id.to_string())
            .and_modify(|row| {
                row.flags = row.flags.union(flags);
                row.last_update = row.last_update.max(timestamp);
            })
            .or_insert_with(|| CellAggregate {
                cell_id: cell_id.to_string(),
                flags,
                created_at: timestamp,
                last_update: timestamp,
            });
        Ok(merged.clone())
    }

    async fn list_all(&self) -> Result<Vec<CellAggregate>, AggregateError> {
        Ok(self.rows.lock().await.values().cloned().collect())
    }

    async fn aggregate_stats(&self) -> Result<CoverageStats, AggregateError> {
        let rows = self.rows.lock().await;
        let mut stats = CoverageStats {
            hexes: rows.len() as u64,
            ..Default::default()
        };
        for row in rows.values() {
            stats.wifi += u64::from(row.flags.wifi);
            stats.gsm += u64::from(row.flags.gsm);
            stats.wcdma += u64::from(row.flags.wcdma);
            stats.lte += u64::from(row.flags.lte);
            stats.ble += u64::from(row.flags.ble);
        }
        Ok(stats)
    }
}

/// A report with a position and no sightings; timestamp is in milliseconds.
pub fn report_at(lat: f64, lon: f64, timestamp_ms: i64) -> Report {
    Report {
        timestamp: timestamp_ms,
        position: Position {
            latitude: lat,
            longitude: lon,
            altitude: Some(100.0),
            accuracy: None,
            age: None,
            altitude_accuracy: None,
            heading: None,
            speed: None,
            source: None,
        },
        cell_towers: None,
        wifi_access_points: None,
        bluetooth_beacons: None,
    }
}

/// A report carrying a single Wi-Fi sighting.
pub fn wifi_report_at(lat: f64, lon: f64, timestamp_ms: i64) -> Report {
    let mut report = report_at(lat, lon, timestamp_ms);
    report.wifi_access_points = Some(vec![WifiAccessPoint {
        mac_address: Some("aa:bb:cc:dd:ee:ff".to_string()),
        ..Default::default()
    }]);
    report
}

/// A tower sighting with only the radio type set.
pub fn tower(radio_type: RadioType) -> CellTower {
    CellTower {
        radio_type,
        mobile_country_code: None,
        mobile_network_code: None,
        age: None,
        asu: None,
        primary_scrambling_code: None,
        serving: None,
        signal_strength: None,
        arfcn: None,
    }
}

pub fn batch_of(items: Vec<Report>) -> ReportBatch {
    ReportBatch { items }
}
