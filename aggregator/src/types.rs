use serde::{Deserialize, Serialize};

/// Per-technology capability flags.
///
/// Derived from one report's sighting lists, and accumulated per cell in the
/// durable store. Merging is a bitwise OR, so flags only ever move from false
/// to true.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioFlags {
    pub wifi: bool,
    pub gsm: bool,
    pub wcdma: bool,
    pub lte: bool,
    pub ble: bool,
}

impl RadioFlags {
    pub fn union(self, other: RadioFlags) -> RadioFlags {
        RadioFlags {
            wifi: self.wifi || other.wifi,
            gsm: self.gsm || other.gsm,
            wcdma: self.wcdma || other.wcdma,
            lte: self.lte || other.lte,
            ble: self.ble || other.ble,
        }
    }

    /// True when every flag set in `self` is also set in `other`.
    pub fn is_subset_of(self, other: RadioFlags) -> bool {
        self.union(other) == other
    }

    pub fn any(self) -> bool {
        self.wifi || self.gsm || self.wcdma || self.lte || self.ble
    }
}

/// One row of the durable aggregate: cumulative flags for a spatial cell and
/// the most recent confirming timestamp (seconds since epoch).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CellAggregate {
    pub cell_id: String,
    #[serde(flatten)]
    pub flags: RadioFlags,
    pub created_at: i64,
    pub last_update: i64,
}

/// Cache-resident mirror of a cell's merged state. Non-authoritative: may be
/// absent or one merge behind the store, never the only copy of truth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub flags: RadioFlags,
    pub last_update: i64,
}

impl CacheSnapshot {
    /// Whether an incoming merge would leave the aggregate unchanged.
    pub fn covers(&self, flags: RadioFlags, timestamp: i64) -> bool {
        flags.is_subset_of(self.flags) && timestamp <= self.last_update
    }
}

impl From<&CellAggregate> for CacheSnapshot {
    fn from(aggregate: &CellAggregate) -> Self {
        CacheSnapshot {
            flags: aggregate.flags,
            last_update: aggregate.last_update,
        }
    }
}

/// Whole-store counters: total cells plus per-flag sums.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoverageStats {
    pub hexes: u64,
    pub wifi: u64,
    pub gsm: u64,
    pub wcdma: u64,
    pub lte: u64,
    pub ble: u64,
}
