use crate::report::{RadioType, Report};
use crate::types::RadioFlags;

/// Reports claiming an altitude above this ceiling (meters) are treated as
/// bad telemetry and excluded from aggregation entirely.
pub const MAX_REPORT_ALTITUDE: f64 = 2000.0;

/// True when the report's altitude disqualifies it. A missing altitude passes.
pub fn exceeds_altitude_ceiling(report: &Report) -> bool {
    report
        .position
        .altitude
        .is_some_and(|altitude| altitude > MAX_REPORT_ALTITUDE)
}

/// Derive capability flags from a report's sighting lists.
///
/// Tower scanning stops once all three cellular flags are set. Wi-Fi and
/// Bluetooth only care whether the list is non-empty; missing lists count as
/// empty.
pub fn classify(report: &Report) -> RadioFlags {
    let mut flags = RadioFlags::default();

    if let Some(towers) = &report.cell_towers {
        for tower in towers {
            if flags.gsm && flags.wcdma && flags.lte {
                break;
            }
            match tower.radio_type {
                RadioType::Gsm => flags.gsm = true,
                RadioType::Wcdma => flags.wcdma = true,
                RadioType::Lte => flags.lte = true,
                RadioType::Unknown => {}
            }
        }
    }

    flags.wifi = report
        .wifi_access_points
        .as_ref()
        .is_some_and(|aps| !aps.is_empty());
    flags.ble = report
        .bluetooth_beacons
        .as_ref()
        .is_some_and(|beacons| !beacons.is_empty());

    flags
}
