//! Battery collector.
//!
//! Reads /sys/class/power_supply. The first supply of type `Battery` provides
//! the charge level; any online `Mains` supply marks the host as plugged in.

use std::fs;
use std::path::Path;

use crate::error::SourceError;
use crate::source::BatteryStatus;

pub const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn read_u64(path: &Path) -> Option<u64> {
    read_trimmed(path)?.parse().ok()
}

fn battery_percent(supply: &Path) -> Option<f64> {
    if let Some(capacity) = read_u64(&supply.join("capacity")) {
        return Some(capacity as f64);
    }
    let pairs = [("energy_now", "energy_full"), ("charge_now", "charge_full")];
    pairs.iter().find_map(|(now, full)| {
        let now = read_u64(&supply.join(now))?;
        let full = read_u64(&supply.join(full)).filter(|f| *f > 0)?;
        Some((now as f64 / full as f64 * 100.0).min(100.0))
    })
}

/// Battery state below `root`, or `None` when no battery is present.
pub fn read_battery(root: &Path) -> Result<Option<BatteryStatus>, SourceError> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SourceError::io(root.display().to_string(), e)),
    };

    let mut supplies: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    supplies.sort();

    let mut percent = None;
    let mut mains_online = None;
    let mut battery_status = None;

    for supply in &supplies {
        match read_trimmed(&supply.join("type")).as_deref() {
            Some("Battery") if percent.is_none() => {
                percent = battery_percent(supply);
                battery_status = read_trimmed(&supply.join("status"));
            }
            Some("Mains") => {
                let online = read_u64(&supply.join("online")) == Some(1);
                mains_online = Some(mains_online.unwrap_or(false) || online);
            }
            _ => {}
        }
    }

    let Some(percent) = percent else {
        return Ok(None);
    };
    // Without a mains supply, infer from the battery's own status
    let plugged = mains_online.unwrap_or_else(|| {
        matches!(battery_status.as_deref(), Some("Charging") | Some("Full"))
    });

    Ok(Some(BatteryStatus { percent, plugged }))
}

pub fn collect_battery() -> Result<Option<BatteryStatus>, SourceError> {
    read_battery(Path::new(POWER_SUPPLY_ROOT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, write};
    use tempfile::tempdir;

    #[test]
    fn test_battery_with_mains() {
        let dir = tempdir().unwrap();
        let ac = dir.path().join("AC");
        let bat = dir.path().join("BAT0");
        create_dir_all(&ac).unwrap();
        create_dir_all(&bat).unwrap();
        write(ac.join("type"), "Mains\n").unwrap();
        write(ac.join("online"), "1\n").unwrap();
        write(bat.join("type"), "Battery\n").unwrap();
        write(bat.join("capacity"), "87\n").unwrap();

        let status = read_battery(dir.path()).unwrap().unwrap();
        assert_eq!(status.percent, 87.0);
        assert!(status.plugged);
    }

    #[test]
    fn test_battery_from_energy_and_status() {
        let dir = tempdir().unwrap();
        let bat = dir.path().join("BAT1");
        create_dir_all(&bat).unwrap();
        write(bat.join("type"), "Battery\n").unwrap();
        write(bat.join("energy_now"), "25000\n").unwrap();
        write(bat.join("energy_full"), "50000\n").unwrap();
        write(bat.join("status"), "Discharging\n").unwrap();

        let status = read_battery(dir.path()).unwrap().unwrap();
        assert_eq!(status.percent, 50.0);
        assert!(!status.plugged);
    }

    #[test]
    fn test_no_battery() {
        let dir = tempdir().unwrap();
        assert_eq!(read_battery(dir.path()).unwrap(), None);
        assert_eq!(read_battery(&dir.path().join("missing")).unwrap(), None);
    }
}
