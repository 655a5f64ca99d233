//! Temperature sensor collector.
//!
//! Readings come from hardware monitoring chips:
//! - /sys/class/hwmon/hwmon*/temp*_input (with _label, _max, _crit)
//!
//! Hosts without hwmon temperature inputs fall back to
//! /sys/class/thermal/thermal_zone*/temp, one sensor per zone type.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SourceError;
use crate::source::{SensorTable, TemperatureReading};

pub const HWMON_ROOT: &str = "/sys/class/hwmon";
pub const THERMAL_ROOT: &str = "/sys/class/thermal";

/// Reads a millidegree file and converts it to degrees Celsius.
fn read_millidegrees(path: &Path) -> Option<f64> {
    fs::read_to_string(path)
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()
        .map(|m| m as f64 / 1000.0)
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// hwmon* directories sorted by index so enumeration order is stable.
pub(crate) fn hwmon_devices(root: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let entries = fs::read_dir(root).map_err(|e| SourceError::io(root.display().to_string(), e))?;

    let mut devices: Vec<(u32, PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let index = name.strip_prefix("hwmon")?.parse::<u32>().ok()?;
            Some((index, entry.path()))
        })
        .collect();
    devices.sort_by_key(|(index, _)| *index);
    Ok(devices.into_iter().map(|(_, path)| path).collect())
}

/// Input indices of files named `{prefix}{N}_input`, sorted.
pub(crate) fn input_indices(device: &Path, prefix: &str) -> Vec<u32> {
    let Ok(entries) = fs::read_dir(device) else {
        return Vec::new();
    };
    let mut indices: Vec<u32> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            name.strip_prefix(prefix)?
                .strip_suffix("_input")?
                .parse::<u32>()
                .ok()
        })
        .collect();
    indices.sort_unstable();
    indices
}

/// Chip name of a hwmon device, falling back to its directory name.
pub(crate) fn device_name(device: &Path) -> String {
    read_trimmed(&device.join("name")).unwrap_or_else(|| {
        device
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    })
}

/// Pushes readings under `sensor`, merging with an earlier chip of the same name.
pub(crate) fn push_grouped<T>(table: &mut SensorTable<T>, sensor: String, mut readings: Vec<T>) {
    if readings.is_empty() {
        return;
    }
    match table.iter_mut().find(|(name, _)| *name == sensor) {
        Some((_, existing)) => existing.append(&mut readings),
        None => table.push((sensor, readings)),
    }
}

/// Reads all hwmon temperature inputs below `root`, grouped per chip.
pub fn read_hwmon_temps(root: &Path) -> Result<SensorTable<TemperatureReading>, SourceError> {
    let mut table = SensorTable::new();

    for device in hwmon_devices(root)? {
        let sensor = device_name(&device);
        let readings = input_indices(&device, "temp")
            .into_iter()
            .filter_map(|i| {
                let current = read_millidegrees(&device.join(format!("temp{}_input", i)))?;
                Some(TemperatureReading {
                    label: read_trimmed(&device.join(format!("temp{}_label", i)))
                        .unwrap_or_else(|| sensor.clone()),
                    current,
                    high: read_millidegrees(&device.join(format!("temp{}_max", i))),
                    critical: read_millidegrees(&device.join(format!("temp{}_crit", i))),
                })
            })
            .collect();
        push_grouped(&mut table, sensor, readings);
    }

    Ok(table)
}

/// Reads thermal zones below `root`, one sensor per zone type.
pub fn read_thermal_zones(root: &Path) -> Result<SensorTable<TemperatureReading>, SourceError> {
    let entries = fs::read_dir(root).map_err(|e| SourceError::io(root.display().to_string(), e))?;

    let mut zones: Vec<(u32, PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let index = name.strip_prefix("thermal_zone")?.parse::<u32>().ok()?;
            Some((index, entry.path()))
        })
        .collect();
    zones.sort_by_key(|(index, _)| *index);

    let mut table = SensorTable::new();
    for (index, zone) in zones {
        let Some(current) = read_millidegrees(&zone.join("temp")) else {
            continue;
        };
        let sensor = read_trimmed(&zone.join("type"))
            .unwrap_or_else(|| format!("thermal_zone{}", index));

        // Trip points of type "critical"/"hot" map onto critical/high.
        let mut high = None;
        let mut critical = None;
        for trip in 0..16 {
            let Some(kind) = read_trimmed(&zone.join(format!("trip_point_{}_type", trip))) else {
                break;
            };
            let temp = read_millidegrees(&zone.join(format!("trip_point_{}_temp", trip)));
            match kind.as_str() {
                "critical" => critical = critical.or(temp),
                "hot" => high = high.or(temp),
                _ => {}
            }
        }

        push_grouped(
            &mut table,
            sensor.clone(),
            vec![TemperatureReading {
                label: sensor,
                current,
                high,
                critical,
            }],
        );
    }

    Ok(table)
}

/// Collects temperatures from hwmon, or from thermal zones if hwmon has none.
pub fn collect_temperatures() -> Result<SensorTable<TemperatureReading>, SourceError> {
    let thermal_root = Path::new(THERMAL_ROOT);
    match read_hwmon_temps(Path::new(HWMON_ROOT)) {
        Ok(table) if !table.is_empty() => Ok(table),
        Ok(_) => Ok(read_thermal_zones(thermal_root).unwrap_or_default()),
        Err(hwmon_err) => read_thermal_zones(thermal_root).map_err(|_| hwmon_err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, write};
    use tempfile::tempdir;

    #[test]
    fn test_read_hwmon_temps_with_limits() {
        let dir = tempdir().unwrap();
        let chip = dir.path().join("hwmon0");
        create_dir_all(&chip).unwrap();
        write(chip.join("name"), "coretemp\n").unwrap();
        write(chip.join("temp1_input"), "45000\n").unwrap();
        write(chip.join("temp1_label"), "Package id 0\n").unwrap();
        write(chip.join("temp1_max"), "80000\n").unwrap();
        write(chip.join("temp1_crit"), "100000\n").unwrap();
        write(chip.join("temp2_input"), "47500\n").unwrap();

        let table = read_hwmon_temps(dir.path()).unwrap();
        assert_eq!(table.len(), 1);
        let (sensor, readings) = &table[0];
        assert_eq!(sensor, "coretemp");
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].label, "Package id 0");
        assert_eq!(readings[0].current, 45.0);
        assert_eq!(readings[0].high, Some(80.0));
        assert_eq!(readings[0].critical, Some(100.0));
        // unlabelled inputs fall back to the chip name
        assert_eq!(readings[1].label, "coretemp");
        assert_eq!(readings[1].high, None);
    }

    #[test]
    fn test_read_thermal_zones_trip_points() {
        let dir = tempdir().unwrap();
        let zone = dir.path().join("thermal_zone0");
        create_dir_all(&zone).unwrap();
        write(zone.join("type"), "acpitz\n").unwrap();
        write(zone.join("temp"), "52000\n").unwrap();
        write(zone.join("trip_point_0_type"), "critical\n").unwrap();
        write(zone.join("trip_point_0_temp"), "95000\n").unwrap();

        let table = read_thermal_zones(dir.path()).unwrap();
        assert_eq!(table[0].0, "acpitz");
        assert_eq!(table[0].1[0].label, "acpitz");
        assert_eq!(table[0].1[0].current, 52.0);
        assert_eq!(table[0].1[0].critical, Some(95.0));
        assert_eq!(table[0].1[0].high, None);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(read_hwmon_temps(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn test_collect_temperatures() {
        // Hosts without sensors report an empty table or an unavailable root.
        let _ = collect_temperatures();
    }
}
