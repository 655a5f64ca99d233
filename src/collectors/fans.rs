//! Fan speed collector reading /sys/class/hwmon/hwmon*/fan*_input.

use std::fs;
use std::path::Path;

use super::thermal::{device_name, hwmon_devices, input_indices, push_grouped, HWMON_ROOT};
use crate::error::SourceError;
use crate::source::{FanReading, SensorTable};

pub fn read_hwmon_fans(root: &Path) -> Result<SensorTable<FanReading>, SourceError> {
    let mut table = SensorTable::new();

    for device in hwmon_devices(root)? {
        let sensor = device_name(&device);
        let readings = input_indices(&device, "fan")
            .into_iter()
            .filter_map(|i| {
                let rpm = fs::read_to_string(device.join(format!("fan{}_input", i)))
                    .ok()?
                    .trim()
                    .parse::<u64>()
                    .ok()?;
                let label = fs::read_to_string(device.join(format!("fan{}_label", i)))
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| sensor.clone());
                Some(FanReading {
                    label,
                    current: rpm as f64,
                })
            })
            .collect();
        push_grouped(&mut table, sensor, readings);
    }

    Ok(table)
}

/// Fans of all hwmon chips; hosts without hwmon report no fans.
pub fn collect_fans() -> Result<SensorTable<FanReading>, SourceError> {
    let root = Path::new(HWMON_ROOT);
    if !root.exists() {
        return Ok(SensorTable::new());
    }
    read_hwmon_fans(root)
}
