//! GPU enumeration.
//!
//! Uses `lspci` and keeps display controller lines. Without `lspci`, PCI
//! devices of class 0x03 are listed from sysfs. An empty result is reported as
//! `["Not detected"]`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::process::Command;

use crate::error::SourceError;

pub const NOT_DETECTED: &str = "Not detected";
pub const PCI_DEVICES_ROOT: &str = "/sys/bus/pci/devices";

static DISPLAY_CONTROLLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(VGA|3D)\b").expect("Invalid regex"));

/// Display controller lines of `lspci` output.
pub fn parse_lspci(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| DISPLAY_CONTROLLER.is_match(line))
        .map(|line| line.trim().to_string())
        .collect()
}

fn run_lspci() -> Result<Vec<String>, SourceError> {
    let output = Command::new("lspci")
        .output()
        .map_err(|e| SourceError::io("lspci", e))?;
    if !output.status.success() {
        return Err(SourceError::parse("lspci", format!("exited with {}", output.status)));
    }
    Ok(parse_lspci(&String::from_utf8_lossy(&output.stdout)))
}

/// Display-class PCI devices below `root`, as `address vendor:device`.
pub fn read_pci_display_devices(root: &Path) -> Result<Vec<String>, SourceError> {
    let entries = fs::read_dir(root).map_err(|e| SourceError::io(root.display().to_string(), e))?;

    let mut devices: Vec<String> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let class = fs::read_to_string(path.join("class")).ok()?;
            if !class.trim().starts_with("0x03") {
                return None;
            }
            let read_id = |name: &str| {
                fs::read_to_string(path.join(name))
                    .map(|s| s.trim().trim_start_matches("0x").to_string())
                    .unwrap_or_default()
            };
            Some(format!(
                "{} Display controller {}:{}",
                entry.file_name().to_string_lossy(),
                read_id("vendor"),
                read_id("device")
            ))
        })
        .collect();
    devices.sort();
    Ok(devices)
}

pub fn collect_gpus() -> Result<Vec<String>, SourceError> {
    let gpus = match run_lspci() {
        Ok(gpus) => gpus,
        Err(_) => read_pci_display_devices(Path::new(PCI_DEVICES_ROOT)).unwrap_or_default(),
    };

    if gpus.is_empty() {
        Ok(vec![NOT_DETECTED.to_string()])
    } else {
        Ok(gpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, write};
    use tempfile::tempdir;

    #[test]
    fn test_parse_lspci() {
        let output = "\
00:00.0 Host bridge: Intel Corporation 8th Gen Core Processor Host Bridge
00:02.0 VGA compatible controller: Intel Corporation UHD Graphics 620 (rev 07)
01:00.0 3D controller: NVIDIA Corporation GP108M [GeForce MX150] (rev a1)
02:00.0 Network controller: Intel Corporation Wireless 8265
";
        let gpus = parse_lspci(output);
        assert_eq!(gpus.len(), 2);
        assert!(gpus[0].contains("UHD Graphics 620"));
        assert!(gpus[1].starts_with("01:00.0 3D controller"));
    }

    #[test]
    fn test_read_pci_display_devices() {
        let dir = tempdir().unwrap();
        let gpu = dir.path().join("0000:00:02.0");
        let nic = dir.path().join("0000:02:00.0");
        create_dir_all(&gpu).unwrap();
        create_dir_all(&nic).unwrap();
        write(gpu.join("class"), "0x030000\n").unwrap();
        write(gpu.join("vendor"), "0x8086\n").unwrap();
        write(gpu.join("device"), "0x5917\n").unwrap();
        write(nic.join("class"), "0x028000\n").unwrap();

        let devices = read_pci_display_devices(dir.path()).unwrap();
        assert_eq!(devices, vec!["0000:00:02.0 Display controller 8086:5917"]);
    }

    #[test]
    fn test_collect_gpus_never_empty() {
        assert!(!collect_gpus().unwrap().is_empty());
    }
}
