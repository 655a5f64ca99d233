//! Filesystem usage collector.
//!
//! Reads mounted filesystems from /proc/mounts, skips pseudo filesystems and
//! system mount points, and queries usage with statvfs.

use nix::sys::statvfs::statvfs;
use std::fs;

use crate::error::SourceError;
use crate::source::DiskUsage;

pub const MOUNTS_PATH: &str = "/proc/mounts";

/// One line of /proc/mounts.
#[derive(Debug, Clone, PartialEq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
    pub fstype: String,
}

/// Parses /proc/mounts content, keeping the first entry per mount point.
pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    let mut mounts: Vec<MountEntry> = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }

        let mount_point = unescape_mount(parts[1]);
        if mounts.iter().any(|m| m.mount_point == mount_point) {
            continue;
        }
        mounts.push(MountEntry {
            device: parts[0].to_string(),
            mount_point,
            fstype: parts[2].to_string(),
        });
    }

    mounts
}

/// Decodes the octal escapes (`\040` for space) used in /proc/mounts.
fn unescape_mount(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let value = digits
                    .iter()
                    .fold(0u16, |acc, b| acc * 8 + u16::from(b - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}

/// Checks if a filesystem should be skipped based on type and mount point.
pub fn should_skip_filesystem(fstype: &str, mount_point: &str) -> bool {
    let skip_types = [
        "proc",
        "sysfs",
        "devpts",
        "devtmpfs",
        "tmpfs",
        "cgroup",
        "cgroup2",
        "pstore",
        "bpf",
        "debugfs",
        "tracefs",
        "fusectl",
        "configfs",
        "securityfs",
        "hugetlbfs",
        "mqueue",
        "autofs",
        "binfmt_misc",
        "overlay",
        "squashfs",
        "nsfs",
        "efivarfs",
        "rpc_pipefs",
    ];

    if skip_types.contains(&fstype) {
        return true;
    }

    mount_point.starts_with("/proc")
        || mount_point.starts_with("/sys")
        || mount_point.starts_with("/dev")
        || mount_point.starts_with("/run")
}

/// Usage of one mount point. `free` is the space available to unprivileged
/// users, and `percent` is relative to `used + free`.
pub fn disk_usage(mount_point: &str) -> Result<DiskUsage, SourceError> {
    let stat = statvfs(mount_point).map_err(|e| SourceError::io(mount_point, e.into()))?;

    let block_size = stat.fragment_size() as u64;
    let total = block_size * stat.blocks() as u64;
    let free = block_size * stat.blocks_available() as u64;
    let used = total.saturating_sub(block_size * stat.blocks_free() as u64);

    Ok(DiskUsage {
        mount: mount_point.to_string(),
        percent: usage_percent(used, free),
        total,
        used,
        free,
    })
}

pub fn usage_percent(used: u64, free: u64) -> f64 {
    let denominator = used + free;
    if denominator == 0 {
        0.0
    } else {
        used as f64 / denominator as f64 * 100.0
    }
}

/// Usage of every real filesystem, in /proc/mounts order. Mounts that cannot
/// be queried are omitted.
pub fn read_disk_table() -> Result<Vec<DiskUsage>, SourceError> {
    let content = fs::read_to_string(MOUNTS_PATH).map_err(|e| SourceError::io(MOUNTS_PATH, e))?;

    Ok(parse_mounts(&content)
        .into_iter()
        .filter(|m| !should_skip_filesystem(&m.fstype, &m.mount_point))
        .filter_map(|m| disk_usage(&m.mount_point).ok())
        .collect())
}
