//! Process discovery and per-process reads from /proc.

use once_cell::sync::Lazy;
use std::fs;
use std::path::{Path, PathBuf};

/// Process entry representing a directory in /proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcEntry {
    pub pid: u32,
    pub proc_path: PathBuf,
}

fn get_page_size() -> u64 {
    // SAFETY: sysconf is safe to call with _SC_PAGESIZE; errors return -1
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        4096
    }
}

/// Memory page size in bytes.
pub static PAGE_SIZE: Lazy<u64> = Lazy::new(get_page_size);

/// Scans `root` for process directories with numeric names.
pub fn collect_proc_entries(root: &Path) -> Vec<ProcEntry> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };

    entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name();
            let pid: u32 = name.to_str()?.parse().ok()?;
            let proc_path = entry.path();
            proc_path
                .join("stat")
                .exists()
                .then_some(ProcEntry { pid, proc_path })
        })
        .collect()
}

/// Reads process name from comm file or extracts from cmdline.
pub fn read_process_name(proc_path: &Path) -> Option<String> {
    if let Ok(s) = fs::read_to_string(proc_path.join("comm")) {
        let t = s.trim();
        if !t.is_empty() {
            return Some(t.into());
        }
    }

    let content = fs::read(proc_path.join("cmdline")).ok()?;
    let first = content.split(|&b| b == 0u8).next()?;
    let first = std::str::from_utf8(first).ok()?;
    Path::new(first)
        .file_name()
        .and_then(|name| name.to_str())
        .map(|s| s.to_string())
}

/// Resident set size in bytes from /proc/<pid>/statm.
pub fn read_rss_bytes(proc_path: &Path) -> Option<u64> {
    let content = fs::read_to_string(proc_path.join("statm")).ok()?;
    let pages: u64 = content.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages * *PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, write};
    use tempfile::tempdir;

    #[test]
    fn test_collect_proc_entries_numeric_only() {
        let dir = tempdir().unwrap();
        for name in ["1", "42", "self", "sys"] {
            create_dir_all(dir.path().join(name)).unwrap();
            write(dir.path().join(name).join("stat"), "x").unwrap();
        }
        // numeric but without stat
        create_dir_all(dir.path().join("99")).unwrap();

        let mut pids: Vec<u32> = collect_proc_entries(dir.path())
            .into_iter()
            .map(|e| e.pid)
            .collect();
        pids.sort_unstable();
        assert_eq!(pids, vec![1, 42]);
    }

    #[test]
    fn test_read_process_name_prefers_comm() {
        let dir = tempdir().unwrap();
        write(dir.path().join("comm"), "nginx\n").unwrap();
        write(dir.path().join("cmdline"), b"/usr/sbin/other\0-g\0").unwrap();
        assert_eq!(read_process_name(dir.path()).as_deref(), Some("nginx"));
    }

    #[test]
    fn test_read_process_name_from_cmdline() {
        let dir = tempdir().unwrap();
        write(dir.path().join("cmdline"), b"/usr/bin/postgres\0-D\0/data\0").unwrap();
        assert_eq!(read_process_name(dir.path()).as_deref(), Some("postgres"));
    }

    #[test]
    fn test_read_rss_bytes() {
        let dir = tempdir().unwrap();
        write(dir.path().join("statm"), "1000 250 100 10 0 300 0\n").unwrap();
        assert_eq!(read_rss_bytes(dir.path()), Some(250 * *PAGE_SIZE));
    }
}
