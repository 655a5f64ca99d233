//! Network interface statistics collector.
//!
//! Reads per-interface counters from /proc/net/dev. Receive columns map to
//! `*_recv`/`*in`, transmit columns to `*_sent`/`*out`.

use std::fs;

use crate::error::SourceError;
use crate::source::{InterfaceCounters, InterfaceTable, NetworkTotals};

pub const NETDEV_PATH: &str = "/proc/net/dev";

/// Parses /proc/net/dev content into counters per interface, in file order.
pub fn parse_netdev(content: &str) -> InterfaceTable {
    let mut stats = InterfaceTable::new();

    // First two lines are headers
    for line in content.lines().skip(2) {
        let Some((interface, counters)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<u64> = counters
            .split_whitespace()
            .map(|v| v.parse().unwrap_or(0))
            .collect();
        if values.len() < 16 {
            continue;
        }

        stats.push((
            interface.trim().to_string(),
            InterfaceCounters {
                bytes_recv: values[0],
                packets_recv: values[1],
                errin: values[2],
                dropin: values[3],
                bytes_sent: values[8],
                packets_sent: values[9],
                errout: values[10],
                dropout: values[11],
            },
        ));
    }

    stats
}

pub fn read_netdev_stats() -> Result<InterfaceTable, SourceError> {
    let content = fs::read_to_string(NETDEV_PATH).map_err(|e| SourceError::io(NETDEV_PATH, e))?;
    Ok(parse_netdev(&content))
}

/// Sum over all interfaces, loopback included.
pub fn totals(table: &InterfaceTable) -> NetworkTotals {
    table.iter().fold(NetworkTotals::default(), |acc, (_, c)| NetworkTotals {
        bytes_sent: acc.bytes_sent + c.bytes_sent,
        bytes_recv: acc.bytes_recv + c.bytes_recv,
    })
}
