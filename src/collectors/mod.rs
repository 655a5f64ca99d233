//! Collectors module for system metrics.
//!
//! This module contains the /sys and /proc readers behind the host metric
//! source: filesystem usage, network interface statistics, thermal sensors,
//! fans, batteries and display adapters.

pub mod fans;
pub mod filesystem;
pub mod gpu;
pub mod netdev;
pub mod power;
pub mod thermal;
