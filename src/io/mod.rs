//! IO module - configuration files for breakup runs.

mod config;

pub use config::{read_breakup_config, BreakupConfig, PotentialConfig};
