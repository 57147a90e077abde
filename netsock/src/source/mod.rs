//! Connection sources: where the rows of the connection table come from.

mod json;
mod procfs;

pub use json::JsonSource;
pub use procfs::{parse_table, tcp_state_name, ProcNetSource, SocketEntry, TABLES};

use crate::{Config, Connection, Result};

/// Something that can enumerate connection records.
pub trait ConnectionSource {
    /// Short name for logs and messages.
    fn name(&self) -> &str;

    /// Enumerate connections.
    fn connections(&self) -> Result<Vec<Connection>>;
}

/// The native source for this platform.
#[cfg(target_os = "linux")]
pub fn default_source(config: &Config) -> Result<Box<dyn ConnectionSource>> {
    Ok(Box::new(ProcNetSource::new(&config.proc_root)))
}

/// The native source for this platform.
#[cfg(not(target_os = "linux"))]
pub fn default_source(_config: &Config) -> Result<Box<dyn ConnectionSource>> {
    Err(crate::Error::Source(format!(
        "no native connection source on {}; pass a snapshot file with --from",
        std::env::consts::OS
    )))
}
