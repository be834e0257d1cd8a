use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::correlate::correlate;
use crate::error::{NetstatError, Result};
use crate::model::{Protocol, SocketRecord};
use crate::parse::{parse_socket_table, StatePolicy};
use crate::platform::{create_source, ProcConfig, ProcSource};

/// Where to find the socket tables and the process namespace.
#[derive(Debug, Clone)]
pub struct NetstatConfig {
    pub proc_root: PathBuf,
    pub tcp_table: PathBuf,
    pub udp_table: PathBuf,
    pub state_policy: StatePolicy,
}

impl Default for NetstatConfig {
    fn default() -> Self {
        Self::with_proc_root("/proc")
    }
}

impl NetstatConfig {
    /// Config whose tables live under `<root>/net/`.
    pub fn with_proc_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            tcp_table: root.join("net").join("tcp"),
            udp_table: root.join("net").join("udp"),
            proc_root: root,
            state_policy: StatePolicy::default(),
        }
    }

    pub fn table_path(&self, protocol: Protocol) -> &Path {
        match protocol {
            Protocol::Tcp => &self.tcp_table,
            Protocol::Udp => &self.udp_table,
        }
    }
}

/// Read the socket table for `protocol` and attribute each row to its
/// owning process.
pub fn list_sockets(config: &NetstatConfig, protocol: Protocol) -> Result<Vec<SocketRecord>> {
    let source = create_source(ProcConfig {
        root: config.proc_root.clone(),
    });
    list_sockets_with(config, protocol, &*source)
}

/// [`list_sockets`] against an explicit process source.
pub fn list_sockets_with(
    config: &NetstatConfig,
    protocol: Protocol,
    source: &dyn ProcSource,
) -> Result<Vec<SocketRecord>> {
    let mut records = read_table(config.table_path(protocol), config.state_policy)?;
    let report = correlate(&mut records, source);
    log::debug!(
        "{}: {} sockets, {} attributed",
        protocol,
        records.len(),
        report.sockets_attributed
    );
    Ok(records)
}

pub fn tcp_sockets(config: &NetstatConfig) -> Result<Vec<SocketRecord>> {
    list_sockets(config, Protocol::Tcp)
}

pub fn udp_sockets(config: &NetstatConfig) -> Result<Vec<SocketRecord>> {
    list_sockets(config, Protocol::Udp)
}

/// The file is closed before this returns, whether or not parsing succeeded.
fn read_table(path: &Path, policy: StatePolicy) -> Result<Vec<SocketRecord>> {
    let file = File::open(path).map_err(|source| NetstatError::TableUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_socket_table(BufReader::new(file), policy)
}
