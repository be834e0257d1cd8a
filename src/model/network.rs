use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use super::process::ProcessIdentity;

/// An ip:port pair decoded from a socket table token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketAddress {
    pub ip: IpAddr,
    pub port: u16,
}

impl SocketAddress {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            IpAddr::V4(ip) => write!(f, "{}:{}", ip, self.port),
            IpAddr::V6(ip) => write!(f, "[{}]:{}", ip, self.port),
        }
    }
}

/// Which kernel socket table a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// Connection state as reported in the `st` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Listen,
    Closing,
    /// A code outside 0x01..=0x0B, kept as read.
    Unknown(u8),
}

impl ConnectionState {
    /// Total mapping from a kernel state code. Codes the catalog does not
    /// know map to `Unknown`.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => ConnectionState::Established,
            0x02 => ConnectionState::SynSent,
            0x03 => ConnectionState::SynRecv,
            0x04 => ConnectionState::FinWait1,
            0x05 => ConnectionState::FinWait2,
            0x06 => ConnectionState::TimeWait,
            0x07 => ConnectionState::Close,
            0x08 => ConnectionState::CloseWait,
            0x09 => ConnectionState::LastAck,
            0x0A => ConnectionState::Listen,
            0x0B => ConnectionState::Closing,
            other => ConnectionState::Unknown(other),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ConnectionState::Unknown(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Established => "ESTABLISHED",
            ConnectionState::SynSent => "SYN_SENT",
            ConnectionState::SynRecv => "SYN_RECV",
            ConnectionState::FinWait1 => "FIN_WAIT1",
            ConnectionState::FinWait2 => "FIN_WAIT2",
            ConnectionState::TimeWait => "TIME_WAIT",
            ConnectionState::Close => "CLOSE",
            ConnectionState::CloseWait => "CLOSE_WAIT",
            ConnectionState::LastAck => "LAST_ACK",
            ConnectionState::Listen => "LISTEN",
            ConnectionState::Closing => "CLOSING",
            ConnectionState::Unknown(_) => "UNKNOWN",
        }
    }

    /// Inverse of `name`, case-insensitive. `UNKNOWN` is not accepted
    /// since it does not identify a single code.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        (0x01..=0x0B)
            .map(ConnectionState::from_code)
            .find(|state| state.name() == upper)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Socket inode, used only as a join key between the table and the
/// descriptor links. Never compared by order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Inode(u64);

impl Inode {
    pub fn new(ino: u64) -> Self {
        Inode(ino)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Inode {
    fn from(ino: u64) -> Self {
        Inode(ino)
    }
}

impl fmt::Display for Inode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of a socket table, optionally attributed to a process.
#[derive(Debug, Clone)]
pub struct SocketRecord {
    pub inode: Inode,
    pub local: SocketAddress,
    pub remote: SocketAddress,
    pub state: ConnectionState,
    pub uid: u32,
    pub process: Option<Arc<ProcessIdentity>>,
}

impl SocketRecord {
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(|p| p.pid)
    }
}
