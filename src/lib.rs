//! Socket inventory for Linux hosts.
//!
//! Reads `/proc/net/tcp` or `/proc/net/udp`, then walks `/proc/[pid]/fd`
//! to find which process holds each socket open.

pub mod correlate;
pub mod error;
pub mod model;
pub mod netstat;
pub mod parse;
pub mod platform;

pub use error::{NetstatError, Result};
pub use model::{ConnectionState, Inode, ProcessIdentity, Protocol, SocketAddress, SocketRecord};
pub use netstat::{list_sockets, list_sockets_with, tcp_sockets, udp_sockets, NetstatConfig};
pub use parse::StatePolicy;
