pub mod network;
pub mod process;

pub use network::{ConnectionState, Inode, Protocol, SocketAddress, SocketRecord};
pub use process::ProcessIdentity;
