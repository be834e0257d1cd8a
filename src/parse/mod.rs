pub mod address;
pub mod table;

pub use address::{encode_socket_address, parse_socket_address};
pub use table::{parse_socket_table, StatePolicy};
