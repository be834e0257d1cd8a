//! Decoding of the `HEXADDR:HEXPORT` tokens found in `/proc/net/{tcp,udp}`.
//!
//! The kernel prints the IPv4 address as the hex value of the in-memory
//! `__be32`, read as a native (little-endian) word. Turning that word back
//! into bytes with little-endian order yields the address in network order.
//! The port is printed already converted to host order.

use std::net::{IpAddr, Ipv4Addr};

use crate::error::{NetstatError, Result};
use crate::model::SocketAddress;

/// Decode a `HEXADDR:HEXPORT` token.
pub fn parse_socket_address(token: &str) -> Result<SocketAddress> {
    let mut parts = token.split(':');
    let (addr_hex, port_hex) = match (parts.next(), parts.next()) {
        (Some(a), Some(p)) => (a, p),
        _ => return Err(malformed(token, "expected HEXADDR:HEXPORT")),
    };

    let word = parse_hex(addr_hex)
        .and_then(|s| u32::from_str_radix(s, 16).map_err(|e| e.to_string()))
        .map_err(|reason| malformed(token, &format!("address: {}", reason)))?;
    let port = parse_hex(port_hex)
        .and_then(|s| u16::from_str_radix(s, 16).map_err(|e| e.to_string()))
        .map_err(|reason| malformed(token, &format!("port: {}", reason)))?;

    let ip = Ipv4Addr::from(word.to_le_bytes());
    Ok(SocketAddress::new(IpAddr::V4(ip), port))
}

/// Inverse of [`parse_socket_address`] for IPv4 addresses.
///
/// Returns `None` for IPv6 addresses, which this table format does not carry.
pub fn encode_socket_address(addr: &SocketAddress) -> Option<String> {
    match addr.ip {
        IpAddr::V4(ip) => {
            let word = u32::from_le_bytes(ip.octets());
            Some(format!("{:08X}:{:04X}", word, addr.port))
        }
        IpAddr::V6(_) => None,
    }
}

/// `from_str_radix` accepts a leading `+`; the kernel never prints one.
pub(crate) fn parse_hex(s: &str) -> std::result::Result<&str, String> {
    if s.is_empty() {
        return Err("empty".to_string());
    }
    if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("{:?} is not hexadecimal", s));
    }
    Ok(s)
}

fn malformed(token: &str, reason: &str) -> NetstatError {
    NetstatError::MalformedAddress {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}
