//! Parser for the `/proc/net/tcp` and `/proc/net/udp` tables.

use std::io::BufRead;

use crate::error::{NetstatError, Result};
use crate::model::{ConnectionState, Inode, SocketRecord};

use super::address::{parse_hex, parse_socket_address};

const MIN_FIELDS: usize = 12;

const FIELD_LOCAL: usize = 1;
const FIELD_REMOTE: usize = 2;
const FIELD_STATE: usize = 3;
const FIELD_UID: usize = 7;
const FIELD_INODE: usize = 9;

/// What to do with a state code outside the known catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatePolicy {
    /// Keep the row as `ConnectionState::Unknown(code)`.
    #[default]
    Lenient,
    /// Fail the parse with `InvalidState`.
    Strict,
}

/// Parse a whole socket table snapshot.
///
/// The first line is a column header and is skipped unread. Anything from
/// the first `#` on a line is dropped, and lines left blank are skipped.
/// Every other line must carry at least 12 fields; a single bad line fails
/// the whole table.
pub fn parse_socket_table<R: BufRead>(reader: R, policy: StatePolicy) -> Result<Vec<SocketRecord>> {
    let mut records = Vec::new();

    for (idx, bytes) in reader.split(b'\n').enumerate().skip(1) {
        let mut bytes = bytes?;
        let line_no = idx + 1;
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        let line = String::from_utf8(bytes).map_err(|e| NetstatError::TableFormat {
            line: line_no,
            reason: format!("invalid UTF-8: {}", e),
        })?;
        let content = match line.find('#') {
            Some(i) => &line[..i],
            None => line.as_str(),
        };
        if content.trim().is_empty() {
            continue;
        }
        records.push(parse_row(content, line_no, policy)?);
    }

    Ok(records)
}

/// Unsigned decimal with no sign, as the kernel prints it.
fn parse_decimal<T: std::str::FromStr>(s: &str) -> std::result::Result<T, String>
where
    T::Err: std::fmt::Display,
{
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err("not an unsigned decimal".to_string());
    }
    s.parse().map_err(|e: T::Err| e.to_string())
}

fn parse_row(content: &str, line: usize, policy: StatePolicy) -> Result<SocketRecord> {
    let fields: Vec<&str> = content.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return Err(NetstatError::TableFormat {
            line,
            reason: format!(
                "expected at least {} fields, found {}",
                MIN_FIELDS,
                fields.len()
            ),
        });
    }

    let local = parse_socket_address(fields[FIELD_LOCAL]).map_err(|e| row_error(line, "local_address", e))?;
    let remote = parse_socket_address(fields[FIELD_REMOTE]).map_err(|e| row_error(line, "rem_address", e))?;

    let code = parse_hex(fields[FIELD_STATE])
        .and_then(|s| u8::from_str_radix(s, 16).map_err(|e| e.to_string()))
        .map_err(|reason| NetstatError::TableFormat {
            line,
            reason: format!("invalid state {:?}: {}", fields[FIELD_STATE], reason),
        })?;
    let state = ConnectionState::from_code(code);
    if policy == StatePolicy::Strict && !state.is_known() {
        return Err(row_error(line, "st", NetstatError::InvalidState(code)));
    }

    let uid: u32 = parse_decimal(fields[FIELD_UID]).map_err(|reason| NetstatError::TableFormat {
        line,
        reason: format!("invalid uid {:?}: {}", fields[FIELD_UID], reason),
    })?;

    let inode: u64 = parse_decimal(fields[FIELD_INODE]).map_err(|reason| NetstatError::TableFormat {
        line,
        reason: format!("invalid inode {:?}: {}", fields[FIELD_INODE], reason),
    })?;

    Ok(SocketRecord {
        inode: Inode::new(inode),
        local,
        remote,
        state,
        uid,
        process: None,
    })
}

fn row_error(line: usize, field: &'static str, source: NetstatError) -> NetstatError {
    NetstatError::Row {
        line,
        field,
        source: Box::new(source),
    }
}
