use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetstatError {
    #[error("Malformed address {token:?}: {reason}")]
    MalformedAddress { token: String, reason: String },
    #[error("Socket table line {line}: {reason}")]
    TableFormat { line: usize, reason: String },
    #[error("Invalid connection state code: {0:#04X}")]
    InvalidState(u8),
    #[error("Socket table line {line}, field {field}: {source}")]
    Row {
        line: usize,
        field: &'static str,
        #[source]
        source: Box<NetstatError>,
    },
    #[error("Cannot read socket table {}: {source}", path.display())]
    TableUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Process unavailable: PID {pid}: {reason}")]
    ProcessUnavailable { pid: u32, reason: String },
    #[error("Platform error: {0}")]
    Platform(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetstatError {
    /// Line number of the offending table row, if this error came from one.
    pub fn line(&self) -> Option<usize> {
        match self {
            NetstatError::TableFormat { line, .. } | NetstatError::Row { line, .. } => Some(*line),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, NetstatError>;
