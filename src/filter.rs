use sockowner::error::{NetstatError, Result};
use sockowner::{ConnectionState, Protocol, SocketRecord};

use crate::cli::CliArgs;

/// Record-level selection built from CLI arguments. All active criteria
/// must match.
#[derive(Debug, Default)]
pub struct FilterConfig {
    pub pids: Option<PidFilter>,
    pub states: Vec<ConnectionState>,
    /// `-l`: only sockets waiting for peers.
    pub listening: bool,
}

/// PID-based filter with include/exclude lists.
#[derive(Debug, Default)]
pub struct PidFilter {
    pub include: Vec<u32>,
    pub exclude: Vec<u32>,
}

/// Parse a PID filter string.
///
/// Format: comma-separated PIDs, prefix `^` to exclude.
/// Examples: "1234,5678", "^1234", "1234,^5678"
fn parse_pid_filter(s: &str) -> Result<PidFilter> {
    let mut filter = PidFilter::default();
    for token in s.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (list, digits) = match token.strip_prefix('^') {
            Some(rest) => (&mut filter.exclude, rest),
            None => (&mut filter.include, token),
        };
        let pid: u32 = digits
            .parse()
            .map_err(|_| NetstatError::Parse(format!("invalid PID: {}", digits)))?;
        list.push(pid);
    }
    Ok(filter)
}

/// Parse a comma-separated list of state names.
fn parse_state_filter(s: &str) -> Result<Vec<ConnectionState>> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            ConnectionState::from_name(t)
                .ok_or_else(|| NetstatError::Parse(format!("unknown state: {}", t)))
        })
        .collect()
}

/// A bound UDP socket with no peer sits in CLOSE; that is its listening form.
fn is_listening(protocol: Protocol, state: ConnectionState) -> bool {
    match protocol {
        Protocol::Tcp => state == ConnectionState::Listen,
        Protocol::Udp => state == ConnectionState::Close,
    }
}

impl FilterConfig {
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        let pids = args.pid.as_deref().map(parse_pid_filter).transpose()?;
        let states = match args.state.as_deref() {
            Some(s) => parse_state_filter(s)?,
            None => Vec::new(),
        };
        Ok(FilterConfig {
            pids,
            states,
            listening: args.listening,
        })
    }

    pub fn matches(&self, protocol: Protocol, record: &SocketRecord) -> bool {
        if self.listening && !is_listening(protocol, record.state) {
            return false;
        }
        if !self.states.is_empty() && !self.states.contains(&record.state) {
            return false;
        }
        if let Some(ref f) = self.pids {
            let pid = record.pid();
            if !f.include.is_empty() && !pid.is_some_and(|p| f.include.contains(&p)) {
                return false;
            }
            if pid.is_some_and(|p| f.exclude.contains(&p)) {
                return false;
            }
        }
        true
    }
}
