use sockowner::{Protocol, SocketRecord};

use crate::cli::CliArgs;

const ADDR_WIDTH: usize = 21;
const STATE_WIDTH: usize = 11;
const USER_WIDTH: usize = 8;

/// Formats socket records as a netstat-style table.
pub struct OutputFormatter {
    /// `-n` flag: print the owner UID instead of the login name.
    pub numeric: bool,
}

impl OutputFormatter {
    pub fn from_cli(args: &CliArgs) -> Self {
        OutputFormatter {
            numeric: args.numeric,
        }
    }

    pub fn print_header(&self) {
        println!("{}", self.header());
    }

    pub fn print_record(&self, protocol: Protocol, record: &SocketRecord) {
        println!("{}", self.format_record(protocol, record));
    }

    fn header(&self) -> String {
        format!(
            "{:<5} {:<aw$} {:<aw$} {:<sw$} {:<uw$} {}",
            "Proto",
            "Local Address",
            "Foreign Address",
            "State",
            "User",
            "PID/Program name",
            aw = ADDR_WIDTH,
            sw = STATE_WIDTH,
            uw = USER_WIDTH,
        )
    }

    fn format_record(&self, protocol: Protocol, record: &SocketRecord) -> String {
        let owner = match record.process {
            Some(ref p) => p.to_string(),
            None => "-".to_string(),
        };
        format!(
            "{:<5} {:<aw$} {:<aw$} {:<sw$} {:<uw$} {}",
            protocol.to_string(),
            record.local.to_string(),
            record.remote.to_string(),
            record.state.name(),
            self.user_display(record.uid),
            owner,
            aw = ADDR_WIDTH,
            sw = STATE_WIDTH,
            uw = USER_WIDTH,
        )
    }

    fn user_display(&self, uid: u32) -> String {
        if self.numeric {
            return uid.to_string();
        }
        users::get_user_by_uid(uid)
            .map(|u| u.name().to_string_lossy().to_string())
            .unwrap_or_else(|| uid.to_string())
    }
}
