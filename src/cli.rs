use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sockowner", version, about = "List TCP/UDP sockets and the processes that own them")]
pub struct CliArgs {
    /// Show TCP sockets
    #[arg(short = 't', long = "tcp")]
    pub tcp: bool,

    /// Show UDP sockets
    #[arg(short = 'u', long = "udp")]
    pub udp: bool,

    /// Only listening sockets
    #[arg(short = 'l', long = "listening")]
    pub listening: bool,

    /// Select by PID (comma-separated, prefix ^ to exclude)
    #[arg(short = 'p', value_name = "PID")]
    pub pid: Option<String>,

    /// Select by connection state (comma-separated, e.g. LISTEN,ESTABLISHED)
    #[arg(short = 's', value_name = "STATE")]
    pub state: Option<String>,

    /// List UID numbers instead of login names
    #[arg(short = 'n', long = "numeric")]
    pub numeric: bool,

    /// Root of the process namespace
    #[arg(long = "proc-root", value_name = "DIR", default_value = "/proc")]
    pub proc_root: PathBuf,

    /// Fail on connection state codes outside the known set
    #[arg(long = "strict-states")]
    pub strict_states: bool,
}

impl CliArgs {
    /// TCP and UDP are both listed unless one of them was asked for.
    pub fn protocols(&self) -> (bool, bool) {
        if !self.tcp && !self.udp {
            (true, true)
        } else {
            (self.tcp, self.udp)
        }
    }
}
