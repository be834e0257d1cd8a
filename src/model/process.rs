use std::fmt;

/// The process a socket was traced back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub pid: u32,
    /// Command name from `/proc/[pid]/stat`; empty when the stat file
    /// could not be read.
    pub name: String,
}

impl ProcessIdentity {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }
}

impl fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pid, self.name)
    }
}
