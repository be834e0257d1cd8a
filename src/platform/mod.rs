use std::path::PathBuf;

use crate::error::Result;
use crate::model::Inode;

/// Read access to a process namespace laid out like `/proc`.
///
/// Every method may fail for a single process; callers treat such a
/// failure as "this process contributed nothing".
pub trait ProcSource {
    /// Pids of the processes currently visible, in ascending order.
    fn list_pids(&self) -> Result<Vec<u32>>;
    /// Inodes of the `socket:[N]` descriptors under `[pid]/fd`. Other
    /// descriptor kinds and descriptors closed mid-read are left out.
    fn socket_inodes(&self, pid: u32) -> Result<Vec<Inode>>;
    /// First line of `[pid]/stat`.
    fn stat_line(&self, pid: u32) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ProcConfig {
    pub root: PathBuf,
}

impl Default for ProcConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/proc"),
        }
    }
}

mod linux;

pub use linux::ProcFs;

pub fn create_source(config: ProcConfig) -> Box<dyn ProcSource> {
    Box::new(ProcFs::new(config))
}
