#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;

use tempfile::TempDir;

pub const TABLE_HEADER: &str =
    "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode";

/// A throwaway directory laid out like `/proc`.
pub struct FakeProc {
    pub dir: TempDir,
}

impl FakeProc {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("net")).unwrap();
        fs::create_dir_all(dir.path().join("self")).unwrap();
        let proc = FakeProc { dir };
        proc.write_table("tcp", &[]);
        proc.write_table("udp", &[]);
        proc
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `net/<name>` with the standard header followed by `rows`.
    pub fn write_table(&self, name: &str, rows: &[String]) {
        let mut text = String::from(TABLE_HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.push('\n');
        fs::write(self.root().join("net").join(name), text).unwrap();
    }

    /// Create `<pid>/stat` and one `fd/<n>` symlink per target.
    pub fn add_process(&self, pid: u32, stat: Option<&str>, fd_targets: &[&str]) {
        let pid_dir = self.root().join(pid.to_string());
        let fd_dir = pid_dir.join("fd");
        fs::create_dir_all(&fd_dir).unwrap();
        if let Some(stat) = stat {
            fs::write(pid_dir.join("stat"), format!("{}\n", stat)).unwrap();
        }
        for (n, target) in fd_targets.iter().enumerate() {
            symlink(target, fd_dir.join(n.to_string())).unwrap();
        }
    }

    /// A pid directory without an `fd` subdirectory, as for a process
    /// that exited mid-scan.
    pub fn add_vanished_process(&self, pid: u32) {
        fs::create_dir_all(self.root().join(pid.to_string())).unwrap();
    }
}

/// One table row in kernel layout.
pub fn row(slot: usize, local: &str, remote: &str, state: &str, uid: u32, inode: &str) -> String {
    format!(
        "{:>4}: {} {} {} 00000000:00000000 00:00000000 00000000 {:>5}        0 {} 1 0000000000000000 100 0 0 10 0",
        slot, local, remote, state, uid, inode
    )
}
