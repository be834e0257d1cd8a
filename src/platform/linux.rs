use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use procfs::process::{FDTarget, Process};

use super::{ProcConfig, ProcSource};
use crate::error::{NetstatError, Result};
use crate::model::Inode;

/// `ProcSource` over a procfs tree, `/proc` by default.
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(config: ProcConfig) -> Self {
        Self { root: config.root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn pid_dir(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string())
    }

    fn process(&self, pid: u32) -> Result<Process> {
        Process::new_with_root(self.pid_dir(pid)).map_err(|e| NetstatError::ProcessUnavailable {
            pid,
            reason: e.to_string(),
        })
    }
}

impl ProcSource for ProcFs {
    fn list_pids(&self) -> Result<Vec<u32>> {
        let all_procs = procfs::process::all_processes_with_root(&self.root)
            .map_err(|e| NetstatError::Platform(e.to_string()))?;

        let mut pids = Vec::new();
        for proc_result in all_procs {
            let proc = match proc_result {
                Ok(p) => p,
                Err(_) => continue,
            };
            // Entries such as "+7" parse as a pid but are not the pid's
            // directory; only keep pids whose canonical directory exists.
            let pid = match u32::try_from(proc.pid) {
                Ok(0) | Err(_) => continue,
                Ok(pid) => pid,
            };
            if self.pid_dir(pid).is_dir() {
                pids.push(pid);
            }
        }
        pids.sort_unstable();
        pids.dedup();
        Ok(pids)
    }

    fn socket_inodes(&self, pid: u32) -> Result<Vec<Inode>> {
        let process = self.process(pid)?;
        let fds = process.fd().map_err(|e| NetstatError::ProcessUnavailable {
            pid,
            reason: e.to_string(),
        })?;

        let mut inodes = Vec::new();
        for fd_info in fds {
            // The descriptor may have been closed since the directory was read.
            let fd_info = match fd_info {
                Ok(fi) => fi,
                Err(e) => {
                    log::debug!("pid {}: skipping fd: {}", pid, e);
                    continue;
                }
            };
            if let FDTarget::Socket(inode) = fd_info.target {
                inodes.push(Inode::new(inode));
            }
        }
        Ok(inodes)
    }

    fn stat_line(&self, pid: u32) -> Result<String> {
        let unavailable = |e: std::io::Error| NetstatError::ProcessUnavailable {
            pid,
            reason: e.to_string(),
        };
        let file = fs::File::open(self.pid_dir(pid).join("stat")).map_err(unavailable)?;
        let mut line = Vec::new();
        BufReader::new(file)
            .read_until(b'\n', &mut line)
            .map_err(unavailable)?;
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;

    fn source(root: &Path) -> ProcFs {
        ProcFs::new(ProcConfig {
            root: root.to_path_buf(),
        })
    }

    #[test]
    fn test_list_pids_skips_non_numeric() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["20", "3", "net", "self", "100"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }

        assert_eq!(source(dir.path()).list_pids().unwrap(), vec![3, 20, 100]);
    }

    #[test]
    fn test_list_pids_ignores_signed_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["+7", "-3", "0"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        assert!(source(dir.path()).list_pids().unwrap().is_empty());

        fs::create_dir(dir.path().join("7")).unwrap();
        assert_eq!(source(dir.path()).list_pids().unwrap(), vec![7]);
    }

    #[test]
    fn test_list_pids_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = source(&dir.path().join("absent")).list_pids().unwrap_err();
        assert!(matches!(err, NetstatError::Platform(_)));
    }

    #[test]
    fn test_socket_inodes_only_sockets() {
        let dir = tempfile::tempdir().unwrap();
        let fd = dir.path().join("5").join("fd");
        fs::create_dir_all(&fd).unwrap();
        symlink("socket:[123]", fd.join("3")).unwrap();
        symlink("/dev/null", fd.join("0")).unwrap();
        symlink("pipe:[77]", fd.join("1")).unwrap();
        symlink("socket:[456]", fd.join("4")).unwrap();

        let mut inodes = source(dir.path()).socket_inodes(5).unwrap();
        inodes.sort_by_key(|i| i.get());
        assert_eq!(inodes, vec![Inode::new(123), Inode::new(456)]);
    }

    #[test]
    fn test_socket_inodes_missing_fd_dir_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("9")).unwrap();
        let err = source(dir.path()).socket_inodes(9).unwrap_err();
        assert!(matches!(err, NetstatError::ProcessUnavailable { pid: 9, .. }));
    }

    #[test]
    fn test_stat_line_first_line_only() {
        let dir = tempfile::tempdir().unwrap();
        let pid_dir = dir.path().join("7");
        fs::create_dir(&pid_dir).unwrap();
        fs::write(pid_dir.join("stat"), "7 (sshd) S 1 7 7\nsecond line\n").unwrap();

        assert_eq!(source(dir.path()).stat_line(7).unwrap(), "7 (sshd) S 1 7 7");
    }

    #[test]
    fn test_stat_line_non_utf8_name() {
        let dir = tempfile::tempdir().unwrap();
        let pid_dir = dir.path().join("7");
        fs::create_dir(&pid_dir).unwrap();
        fs::write(pid_dir.join("stat"), b"7 (caf\xe9) S 1 7 7\n").unwrap();

        let line = source(dir.path()).stat_line(7).unwrap();
        assert_eq!(line, "7 (caf\u{FFFD}) S 1 7 7");
    }
}
