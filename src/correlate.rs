//! Attribution of socket table rows to the processes holding them open.
//!
//! A socket descriptor shows up under `/proc/[pid]/fd` as a symlink whose
//! target reads `socket:[<inode>]`. Matching that inode against the table
//! rows tells us which process owns which row. Link parsing is left to the
//! `ProcSource`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::model::{Inode, ProcessIdentity, SocketRecord};
use crate::platform::ProcSource;

/// What scanning one process produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The descriptor directory could not be read.
    Unavailable,
    /// Readable, but none of its descriptors matched a table row.
    NoMatch,
    /// Attached to `sockets` rows. `named` is false when the stat file
    /// could not be read and the identity carries an empty name.
    Matched { sockets: usize, named: bool },
}

/// Tally of one correlation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationReport {
    pub processes_scanned: usize,
    pub processes_unavailable: usize,
    pub processes_matched: usize,
    pub processes_unnamed: usize,
    pub sockets_attributed: usize,
    pub cancelled: bool,
}

impl CorrelationReport {
    fn record(&mut self, outcome: ProcessOutcome) {
        self.processes_scanned += 1;
        match outcome {
            ProcessOutcome::Unavailable => self.processes_unavailable += 1,
            ProcessOutcome::NoMatch => {}
            ProcessOutcome::Matched { sockets, named } => {
                self.processes_matched += 1;
                self.sockets_attributed += sockets;
                if !named {
                    self.processes_unnamed += 1;
                }
            }
        }
    }
}

/// Command name from a stat line: everything between the first `(` and
/// the last `)`, so names containing spaces or parentheses survive intact.
pub fn process_name(stat_line: &str) -> String {
    let (Some(open), Some(close)) = (stat_line.find('('), stat_line.rfind(')')) else {
        return String::new();
    };
    if close <= open {
        return String::new();
    }
    stat_line[open + 1..close].to_string()
}

/// Per-pass memo of resolved process identities.
#[derive(Debug, Default)]
pub struct IdentityCache {
    identities: HashMap<u32, Arc<ProcessIdentity>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity for `pid`, reading its stat file only on the first call.
    pub fn resolve(&mut self, pid: u32, source: &dyn ProcSource) -> Arc<ProcessIdentity> {
        self.identities
            .entry(pid)
            .or_insert_with(|| {
                let name = match source.stat_line(pid) {
                    Ok(line) => process_name(&line),
                    Err(e) => {
                        log::debug!("pid {}: no name: {}", pid, e);
                        String::new()
                    }
                };
                Arc::new(ProcessIdentity::new(pid, name))
            })
            .clone()
    }

    pub fn get(&self, pid: u32) -> Option<&Arc<ProcessIdentity>> {
        self.identities.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

/// Attaches process identities to a fixed set of socket records.
pub struct Correlator<'a> {
    records: &'a mut [SocketRecord],
    index: HashMap<Inode, Vec<usize>>,
    cache: IdentityCache,
}

impl<'a> Correlator<'a> {
    pub fn new(records: &'a mut [SocketRecord]) -> Self {
        let mut index: HashMap<Inode, Vec<usize>> = HashMap::new();
        for (i, record) in records.iter().enumerate() {
            index.entry(record.inode).or_default().push(i);
        }
        Self {
            records,
            index,
            cache: IdentityCache::new(),
        }
    }

    /// Match every socket descriptor of `pid` against the table. Rows that
    /// already carry a process are left alone.
    pub fn scan_process(&mut self, pid: u32, source: &dyn ProcSource) -> ProcessOutcome {
        let inodes = match source.socket_inodes(pid) {
            Ok(i) => i,
            Err(e) => {
                log::debug!("skipping pid {}: {}", pid, e);
                return ProcessOutcome::Unavailable;
            }
        };

        let mut identity: Option<Arc<ProcessIdentity>> = None;
        let mut sockets = 0;

        for inode in &inodes {
            let Some(rows) = self.index.get(inode) else {
                continue;
            };
            for &row in rows {
                let record = &mut self.records[row];
                if record.process.is_some() {
                    continue;
                }
                let id = identity
                    .get_or_insert_with(|| self.cache.resolve(pid, source))
                    .clone();
                record.process = Some(id);
                sockets += 1;
            }
        }

        match identity {
            Some(id) => ProcessOutcome::Matched {
                sockets,
                named: id.has_name(),
            },
            None => ProcessOutcome::NoMatch,
        }
    }

    pub fn identities(&self) -> &IdentityCache {
        &self.cache
    }
}

/// Attribute `records` to the processes visible through `source`.
///
/// Never fails: processes that cannot be inspected are skipped and their
/// sockets stay unattributed.
pub fn correlate(records: &mut [SocketRecord], source: &dyn ProcSource) -> CorrelationReport {
    correlate_until(records, source, &AtomicBool::new(false))
}

/// Like [`correlate`], but stops before the next process once `cancel` is
/// set. Rows attributed so far are kept.
pub fn correlate_until(
    records: &mut [SocketRecord],
    source: &dyn ProcSource,
    cancel: &AtomicBool,
) -> CorrelationReport {
    let mut report = CorrelationReport::default();

    let pids = match source.list_pids() {
        Ok(pids) => pids,
        Err(e) => {
            log::warn!("cannot enumerate processes: {}", e);
            return report;
        }
    };

    let mut correlator = Correlator::new(records);
    for pid in pids {
        if cancel.load(Ordering::Relaxed) {
            report.cancelled = true;
            break;
        }
        let outcome = correlator.scan_process(pid, source);
        report.record(outcome);
    }

    log::debug!(
        "correlation: {} processes scanned, {} unavailable, {} sockets attributed",
        report.processes_scanned,
        report.processes_unavailable,
        report.sockets_attributed,
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NetstatError, Result};
    use crate::model::{ConnectionState, SocketAddress};
    use std::cell::{Cell, RefCell};
    use std::net::{IpAddr, Ipv4Addr};

    type Entry = (u32, Option<Vec<u64>>, Option<&'static str>);

    /// In-memory process namespace: pid -> (socket inodes, stat line).
    #[derive(Default)]
    struct FakeProc {
        procs: Vec<Entry>,
        stat_reads: Cell<usize>,
        fd_reads: RefCell<Vec<u32>>,
    }

    impl FakeProc {
        fn with(mut self, pid: u32, sockets: Option<Vec<u64>>, stat: Option<&'static str>) -> Self {
            self.procs.push((pid, sockets, stat));
            self
        }

        fn find(&self, pid: u32) -> &Entry {
            self.procs.iter().find(|p| p.0 == pid).unwrap()
        }
    }

    fn gone(pid: u32) -> NetstatError {
        NetstatError::ProcessUnavailable {
            pid,
            reason: "No such file or directory".to_string(),
        }
    }

    impl ProcSource for FakeProc {
        fn list_pids(&self) -> Result<Vec<u32>> {
            Ok(self.procs.iter().map(|p| p.0).collect())
        }

        fn socket_inodes(&self, pid: u32) -> Result<Vec<Inode>> {
            self.fd_reads.borrow_mut().push(pid);
            match &self.find(pid).1 {
                Some(inodes) => Ok(inodes.iter().copied().map(Inode::new).collect()),
                None => Err(gone(pid)),
            }
        }

        fn stat_line(&self, pid: u32) -> Result<String> {
            self.stat_reads.set(self.stat_reads.get() + 1);
            self.find(pid).2.map(str::to_string).ok_or_else(|| gone(pid))
        }
    }

    fn record(inode: u64) -> SocketRecord {
        let addr = SocketAddress::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 80);
        SocketRecord {
            inode: Inode::new(inode),
            local: addr,
            remote: addr,
            state: ConnectionState::Listen,
            uid: 0,
            process: None,
        }
    }

    #[test]
    fn test_process_name() {
        assert_eq!(process_name("123 (nginx) S 1 123"), "nginx");
        assert_eq!(process_name("123 (my)app) S 1 123"), "my)app");
        assert_eq!(process_name("123 (Web Content) S 1"), "Web Content");
        assert_eq!(process_name("123 ((sd-pam)) S 1"), "(sd-pam)");
        assert_eq!(process_name("123 () S"), "");
        assert_eq!(process_name("no parens here"), "");
        assert_eq!(process_name("123 )odd( S"), "");
    }

    #[test]
    fn test_attributes_matching_inode() {
        let source = FakeProc::default().with(10, Some(vec![123]), Some("10 (sshd) S 1"));
        let mut records = vec![record(123), record(456)];

        let report = correlate(&mut records, &source);

        let p = records[0].process.as_ref().unwrap();
        assert_eq!(p.pid, 10);
        assert_eq!(p.name, "sshd");
        assert!(records[1].process.is_none());
        assert_eq!(report.processes_matched, 1);
        assert_eq!(report.sockets_attributed, 1);
    }

    #[test]
    fn test_identity_resolved_once_and_shared() {
        let source = FakeProc::default().with(42, Some(vec![1, 2, 3]), Some("42 (postgres) S 1"));
        let mut records = vec![record(1), record(2), record(3)];

        correlate(&mut records, &source);

        assert_eq!(source.stat_reads.get(), 1);
        let first = records[0].process.as_ref().unwrap();
        for r in &records[1..] {
            assert!(Arc::ptr_eq(first, r.process.as_ref().unwrap()));
        }
    }

    #[test]
    fn test_no_stat_read_without_match() {
        let source = FakeProc::default().with(5, Some(vec![999]), Some("5 (idle) S"));
        let mut records = vec![record(1)];

        let report = correlate(&mut records, &source);

        assert_eq!(source.stat_reads.get(), 0);
        assert_eq!(report.processes_matched, 0);
        assert_eq!(report.processes_scanned, 1);
    }

    #[test]
    fn test_unavailable_process_skipped() {
        let source = FakeProc::default()
            .with(1, None, None)
            .with(2, Some(vec![7]), Some("2 (dnsmasq) S"));
        let mut records = vec![record(7)];

        let report = correlate(&mut records, &source);

        assert_eq!(records[0].pid(), Some(2));
        assert_eq!(report.processes_unavailable, 1);
        assert_eq!(report.processes_scanned, 2);
    }

    #[test]
    fn test_unreadable_stat_keeps_pid() {
        let source = FakeProc::default().with(8, Some(vec![7]), None);
        let mut records = vec![record(7)];

        let mut correlator = Correlator::new(&mut records);
        let outcome = correlator.scan_process(8, &source);
        assert_eq!(outcome, ProcessOutcome::Matched { sockets: 1, named: false });
        assert_eq!(correlator.identities().len(), 1);

        let p = records[0].process.as_ref().unwrap();
        assert_eq!(p.pid, 8);
        assert!(p.name.is_empty());
    }

    #[test]
    fn test_scan_outcomes_distinguished() {
        let source = FakeProc::default()
            .with(1, None, None)
            .with(2, Some(vec![]), Some("2 (bash) S"))
            .with(3, Some(vec![7]), Some("3 (nc) S"));
        let mut records = vec![record(7)];
        let mut correlator = Correlator::new(&mut records);

        assert_eq!(correlator.scan_process(1, &source), ProcessOutcome::Unavailable);
        assert_eq!(correlator.scan_process(2, &source), ProcessOutcome::NoMatch);
        assert_eq!(
            correlator.scan_process(3, &source),
            ProcessOutcome::Matched { sockets: 1, named: true }
        );
    }

    #[test]
    fn test_duplicate_rows_share_identity() {
        let source = FakeProc::default().with(3, Some(vec![55]), Some("3 (avahi) S"));
        let mut records = vec![record(55), record(66), record(55)];

        let report = correlate(&mut records, &source);

        assert_eq!(report.sockets_attributed, 2);
        assert!(Arc::ptr_eq(
            records[0].process.as_ref().unwrap(),
            records[2].process.as_ref().unwrap()
        ));
        assert!(records[1].process.is_none());
    }

    #[test]
    fn test_first_owner_wins() {
        // A socket inherited across fork is open in both processes.
        let source = FakeProc::default()
            .with(100, Some(vec![9]), Some("100 (parent) S"))
            .with(101, Some(vec![9]), Some("101 (child) S"));
        let mut records = vec![record(9)];

        let report = correlate(&mut records, &source);

        assert_eq!(records[0].process.as_ref().unwrap().name, "parent");
        assert_eq!(report.processes_matched, 1);
        assert_eq!(source.stat_reads.get(), 1);
    }

    #[test]
    fn test_cancel_stops_enumeration() {
        let source = FakeProc::default().with(1, Some(vec![1]), Some("1 (init) S"));
        let mut records = vec![record(1)];
        let cancel = AtomicBool::new(true);

        let report = correlate_until(&mut records, &source, &cancel);

        assert!(report.cancelled);
        assert_eq!(report.processes_scanned, 0);
        assert!(source.fd_reads.borrow().is_empty());
        assert!(records[0].process.is_none());
    }

    #[test]
    fn test_order_and_count_preserved() {
        let source = FakeProc::default().with(4, Some(vec![20]), Some("4 (x) S"));
        let mut records = vec![record(30), record(20), record(10)];

        correlate(&mut records, &source);

        let inodes: Vec<u64> = records.iter().map(|r| r.inode.get()).collect();
        assert_eq!(inodes, vec![30, 20, 10]);
        assert_eq!(records[1].pid(), Some(4));
    }
}
