// Shared fixtures for the integration tests: in-memory zfs processes, a fake
// dataset tree, and remote stores that lose or alter objects.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use snapship_core::config::Config;
use snapship_core::context::Context;
use snapship_core::crypto::FileDigest;
use snapship_core::parts::{part_name_of, FilePartDirectory, FilePartReader};
use snapship_core::remote::{DirectoryStore, RemoteCheck, RemoteError, RemoteStore};
use snapship_core::snapshot::Snapshot;
use snapship_core::zfs::{FilesystemLister, ProcessError, ProcessFactory, ReceiveStream, SendStream};

/// Route driver logs through the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with_test_writer()
            .try_init();
    });
}

pub const PASSWORD: &str = "correct horse battery staple";

/// Small sizes so every transfer spans several parts.
pub fn test_config() -> Config {
    Config {
        chunk_size: 256,
        file_part_size: 1000,
        password: PASSWORD.to_string(),
        poll_interval: Duration::from_millis(10),
        target_pool: "Backup".to_string(),
        root_dataset: "Pool".to_string(),
        ..Config::default()
    }
}

pub fn snap(full: &str) -> Snapshot {
    Snapshot::parse(full).unwrap()
}

pub fn snaps(dataset: &str, names: &[&str]) -> Vec<Snapshot> {
    names.iter().map(|n| Snapshot::new(dataset, n).unwrap()).collect()
}

/// Deterministic, mildly compressible bytes keyed by `label`.
pub fn payload(label: &str, len: usize) -> Vec<u8> {
    let seed = label.bytes().fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    (0..len)
        .map(|i| {
            let i = i as u32;
            (seed.wrapping_add(i / 7).wrapping_mul(2_654_435_761) >> 24) as u8
        })
        .collect()
}

pub const FULL_LEN: usize = 3_000;
pub const LINK_LEN: usize = 1_700;

pub fn full_payload(s: &Snapshot) -> Vec<u8> {
    payload(&format!("full:{}", s), FULL_LEN)
}

pub fn link_payload(base: &Snapshot, target: &Snapshot) -> Vec<u8> {
    payload(&format!("inc:{}->{}", base, target), LINK_LEN)
}

// ---------------------------------------------------------------------------
// Send / receive streams
// ---------------------------------------------------------------------------

pub struct MockSendStream {
    data: Cursor<Vec<u8>>,
    max_read: usize,
    exit_code: i32,
}

impl Read for MockSendStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Pipes hand out short reads.
        let n = buf.len().min(self.max_read);
        self.data.read(&mut buf[..n])
    }
}

impl SendStream for MockSendStream {
    fn close(self: Box<Self>) -> Result<(), ProcessError> {
        if self.exit_code != 0 {
            return Err(ProcessError::ExitStatus { program: "zfs".into(), code: Some(self.exit_code) });
        }
        Ok(())
    }

    fn kill(self: Box<Self>) -> Result<(), ProcessError> {
        Ok(())
    }
}

/// Everything one `zfs receive` saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceivedStream {
    pub pool: String,
    pub bytes: Vec<u8>,
    pub closed: bool,
    pub killed: bool,
}

pub struct MockReceiveStream {
    index: usize,
    log: Arc<Mutex<Vec<ReceivedStream>>>,
    exit_code: i32,
}

impl MockReceiveStream {
    fn update<F: FnOnce(&mut ReceivedStream)>(&self, f: F) {
        let mut log = self.log.lock().unwrap();
        f(&mut log[self.index]);
    }
}

impl Write for MockReceiveStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(|r| r.bytes.extend_from_slice(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ReceiveStream for MockReceiveStream {
    fn close(self: Box<Self>) -> Result<(), ProcessError> {
        self.update(|r| r.closed = true);
        if self.exit_code != 0 {
            return Err(ProcessError::ExitStatus { program: "zfs".into(), code: Some(self.exit_code) });
        }
        Ok(())
    }

    fn kill(self: Box<Self>) -> Result<(), ProcessError> {
        self.update(|r| r.killed = true);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockZfs: ProcessFactory + FilesystemLister
// ---------------------------------------------------------------------------

/// In-memory `zfs`. Datasets keep insertion order, which is also tree order.
#[derive(Default)]
pub struct MockZfs {
    datasets: Mutex<Vec<(String, Vec<Snapshot>)>>,
    received: Arc<Mutex<Vec<ReceivedStream>>>,
    calls: Mutex<Vec<String>>,
    send_exit_code: Mutex<i32>,
    receive_exit_code: Mutex<i32>,
}

impl MockZfs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_dataset(dataset: &str, names: &[&str]) -> Arc<Self> {
        let zfs = Self::new();
        zfs.add_dataset(dataset, names);
        zfs
    }

    pub fn add_dataset(&self, dataset: &str, names: &[&str]) {
        self.datasets.lock().unwrap().push((dataset.to_string(), snaps(dataset, names)));
    }

    pub fn fail_sends_with(&self, code: i32) {
        *self.send_exit_code.lock().unwrap() = code;
    }

    pub fn fail_receives_with(&self, code: i32) {
        *self.receive_exit_code.lock().unwrap() = code;
    }

    pub fn received(&self) -> Vec<ReceivedStream> {
        self.received.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn snapshots_of(&self, dataset: &str) -> Vec<Snapshot> {
        self.datasets
            .lock()
            .unwrap()
            .iter()
            .find(|(d, _)| d == dataset)
            .map(|(_, s)| s.clone())
            .unwrap_or_default()
    }

    /// What `zfs send -I base target` would emit: every link in between.
    pub fn multi_payload(&self, base: &Snapshot, target: &Snapshot) -> Vec<u8> {
        let chain = self.snapshots_of(base.dataset());
        let lo = chain.iter().position(|s| s == base).unwrap();
        let hi = chain.iter().position(|s| s == target).unwrap();
        chain[lo..=hi].windows(2).flat_map(|w| link_payload(&w[0], &w[1])).collect()
    }

    fn stream(&self, call: String, data: Vec<u8>) -> Result<Box<dyn SendStream>, ProcessError> {
        self.calls.lock().unwrap().push(call);
        Ok(Box::new(MockSendStream {
            data: Cursor::new(data),
            max_read: 100,
            exit_code: *self.send_exit_code.lock().unwrap(),
        }))
    }
}

impl ProcessFactory for MockZfs {
    fn send_full(&self, snapshot: &Snapshot) -> Result<Box<dyn SendStream>, ProcessError> {
        self.stream(format!("send -vpP {}", snapshot), full_payload(snapshot))
    }

    fn send_incremental(&self, base: &Snapshot, target: &Snapshot) -> Result<Box<dyn SendStream>, ProcessError> {
        self.stream(format!("send -vpPi {} {}", base, target), link_payload(base, target))
    }

    fn send_multi_incremental(&self, base: &Snapshot, target: &Snapshot) -> Result<Box<dyn SendStream>, ProcessError> {
        self.stream(format!("send -vpPI {} {}", base, target), self.multi_payload(base, target))
    }

    fn receive(&self, pool: &str) -> Result<Box<dyn ReceiveStream>, ProcessError> {
        self.calls.lock().unwrap().push(format!("receive -duv {}", pool));
        let mut log = self.received.lock().unwrap();
        log.push(ReceivedStream { pool: pool.to_string(), ..ReceivedStream::default() });
        Ok(Box::new(MockReceiveStream {
            index: log.len() - 1,
            log: Arc::clone(&self.received),
            exit_code: *self.receive_exit_code.lock().unwrap(),
        }))
    }
}

impl FilesystemLister for MockZfs {
    fn list_filesystems(&self, parent: &str) -> Result<Vec<String>, ProcessError> {
        let prefix = format!("{}/", parent);
        Ok(self
            .datasets
            .lock()
            .unwrap()
            .iter()
            .map(|(d, _)| d.clone())
            .filter(|d| d == parent || d.starts_with(&prefix))
            .collect())
    }

    fn list_snapshots(&self, dataset: &str) -> Result<Vec<Snapshot>, ProcessError> {
        Ok(self.snapshots_of(dataset))
    }
}

// ---------------------------------------------------------------------------
// Remote stores
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Accept the upload, store nothing.
    Drop,
    /// Store the object with one byte flipped.
    Corrupt,
}

pub struct FaultyStore {
    inner: DirectoryStore,
    fault: Fault,
}

impl FaultyStore {
    pub fn new(root: &Path, fault: Fault) -> Self {
        Self { inner: DirectoryStore::new(root).unwrap(), fault }
    }
}

impl RemoteStore for FaultyStore {
    fn upload(&self, path: &Path, key: &str) -> Result<(), RemoteError> {
        match self.fault {
            Fault::Drop => Ok(()),
            Fault::Corrupt => {
                self.inner.upload(path, key)?;
                let object = self.inner.root().join(key);
                let mut bytes = fs::read(&object)?;
                if let Some(b) = bytes.last_mut() {
                    *b ^= 0xFF;
                }
                fs::write(&object, bytes)?;
                Ok(())
            }
        }
    }

    fn verify(&self, key: &str, expected: &FileDigest) -> Result<RemoteCheck, RemoteError> {
        self.inner.verify(key, expected)
    }

    fn list_keys(&self) -> Result<Vec<String>, RemoteError> {
        self.inner.list_keys()
    }
}

// ---------------------------------------------------------------------------
// Queue helpers
// ---------------------------------------------------------------------------

pub fn queue_in(dir: &Path) -> Arc<FilePartDirectory> {
    init_tracing();
    Arc::new(FilePartDirectory::new(dir, Context::new("test")).unwrap())
}

/// Published part files, in file-name order.
pub fn published_parts(dir: &Path) -> Vec<PathBuf> {
    let mut parts: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| part_name_of(p).is_ok())
        .collect();
    parts.sort();
    parts
}

/// Visible entries of `dir`; dot-files such as the sent ledger are skipped.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();
    names
}

/// Decode every published part in order, grouped by stream label.
pub fn replay_by_stream(cfg: &Config, dir: &Path) -> HashMap<String, Vec<u8>> {
    let mut reader = FilePartReader::from_config(cfg, Context::new("replay")).unwrap();
    let mut out: HashMap<String, Vec<u8>> = HashMap::new();
    for path in published_parts(dir) {
        let label = part_name_of(&path).unwrap().stream.label().to_string();
        let sink = out.entry(label).or_default();
        reader.read(&path, sink).unwrap();
    }
    out
}

/// Decode every published part in order into one byte vector.
pub fn replay_all(cfg: &Config, dir: &Path) -> Vec<u8> {
    let mut reader = FilePartReader::from_config(cfg, Context::new("replay")).unwrap();
    let mut out = Vec::new();
    for path in published_parts(dir) {
        reader.read(&path, &mut out).unwrap();
    }
    out
}
