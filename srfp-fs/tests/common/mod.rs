//! Shared fixtures for bridge integration tests.
//!
//! - `FakeDevice`: an SRFP device serving an in-memory tree over one end of
//!   a `UnixStream::pair`, logging every request frame it receives.
//! - `RecordingTransport`: an in-process transport that answers from a
//!   closure and records what was sent, for tests that must observe the
//!   exact request stream without a socket.

// Each test file uses a different subset of these helpers.
#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use srfp_fs::transport::UnixTransport;
use srfp_fs::{BridgeConfig, RemoteFs, Transport, TransportError};
use srfp_proto::{segments_to_filename, ErrorCode, Frame, Message, NodeInfo, Version};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const TARGET: &str = "srfp::fixture";

static TRACING_INIT: Once = Once::new();

/// Initialize tracing once for the test process.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    });
}

/// Version every fake device reports.
pub const DEVICE_VERSION: Version = Version {
    major: 1,
    minor: 4,
    bugfix: 2,
};

/// Timestamps reported for every file node.
pub const FILE_TIMES: (u32, u32, u32) = (1_600_000_000, 1_600_000_100, 1_600_000_200);

#[derive(Debug, Clone)]
pub enum Node {
    File(Vec<u8>),
    Dir,
    /// Any request naming this path is answered with this error code.
    Fault(ErrorCode),
}

/// In-memory tree keyed by absolute path. `/` always exists.
#[derive(Debug, Clone, Default)]
pub struct FakeTree {
    nodes: BTreeMap<PathBuf, Node>,
}

impl FakeTree {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::from("/"), Node::Dir);
        Self { nodes }
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.nodes.insert(PathBuf::from(path), Node::Dir);
        self
    }

    pub fn file(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.nodes.insert(PathBuf::from(path), Node::File(data.into()));
        self
    }

    pub fn fault(mut self, path: &str, code: ErrorCode) -> Self {
        self.nodes.insert(PathBuf::from(path), Node::Fault(code));
        self
    }

    /// The tree most tests use.
    pub fn sample() -> Self {
        Self::new()
            .dir("/docs")
            .file("/docs/readme.txt", b"hello, device\n".to_vec())
            .file("/docs/empty.txt", Vec::new())
            .dir("/logs")
            .file("/logs/big.bin", pattern(10_000))
    }

    fn children(&self, dir: &Path) -> Vec<Vec<u8>> {
        self.nodes
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned().into_bytes())
            .collect()
    }

    /// Answer one request the way the device firmware does.
    pub fn answer(&self, request: &Message) -> Message {
        let not_found = Message::Error {
            code: ErrorCode::DoesNotExist,
        };
        match request {
            Message::VersionRequest => Message::VersionResponse(DEVICE_VERSION),
            Message::DirectoryListRequest { path } => {
                let path = segments_to_filename(path);
                match self.nodes.get(&path) {
                    Some(Node::Dir) => Message::DirectoryListResponse {
                        entries: self.children(&path),
                    },
                    Some(Node::File(_)) => Message::Error {
                        code: ErrorCode::Other,
                    },
                    Some(Node::Fault(code)) => Message::Error { code: *code },
                    None => not_found,
                }
            }
            Message::NodeInfoRequest { path } => match self.nodes.get(&segments_to_filename(path)) {
                Some(Node::Dir) => Message::NodeInfoResponse(NodeInfo::default()),
                Some(Node::File(data)) => Message::NodeInfoResponse(NodeInfo {
                    is_file: true,
                    size: data.len() as u32,
                    created: FILE_TIMES.0,
                    accessed: FILE_TIMES.1,
                    modified: FILE_TIMES.2,
                }),
                Some(Node::Fault(code)) => Message::Error { code: *code },
                None => not_found,
            },
            Message::FileContentsRequest {
                offset,
                length,
                path,
            } => match self.nodes.get(&segments_to_filename(path)) {
                Some(Node::File(data)) => {
                    let start = (*offset as usize).min(data.len());
                    let end = start.saturating_add(*length as usize).min(data.len());
                    Message::FileContentsResponse {
                        data: data[start..end].to_vec(),
                    }
                }
                Some(Node::Dir) => Message::Error {
                    code: ErrorCode::Other,
                },
                Some(Node::Fault(code)) => Message::Error { code: *code },
                None => not_found,
            },
            _ => Message::Error {
                code: ErrorCode::Other,
            },
        }
    }
}

/// Deterministic file content.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// How the fake device misbehaves, if at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceFaults {
    /// Flip one bit of every reply's CRC.
    pub corrupt_crc: bool,
    /// Added to the request id before echoing it back.
    pub id_skew: u16,
    /// Hold the first reply back this long.
    pub first_reply_delay: Option<Duration>,
}

/// A device thread on the far end of a socket pair.
pub struct FakeDevice {
    stream: UnixStream,
    handle: Option<JoinHandle<()>>,
    log: Arc<Mutex<Vec<Frame>>>,
}

impl FakeDevice {
    /// Start a device serving `tree`; returns it with the host-side transport.
    pub fn start(tree: FakeTree) -> (Self, UnixTransport) {
        Self::start_with(tree, DeviceFaults::default())
    }

    pub fn start_with(tree: FakeTree, faults: DeviceFaults) -> (Self, UnixTransport) {
        init_tracing();
        let (host, device) = UnixStream::pair().expect("socket pair");
        let stream = device.try_clone().expect("clone device stream");
        let log = Arc::new(Mutex::new(Vec::new()));
        let thread_log = Arc::clone(&log);

        let handle = thread::Builder::new()
            .name("fake-device".to_string())
            .spawn(move || serve(device, tree, faults, thread_log))
            .expect("spawn fake device");

        let fake = Self {
            stream,
            handle: Some(handle),
            log,
        };
        (fake, UnixTransport::from_stream(host))
    }

    /// Start a device and mount a bridge over it.
    pub fn mount(tree: FakeTree, config: BridgeConfig) -> (Self, RemoteFs) {
        let (device, transport) = Self::start(tree);
        let fs = RemoteFs::mount(Box::new(transport), config).expect("mount bridge");
        (device, fs)
    }

    /// Every request frame received so far, in arrival order.
    pub fn requests(&self) -> Vec<Frame> {
        self.log.lock().unwrap().clone()
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(mut stream: UnixStream, tree: FakeTree, faults: DeviceFaults, log: Arc<Mutex<Vec<Frame>>>) {
    let mut delay = faults.first_reply_delay;
    loop {
        let request = match Frame::read_from(&mut stream) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(target: TARGET, error = %e, "device: stream closed");
                return;
            }
        };
        let reply = Frame::new(request.id.wrapping_add(faults.id_skew), tree.answer(&request.message));
        log.lock().unwrap().push(request);

        if let Some(delay) = delay.take() {
            thread::sleep(delay);
        }
        let mut bytes = reply.encode().expect("encode reply");
        if faults.corrupt_crc {
            let last = bytes.len() - 1;
            bytes[last] ^= 0x01;
        }
        if stream.write_all(&bytes).is_err() {
            return;
        }
    }
}

type Script = Box<dyn FnMut(&Message) -> Message + Send>;

/// Transport that answers each request from a closure and records it.
pub struct RecordingTransport {
    script: Script,
    inbound: VecDeque<u8>,
    sent: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingTransport {
    pub fn new<F>(script: F) -> (Self, Arc<Mutex<Vec<Frame>>>)
    where
        F: FnMut(&Message) -> Message + Send + 'static,
    {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let transport = Self {
            script: Box::new(script),
            inbound: VecDeque::new(),
            sent: Arc::clone(&sent),
        };
        (transport, sent)
    }

    /// Answer from a [`FakeTree`].
    pub fn serving(tree: FakeTree) -> (Self, Arc<Mutex<Vec<Frame>>>) {
        Self::new(move |request| tree.answer(request))
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        let request = Frame::decode(buf).expect("host sent a malformed frame");
        let reply = Frame::new(request.id, (self.script)(&request.message));
        self.inbound.extend(reply.encode().expect("encode reply"));
        self.sent.lock().unwrap().push(request);
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let n = buf.len().min(self.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn describe(&self) -> String {
        "recording:".to_string()
    }
}
