//! Read-only filesystem over a single SRFP channel.
//!
//! The wire allows one outstanding request, so every call is funnelled
//! through one worker thread that owns the [`MessageChannel`]:
//!
//! ```text
//! ┌─────────┐ ┌─────────┐ ┌─────────┐
//! │ caller  │ │ caller  │ │ caller  │   any number of threads
//! └────┬────┘ └────┬────┘ └────┬────┘
//!      └───────────┼───────────┘
//!            FIFO request queue          (request, reply slot)
//!                  │
//!           ┌──────┴──────┐
//!           │   worker    │  send_msg → recv_msg, one at a time
//!           └──────┬──────┘
//!                  │
//!              transport
//! ```
//!
//! Throughput is bounded by that single worker; the target links are slow
//! serial lines where this never matters.

use crate::channel::MessageChannel;
use crate::config::{BridgeConfig, TransportOptions};
use crate::error::{Error, Result};
use crate::file::RemoteFile;
use crate::transport::{self, Transport};
use crate::types::{Metadata, OpenMode};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use srfp_proto::{filename_to_segments, ErrorCode, Message, MessageType, ProtocolError, Version};
use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

type Reply = Result<Message>;

/// A queued request with the slot its reply goes to.
struct PendingRequest {
    message: Message,
    reply_tx: Sender<Reply>,
}

/// Single-use reply slot returned by [`RemoteFs::submit`].
#[must_use = "the reply is lost unless waited on"]
pub struct PendingReply {
    reply_rx: Receiver<Reply>,
}

impl PendingReply {
    /// Block until the worker has exchanged this request.
    pub fn wait(self) -> Result<Message> {
        self.reply_rx.recv().map_err(|_| Error::WorkerGone)?
    }
}

/// A mounted remote filesystem.
///
/// Created by [`RemoteFs::mount`]; the worker stops on [`RemoteFs::unmount`]
/// or drop. Methods take `&self` and may be called from many threads.
pub struct RemoteFs {
    request_tx: Option<Sender<PendingRequest>>,
    worker: Option<JoinHandle<()>>,
    config: BridgeConfig,
}

impl RemoteFs {
    /// Start the bridge worker over `transport`.
    pub fn mount(transport: Box<dyn Transport>, config: BridgeConfig) -> Result<Self> {
        let mut channel = MessageChannel::new(transport).with_strict_ids(config.strict_ids);
        channel.set_recv_timeout(config.recv_timeout)?;
        let description = channel.describe();

        let (request_tx, request_rx) = unbounded::<PendingRequest>();

        let worker = std::thread::Builder::new()
            .name("srfp-worker".to_string())
            .spawn(move || worker_loop(channel, request_rx))
            .map_err(Error::Spawn)?;

        info!(target: "srfp::bridge", transport = %description, "bridge mounted");
        Ok(Self {
            request_tx: Some(request_tx),
            worker: Some(worker),
            config,
        })
    }

    /// Open the transport named by `address` and mount over it.
    pub fn connect(address: &str, options: &TransportOptions, config: BridgeConfig) -> Result<Self> {
        let transport = transport::connect(address, options)?;
        Self::mount(transport, config)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Stop the worker after it has drained requests already queued.
    pub fn unmount(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Closing the queue ends the worker loop once it is empty.
        self.request_tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(target: "srfp::bridge", "worker thread panicked");
            }
            info!(target: "srfp::bridge", "bridge unmounted");
        }
    }

    /// Enqueue a raw request without waiting for its reply.
    ///
    /// Requests are sent in the order they are submitted.
    pub fn submit(&self, message: Message) -> Result<PendingReply> {
        let request_tx = self.request_tx.as_ref().ok_or(Error::WorkerGone)?;
        let (reply_tx, reply_rx) = bounded(1);
        request_tx
            .send(PendingRequest { message, reply_tx })
            .map_err(|_| Error::WorkerGone)?;
        Ok(PendingReply { reply_rx })
    }

    /// Enqueue a raw request and wait for its reply.
    pub fn request(&self, message: Message) -> Result<Message> {
        self.submit(message)?.wait()
    }

    /// Names in directory `path`, in the order the device lists them.
    pub fn list_directory<P: AsRef<Path>>(&self, path: P) -> Result<Vec<OsString>> {
        let path = path.as_ref();
        let reply = self.request(Message::DirectoryListRequest {
            path: filename_to_segments(path),
        })?;
        match check_reply(reply, path)? {
            Message::DirectoryListResponse { entries } => {
                Ok(entries.into_iter().map(OsString::from_vec).collect())
            }
            other => Err(unexpected(MessageType::DirectoryListResponse, &other)),
        }
    }

    /// Metadata for `path`.
    pub fn stat<P: AsRef<Path>>(&self, path: P) -> Result<Metadata> {
        let path = path.as_ref();
        let reply = self.request(Message::NodeInfoRequest {
            path: filename_to_segments(path),
        })?;
        match check_reply(reply, path)? {
            Message::NodeInfoResponse(info) => Ok(Metadata::from(info)),
            other => Err(unexpected(MessageType::NodeInfoResponse, &other)),
        }
    }

    /// True if `path` exists and is a file.
    pub fn is_file<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        match self.stat(path) {
            Ok(meta) => Ok(meta.is_file),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// True if `path` exists and is a directory.
    pub fn is_directory<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        match self.stat(path) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Issue one `FileContentsRequest`; `length` is capped at the chunk size.
    ///
    /// An empty result means end of file.
    pub fn read_chunk<P: AsRef<Path>>(&self, path: P, offset: u32, length: u32) -> Result<Vec<u8>> {
        let path = path.as_ref();
        self.read_segments(path, filename_to_segments(path), offset, length)
    }

    /// Read up to `length` bytes at `offset`, one chunk per request.
    ///
    /// Returns fewer bytes than asked for only at end of file.
    pub fn read_range<P: AsRef<Path>>(&self, path: P, offset: u64, length: usize) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let segments = filename_to_segments(path);
        let chunk = self.config.max_chunk_size as usize;

        let mut data = Vec::with_capacity(length.min(chunk * 16));
        let mut offset = offset;
        while data.len() < length {
            // Wire offsets are 32-bit; nothing lives past that.
            let Ok(wire_offset) = u32::try_from(offset) else {
                break;
            };
            let want = (length - data.len()).min(chunk);
            let mut part = self.read_segments(path, segments.clone(), wire_offset, want as u32)?;
            if part.is_empty() {
                break;
            }
            part.truncate(want);
            offset += part.len() as u64;
            data.extend_from_slice(&part);
        }
        debug!(target: "srfp::bridge", path = %path.display(), requested = length, read = data.len(), "read_range");
        Ok(data)
    }

    /// Read a whole file.
    pub fn read_to_end<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let meta = self.stat(path)?;
        if !meta.is_file {
            return Err(Error::IsADirectory(path.to_path_buf()));
        }
        self.read_range(path, 0, meta.size as usize)
    }

    /// Open `path` with an `fopen`-style mode (`"r"`, `"rb"`, ...).
    pub fn open<P: AsRef<Path>>(&self, path: P, mode: &str) -> Result<RemoteFile<'_>> {
        self.open_with(path, mode.parse()?)
    }

    /// Open `path` for reading. Any write access fails.
    pub fn open_with<P: AsRef<Path>>(&self, path: P, mode: OpenMode) -> Result<RemoteFile<'_>> {
        if !mode.is_read_only() {
            return Err(Error::UnsupportedOperation("open for writing"));
        }
        let path = path.as_ref();
        let meta = self.stat(path)?;
        if !meta.is_file {
            return Err(Error::IsADirectory(path.to_path_buf()));
        }
        Ok(RemoteFile::new(self, path.to_path_buf(), meta.size))
    }

    /// Firmware version reported by the device.
    pub fn version(&self) -> Result<Version> {
        match check_reply(self.request(Message::VersionRequest)?, Path::new("/"))? {
            Message::VersionResponse(version) => Ok(version),
            other => Err(unexpected(MessageType::VersionResponse, &other)),
        }
    }

    pub fn write<P: AsRef<Path>>(&self, _path: P, _data: &[u8]) -> Result<usize> {
        Err(Error::UnsupportedOperation("write"))
    }

    pub fn create<P: AsRef<Path>>(&self, _path: P) -> Result<()> {
        Err(Error::UnsupportedOperation("create"))
    }

    pub fn set_len<P: AsRef<Path>>(&self, _path: P, _size: u64) -> Result<()> {
        Err(Error::UnsupportedOperation("truncate"))
    }

    pub fn remove_file<P: AsRef<Path>>(&self, _path: P) -> Result<()> {
        Err(Error::UnsupportedOperation("remove"))
    }

    pub fn remove_dir<P: AsRef<Path>>(&self, _path: P) -> Result<()> {
        Err(Error::UnsupportedOperation("remove directory"))
    }

    pub fn rename<P: AsRef<Path>, Q: AsRef<Path>>(&self, _from: P, _to: Q) -> Result<()> {
        Err(Error::UnsupportedOperation("rename"))
    }

    pub fn create_dir<P: AsRef<Path>>(&self, _path: P) -> Result<()> {
        Err(Error::UnsupportedOperation("mkdir"))
    }

    fn read_segments(
        &self,
        path: &Path,
        segments: Vec<Vec<u8>>,
        offset: u32,
        length: u32,
    ) -> Result<Vec<u8>> {
        let reply = self.request(Message::FileContentsRequest {
            offset,
            length: length.min(self.config.max_chunk_size),
            path: segments,
        })?;
        match check_reply(reply, path)? {
            Message::FileContentsResponse { data } => Ok(data),
            other => Err(unexpected(MessageType::FileContentsResponse, &other)),
        }
    }
}

impl Drop for RemoteFs {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Translate device `Error` replies into the filesystem taxonomy.
fn check_reply(reply: Message, path: &Path) -> Result<Message> {
    match reply {
        Message::Error {
            code: ErrorCode::DoesNotExist,
        } => Err(Error::NotFound(PathBuf::from(path))),
        Message::Error { code } => Err(Error::Remote { code }),
        other => Ok(other),
    }
}

fn unexpected(expected: MessageType, actual: &Message) -> Error {
    Error::Protocol(ProtocolError::UnexpectedResponse {
        expected,
        actual: actual.message_type(),
    })
}

/// Worker thread: drains the queue in FIFO order, one exchange at a time.
fn worker_loop(mut channel: MessageChannel, request_rx: Receiver<PendingRequest>) {
    let mut count = 0u64;
    let mut failures = 0u64;

    while let Ok(req) = request_rx.recv() {
        count += 1;
        let kind = req.message.message_type();
        let result = channel.exchange(req.message);

        if let Err(ref e) = result {
            failures += 1;
            warn!(target: "srfp::bridge", count, ?kind, error = %e, "worker: exchange failed");
        }

        // A caller that stopped waiting is not an error for the worker.
        if req.reply_tx.send(result).is_err() {
            debug!(target: "srfp::bridge", count, ?kind, "worker: caller went away");
        }
    }

    channel.close();
    info!(target: "srfp::bridge", count, failures, "worker: exiting");
}
