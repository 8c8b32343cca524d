//! fuser::Filesystem implementation over the SRFP bridge.

use super::inodes::{InodeTable, ROOT_INO};
use crate::bridge::RemoteFs;
use crate::error::Error;
use crate::types::{Metadata, OpenMode};
use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

const BLOCK_SIZE: u32 = 512;
const MAX_NAME_LEN: u32 = 255;

type DirEntry = (u64, FileType, OsString);

/// FUSE client serving a read-only view of a remote device.
pub struct FuseClient {
    fs: Arc<RemoteFs>,
    inodes: InodeTable,
    /// Listings captured at `opendir`, keyed by directory handle.
    dir_handles: HashMap<u64, Vec<DirEntry>>,
    next_fh: u64,
    uid: u32,
    gid: u32,
}

impl FuseClient {
    pub fn new(fs: Arc<RemoteFs>) -> Self {
        // SAFETY: getuid/getgid cannot fail and touch no memory.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        Self {
            fs,
            inodes: InodeTable::new(),
            dir_handles: HashMap::new(),
            next_fh: 1,
            uid,
            gid,
        }
    }

    fn path(&self, ino: u64) -> Result<PathBuf, Error> {
        self.inodes
            .path(ino)
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::NotFound(PathBuf::from(format!("<inode {}>", ino))))
    }

    fn child(&self, parent: u64, name: &OsStr) -> Result<PathBuf, Error> {
        self.inodes
            .child_path(parent, name)
            .ok_or_else(|| Error::NotFound(PathBuf::from(name)))
    }

    fn to_attr(&self, ino: u64, meta: &Metadata) -> FileAttr {
        let time = |t: Option<SystemTime>| t.unwrap_or(UNIX_EPOCH);
        let (kind, perm, nlink) = if meta.is_file {
            (FileType::RegularFile, 0o444, 1)
        } else {
            (FileType::Directory, 0o555, 2)
        };
        FileAttr {
            ino,
            size: meta.size,
            blocks: meta.size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: time(meta.accessed_time()),
            mtime: time(meta.modified_time()),
            ctime: time(meta.modified_time()),
            crtime: time(meta.created_time()),
            kind,
            perm,
            nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    fn stat_ino(&self, ino: u64) -> Result<FileAttr, Error> {
        let meta = self.fs.stat(self.path(ino)?)?;
        Ok(self.to_attr(ino, &meta))
    }

    fn log_error(op: &'static str, err: &Error) -> i32 {
        if err.is_not_found() {
            debug!(target: "srfp::fuse", op, error = %err, "not found");
        } else {
            tracing::warn!(target: "srfp::fuse", op, error = %err, "operation failed");
        }
        err.errno()
    }

    /// Errno for a write-family call, which the bridge always refuses.
    fn refused<T>(op: &'static str, result: Result<T, Error>) -> i32 {
        result.err().map_or(libc::EROFS, |e| Self::log_error(op, &e))
    }

    /// List a directory once and keep the entries under a new handle.
    ///
    /// Every `readdir` on that handle is served from this snapshot until
    /// `releasedir`.
    fn open_dir(&mut self, ino: u64) -> Result<u64, Error> {
        let dir = self.path(ino)?;
        if ino != ROOT_INO && !self.fs.stat(&dir)?.is_dir() {
            return Err(Error::NotADirectory(dir));
        }
        let names = self.fs.list_directory(&dir)?;

        let parent_ino = dir
            .parent()
            .map(|p| self.inodes.get_or_insert(p.to_path_buf()))
            .unwrap_or(ROOT_INO);

        let mut entries: Vec<DirEntry> = vec![
            (ino, FileType::Directory, OsString::from(".")),
            (parent_ino, FileType::Directory, OsString::from("..")),
        ];
        for name in names {
            let path = dir.join(&name);
            // A failed stat still lists the name.
            let kind = match self.fs.stat(&path) {
                Ok(meta) if meta.is_dir() => FileType::Directory,
                _ => FileType::RegularFile,
            };
            let child_ino = self.inodes.get_or_insert(path);
            entries.push((child_ino, kind, name));
        }

        let fh = self.next_fh;
        self.next_fh += 1;
        debug!(target: "srfp::fuse", ino, fh, entries = entries.len(), "opendir");
        self.dir_handles.insert(fh, entries);
        Ok(fh)
    }

    fn dir_entries(&self, fh: u64) -> Option<&[DirEntry]> {
        self.dir_handles.get(&fh).map(Vec::as_slice)
    }

    fn close_dir(&mut self, fh: u64) {
        self.dir_handles.remove(&fh);
    }
}

impl Filesystem for FuseClient {
    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let result = self.child(parent, name).and_then(|path| {
            let meta = self.fs.stat(&path)?;
            Ok((path, meta))
        });

        match result {
            Ok((path, meta)) => {
                let ino = self.inodes.get_or_insert(path);
                let ttl = self.fs.config().attr_ttl;
                reply.entry(&ttl, &self.to_attr(ino, &meta), 0);
            }
            Err(e) => reply.error(Self::log_error("lookup", &e)),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.stat_ino(ino) {
            Ok(attr) => reply.attr(&self.fs.config().attr_ttl, &attr),
            Err(e) => reply.error(Self::log_error("getattr", &e)),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let result = self
            .path(ino)
            .and_then(|path| self.fs.set_len(path, size.unwrap_or(0)));
        reply.error(Self::refused("setattr", result));
    }

    fn mkdir(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let result = self.child(parent, name).and_then(|path| self.fs.create_dir(path));
        reply.error(Self::refused("mkdir", result));
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let result = self.child(parent, name).and_then(|path| self.fs.remove_file(path));
        reply.error(Self::refused("unlink", result));
    }

    fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let result = self.child(parent, name).and_then(|path| self.fs.remove_dir(path));
        reply.error(Self::refused("rmdir", result));
    }

    fn rename(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let result = self.child(parent, name).and_then(|from| {
            let to = self.child(newparent, newname)?;
            self.fs.rename(from, to)
        });
        reply.error(Self::refused("rename", result));
    }

    fn create(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let result = self.child(parent, name).and_then(|path| self.fs.create(path));
        reply.error(Self::refused("create", result));
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        let result = self
            .path(ino)
            .and_then(|path| self.fs.open_with(path, OpenMode::from_flags(flags)).map(|_| ()));
        match result {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(Self::log_error("open", &e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };
        let result = self
            .path(ino)
            .and_then(|path| self.fs.read_range(path, offset, size as usize));
        match result {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(Self::log_error("read", &e)),
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        _offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let result = self.path(ino).and_then(|path| self.fs.write(path, data));
        reply.error(Self::refused("write", result));
    }

    fn release(
        &mut self,
        _req: &Request,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn opendir(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.open_dir(ino) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(Self::log_error("opendir", &e)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(entries) = self.dir_entries(fh) else {
            reply.error(libc::EBADF);
            return;
        };
        for (i, (entry_ino, kind, name)) in entries.iter().enumerate().skip(offset as usize) {
            if reply.add(*entry_ino, (i + 1) as i64, *kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(&mut self, _req: &Request, _ino: u64, fh: u64, _flags: i32, reply: ReplyEmpty) {
        self.close_dir(fh);
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
        reply.statfs(
            0,
            0,
            0,
            self.inodes.len() as u64,
            0,
            BLOCK_SIZE,
            MAX_NAME_LEN,
            BLOCK_SIZE,
        );
    }
}
