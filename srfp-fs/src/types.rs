//! Filesystem-facing types.

use crate::error::Error;
use serde::Serialize;
use srfp_proto::NodeInfo;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Metadata for a remote node.
///
/// Timestamps are seconds since the epoch. Devices report 0 for fields they
/// do not track, which surfaces here as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub is_file: bool,
    pub size: u64,
    pub created: Option<u64>,
    pub accessed: Option<u64>,
    pub modified: Option<u64>,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        !self.is_file
    }

    pub fn created_time(&self) -> Option<SystemTime> {
        self.created.map(to_system_time)
    }

    pub fn accessed_time(&self) -> Option<SystemTime> {
        self.accessed.map(to_system_time)
    }

    pub fn modified_time(&self) -> Option<SystemTime> {
        self.modified.map(to_system_time)
    }
}

impl From<NodeInfo> for Metadata {
    fn from(info: NodeInfo) -> Self {
        let present = |secs: u32| (secs != 0).then_some(u64::from(secs));
        Self {
            is_file: info.is_file,
            size: u64::from(info.size),
            created: present(info.created),
            accessed: present(info.accessed),
            modified: present(info.modified),
        }
    }
}

fn to_system_time(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

/// Access requested when opening a file.
///
/// Parsed from `fopen`-style mode strings; only [`OpenMode::Read`] is ever
/// granted on the read-only filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
    CreateNew,
    ReadWrite,
}

impl OpenMode {
    pub fn is_read_only(self) -> bool {
        self == OpenMode::Read
    }

    /// Derive the mode from `open(2)` flags.
    pub fn from_flags(flags: i32) -> Self {
        match flags & libc::O_ACCMODE {
            libc::O_RDONLY => OpenMode::Read,
            libc::O_RDWR => OpenMode::ReadWrite,
            _ if flags & libc::O_APPEND != 0 => OpenMode::Append,
            _ => OpenMode::Write,
        }
    }
}

impl FromStr for OpenMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidMode(s.to_string());

        let mut base = None;
        let mut plus = false;
        for c in s.chars() {
            match c {
                'r' | 'w' | 'a' | 'x' if base.is_none() => base = Some(c),
                '+' if !plus => plus = true,
                'b' | 't' => {}
                _ => return Err(invalid()),
            }
        }

        match (base.ok_or_else(invalid)?, plus) {
            (_, true) => Ok(OpenMode::ReadWrite),
            ('r', false) => Ok(OpenMode::Read),
            ('w', false) => Ok(OpenMode::Write),
            ('a', false) => Ok(OpenMode::Append),
            (_, false) => Ok(OpenMode::CreateNew),
        }
    }
}
