//! Path segment helpers.
//!
//! A remote path is an ordered list of byte segments. On the wire the
//! segments are joined with a single NUL; locally they map onto an absolute
//! Unix-style path (`[] <-> "/"`, `["a", "b"] <-> "/a/b"`).

use crate::error::ProtocolError;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf};

/// Wire separator between path segments and directory entries.
pub const SEPARATOR: u8 = 0x00;

/// Join segments with NUL for the wire.
///
/// Segments must be non-empty and NUL-free.
pub fn encode_segments(segments: &[Vec<u8>]) -> Result<Vec<u8>, ProtocolError> {
    let len = segments.iter().map(Vec::len).sum::<usize>() + segments.len().saturating_sub(1);
    let mut buf = Vec::with_capacity(len);
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            return Err(ProtocolError::EmptySegment);
        }
        if segment.contains(&SEPARATOR) {
            return Err(ProtocolError::NulInSegment);
        }
        if i > 0 {
            buf.push(SEPARATOR);
        }
        buf.extend_from_slice(segment);
    }
    Ok(buf)
}

/// Split a NUL-joined wire body back into segments. An empty body is an
/// empty list.
pub fn decode_segments(data: &[u8]) -> Vec<Vec<u8>> {
    if data.is_empty() {
        return Vec::new();
    }
    data.split(|b| *b == SEPARATOR).map(<[u8]>::to_vec).collect()
}

/// Convert a local path into remote segments.
///
/// Root, `.` and empty components are dropped and `..` pops the previous
/// segment, so `"/a/./b/../c"` becomes `["a", "c"]`. Relative paths are
/// taken from the remote root.
pub fn filename_to_segments<P: AsRef<Path>>(path: P) -> Vec<Vec<u8>> {
    let mut segments: Vec<Vec<u8>> = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(name) => segments.push(name.as_bytes().to_vec()),
            Component::ParentDir => {
                segments.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    segments
}

/// Convert remote segments into an absolute local path.
pub fn segments_to_filename(segments: &[Vec<u8>]) -> PathBuf {
    let mut path = PathBuf::from("/");
    for segment in segments {
        path.push(OsStr::from_bytes(segment));
    }
    path
}
