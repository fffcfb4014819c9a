//! One opened `.gpk` archive.
//!
//! An [`Archive`] owns the byte image of a single map file plus a lazily
//! parsed, cached header.  It is immutable after opening and safe to share
//! across concurrent queries; each decode operation takes its own
//! [`WireReader`] session, which is exclusively owned by the operation
//! that started it.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::header::{ArchiveError, ArchiveInfo};
use crate::wire::WireReader;

/// Process-wide source for runtime archive keys.  Keys scope
/// [`DataBlockId`](crate::cache::DataBlockId)s to their archive and are
/// never persisted.
static NEXT_ARCHIVE_KEY: AtomicU64 = AtomicU64::new(1);

pub struct Archive {
    path: PathBuf,
    data: Vec<u8>,
    key:  u64,
    info: Mutex<Option<Arc<ArchiveInfo>>>,
}

impl Archive {
    /// Open a map archive from disk.  The header is not parsed here;
    /// validation happens on the first [`Archive::info`] call (or through
    /// the catalog's descriptor scan).
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_owned();
        let data = std::fs::read(&path)?;
        Ok(Self::from_parts(path, data))
    }

    /// Wrap an in-memory archive image.  `name` stands in for the path in
    /// diagnostics.
    pub fn from_bytes(name: &str, data: Vec<u8>) -> Self {
        Self::from_parts(PathBuf::from(name), data)
    }

    fn from_parts(path: PathBuf, data: Vec<u8>) -> Self {
        Self {
            path,
            data,
            key:  NEXT_ARCHIVE_KEY.fetch_add(1, Ordering::Relaxed),
            info: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runtime key, unique per opened archive within this process.
    pub fn key(&self) -> u64 {
        self.key
    }

    /// The raw archive image.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Start a fresh decode session over the whole image.
    pub fn reader(&self) -> WireReader<'_> {
        WireReader::new(&self.data)
    }

    /// The parsed archive descriptor, validated and cached on first use.
    /// A structurally unreadable header fails every call; nothing partial
    /// is cached.
    pub fn info(&self) -> Result<Arc<ArchiveInfo>, ArchiveError> {
        let mut slot = self.info.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(info) = slot.as_ref() {
            return Ok(Arc::clone(info));
        }
        let info = Arc::new(ArchiveInfo::read(&mut self.reader())?);
        *slot = Some(Arc::clone(&info));
        Ok(info)
    }
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("path", &self.path)
            .field("key", &self.key)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::tests::{archive_with_sections, put_section};
    use std::io::Write;

    fn sample_image() -> Vec<u8> {
        archive_with_sections(&mut |buf| {
            put_section(buf, "alps", (0, 100, 0, 100), (5, 14), &["peak"], b"\x7f");
        })
    }

    #[test]
    fn info_is_parsed_once_and_cached() {
        let archive = Archive::from_bytes("alps.gpk", sample_image());
        let a = archive.info().unwrap();
        let b = archive.info().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.sections[0].name, "alps");
    }

    #[test]
    fn keys_are_unique_per_open() {
        let a = Archive::from_bytes("a.gpk", sample_image());
        let b = Archive::from_bytes("b.gpk", sample_image());
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn unreadable_header_fails_every_call() {
        let archive = Archive::from_bytes("garbage.gpk", vec![0xff; 8]);
        assert!(archive.info().is_err());
        assert!(archive.info().is_err());
    }

    #[test]
    fn open_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&sample_image()).unwrap();
        file.flush().unwrap();

        let archive = Archive::open(file.path()).unwrap();
        assert_eq!(archive.path(), file.path());
        let info = archive.info().unwrap();
        assert_eq!(info.sections.len(), 1);
    }
}
