use crate::hasher::{self, ContentFingerprint};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A file discovered by the scanner. Immutable apart from the fingerprint,
/// which is computed at most once per run and only when asked for.
#[derive(Debug)]
pub struct FileRecord {
    path: PathBuf,
    size: u64,
    fingerprint: OnceLock<ContentFingerprint>,
}

impl FileRecord {
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            fingerprint: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    /// Content fingerprint, hashing the file on first use.
    pub fn fingerprint(&self) -> io::Result<&ContentFingerprint> {
        if let Some(fp) = self.fingerprint.get() {
            return Ok(fp);
        }
        let fp = hasher::fingerprint(&self.path)?;
        Ok(self.fingerprint.get_or_init(|| fp))
    }

    /// The fingerprint if something already computed it, without hashing.
    pub fn fingerprint_if_computed(&self) -> Option<&ContentFingerprint> {
        self.fingerprint.get()
    }
}
