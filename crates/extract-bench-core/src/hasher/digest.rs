use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

/// Width of the truncated fingerprint used in cache file names.
pub const SHORT_FINGERPRINT_LEN: usize = 10;

/// Content-derived identity of a file: the hex blake3 digest of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fixed-width prefix used as a compact cache identifier. Always
    /// `SHORT_FINGERPRINT_LEN` characters, left-padded with `0` if the
    /// digest string is ever shorter.
    pub fn short(&self) -> String {
        let prefix: String = self.0.chars().take(SHORT_FINGERPRINT_LEN).collect();
        format!("{:0>width$}", prefix, width = SHORT_FINGERPRINT_LEN)
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash the full content of `path`.
pub fn fingerprint(path: &Path) -> io::Result<ContentFingerprint> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(ContentFingerprint(hasher.finalize().to_hex().to_string()))
}

pub fn fingerprint_bytes(data: &[u8]) -> ContentFingerprint {
    ContentFingerprint(blake3::hash(data).to_hex().to_string())
}
