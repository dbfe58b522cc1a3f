use super::{ConversionError, ExternalConverter};
use crate::cache_file;
use crate::hasher::ContentFingerprint;
use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The artifact was already on disk; the converter did not run.
    Cached(PathBuf),
    /// The converter ran and its output was published.
    Converted(PathBuf),
}

impl EnsureOutcome {
    pub fn path(&self) -> &Path {
        match self {
            EnsureOutcome::Cached(p) | EnsureOutcome::Converted(p) => p,
        }
    }
}

/// Conversion artifacts at `<results>/<converter>/<short fingerprint>.txt`.
///
/// An artifact only ever appears by being moved into place whole, so its
/// presence means the conversion succeeded. Within one process concurrent
/// requests for the same pair are serialized, so the converter runs at most
/// once per pair.
pub struct ConversionCache {
    results_dir: PathBuf,
    in_flight: DashMap<(String, ContentFingerprint), Arc<Mutex<()>>>,
}

impl ConversionCache {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            in_flight: DashMap::new(),
        }
    }

    pub fn artifact_path(&self, converter: &str, fingerprint: &ContentFingerprint) -> PathBuf {
        self.results_dir
            .join(converter)
            .join(format!("{}.txt", fingerprint.short()))
    }

    /// Existing artifact for the pair, if any.
    pub fn lookup(&self, converter: &str, fingerprint: &ContentFingerprint) -> Option<PathBuf> {
        let path = self.artifact_path(converter, fingerprint);
        path.is_file().then_some(path)
    }

    pub fn ensure(
        &self,
        converter: &dyn ExternalConverter,
        source: &Path,
        fingerprint: &ContentFingerprint,
    ) -> Result<EnsureOutcome, ConversionError> {
        let name = converter.name();
        let dest = self.artifact_path(name, fingerprint);
        if dest.exists() {
            trace!("{} artifact for {} already cached", name, source.display());
            return Ok(EnsureOutcome::Cached(dest));
        }

        let lock = Arc::clone(
            self.in_flight
                .entry((name.to_string(), fingerprint.clone()))
                .or_default()
                .value(),
        );
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if dest.exists() {
            return Ok(EnsureOutcome::Cached(dest));
        }

        let converter_dir = self.results_dir.join(name);
        fs::create_dir_all(&converter_dir)?;
        // Private scratch space next to the destination so the final move is a rename.
        let scratch = tempfile::Builder::new()
            .prefix(".tmp-")
            .tempdir_in(&converter_dir)?;
        let tmp_output = scratch.path().join(format!("{}.txt", fingerprint.short()));

        converter.convert(source, &tmp_output)?;
        if !tmp_output.exists() {
            return Err(ConversionError::NoOutput {
                converter: name.to_string(),
            });
        }

        if cache_file::publish_no_clobber(&tmp_output, &dest)? {
            debug!("{} converted {}", name, source.display());
            Ok(EnsureOutcome::Converted(dest))
        } else {
            // Another process published first; its artifact stands.
            Ok(EnsureOutcome::Cached(dest))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::fingerprint_bytes;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeConverter {
        calls: AtomicUsize,
        mode: Mode,
    }

    enum Mode {
        Write(&'static str),
        Nothing,
        CrashMidWrite,
    }

    impl FakeConverter {
        fn new(mode: Mode) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                mode,
            }
        }
    }

    impl ExternalConverter for FakeConverter {
        fn name(&self) -> &str {
            "fake"
        }

        fn convert(&self, _source: &Path, output: &Path) -> Result<(), ConversionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                Mode::Write(text) => fs::write(output, text)?,
                Mode::Nothing => {}
                Mode::CrashMidWrite => {
                    let mut f = fs::File::create(output)?;
                    f.write_all(b"partial")?;
                    return Err(ConversionError::Io(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "converter crashed",
                    )));
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_ensure_runs_converter_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ConversionCache::new(dir.path());
        let converter = FakeConverter::new(Mode::Write("extracted text"));
        let fp = fingerprint_bytes(b"source");

        let first = cache.ensure(&converter, Path::new("a.pdf"), &fp).unwrap();
        let second = cache.ensure(&converter, Path::new("a.pdf"), &fp).unwrap();

        assert!(matches!(first, EnsureOutcome::Converted(_)));
        assert!(matches!(second, EnsureOutcome::Cached(_)));
        assert_eq!(first.path(), second.path());
        assert_eq!(converter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fs::read_to_string(first.path()).unwrap(), "extracted text");
        assert_eq!(
            first.path(),
            dir.path().join("fake").join(format!("{}.txt", fp.short()))
        );
    }

    #[test]
    fn test_missing_output_leaves_slot_open() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ConversionCache::new(dir.path());
        let fp = fingerprint_bytes(b"source");

        let err = cache
            .ensure(&FakeConverter::new(Mode::Nothing), Path::new("a.pdf"), &fp)
            .unwrap_err();
        assert!(matches!(err, ConversionError::NoOutput { .. }));
        assert!(cache.lookup("fake", &fp).is_none());

        // A later run can still fill it.
        let retry = FakeConverter::new(Mode::Write("ok"));
        cache.ensure(&retry, Path::new("a.pdf"), &fp).unwrap();
        assert!(cache.lookup("fake", &fp).is_some());
    }

    #[test]
    fn test_crash_mid_write_never_reaches_canonical_path() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ConversionCache::new(dir.path());
        let fp = fingerprint_bytes(b"source");

        let result = cache.ensure(&FakeConverter::new(Mode::CrashMidWrite), Path::new("a.pdf"), &fp);
        assert!(result.is_err());
        assert!(!cache.artifact_path("fake", &fp).exists());
        // Scratch directory is cleaned up too.
        assert_eq!(fs::read_dir(dir.path().join("fake")).unwrap().count(), 0);
    }

    #[test]
    fn test_concurrent_ensure_converts_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ConversionCache::new(dir.path());
        let converter = FakeConverter::new(Mode::Write("text"));
        let fp = fingerprint_bytes(b"shared");

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| cache.ensure(&converter, Path::new("a.pdf"), &fp).unwrap());
            }
        });
        assert_eq!(converter.calls.load(Ordering::SeqCst), 1);
    }
}
