use super::report::{parse_font_report, render_font_report, InspectionReport};
use super::{FontInspector, InspectError, Metadata, MetadataInspector};
use crate::cache_file;
use crate::hasher::ContentFingerprint;
use crate::model::FileRecord;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{trace, warn};

#[derive(Debug, Clone)]
pub struct InspectOutcome {
    pub metadata: Metadata,
    pub cache_hit: bool,
}

/// Metadata cache under `results/info/`, keyed by the short fingerprint.
///
/// `<short>.info` holds the inspector report and is trusted whenever it
/// exists; it is never compared against the source file. `<short>.fonts` is
/// only reused while it is newer than the source file.
pub struct MetadataStore {
    info_dir: PathBuf,
    inspector: Option<Arc<dyn MetadataInspector>>,
    font_inspector: Option<Arc<dyn FontInspector>>,
}

impl MetadataStore {
    pub fn new(info_dir: impl Into<PathBuf>) -> Self {
        Self {
            info_dir: info_dir.into(),
            inspector: None,
            font_inspector: None,
        }
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn MetadataInspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    pub fn with_font_inspector(mut self, inspector: Arc<dyn FontInspector>) -> Self {
        self.font_inspector = Some(inspector);
        self
    }

    pub fn info_path(&self, fingerprint: &ContentFingerprint) -> PathBuf {
        self.info_dir.join(format!("{}.info", fingerprint.short()))
    }

    pub fn fonts_path(&self, fingerprint: &ContentFingerprint) -> PathBuf {
        self.info_dir.join(format!("{}.fonts", fingerprint.short()))
    }

    /// Metadata for `file`, from the cache when present. Fonts are looked up
    /// only when `want_fonts` is set and the document inspected cleanly. A
    /// font report that cannot be produced leaves the document `SizeOnly`,
    /// so it never passes a font constraint unchecked.
    pub fn load(
        &self,
        file: &FileRecord,
        fingerprint: &ContentFingerprint,
        want_fonts: bool,
    ) -> InspectOutcome {
        let (report, cache_hit) = self.report(file.path(), fingerprint);
        let size_only = || Metadata::SizeOnly {
            path: file.path().to_path_buf(),
            size: file.size(),
        };
        let metadata = match report {
            Some(report) if want_fonts && report.failure.is_none() => {
                match self.fonts(file.path(), fingerprint) {
                    Some(fonts) => report.into_metadata(file.path(), file.size(), fonts),
                    None => size_only(),
                }
            }
            Some(report) => report.into_metadata(file.path(), file.size(), BTreeMap::new()),
            None => size_only(),
        };
        InspectOutcome {
            metadata,
            cache_hit,
        }
    }

    fn report(&self, source: &Path, fingerprint: &ContentFingerprint) -> (Option<InspectionReport>, bool) {
        let info_path = self.info_path(fingerprint);
        if info_path.exists() {
            match fs::read_to_string(&info_path) {
                Ok(text) => {
                    trace!("Found metadata for {} in cache", source.display());
                    return (Some(InspectionReport::parse(&text)), true);
                }
                Err(e) => warn!("Error reading {}: {}, re-inspecting", info_path.display(), e),
            }
        }

        let Some(inspector) = &self.inspector else {
            return (None, false);
        };
        let text = match inspector.inspect(source) {
            Ok(text) => text,
            Err(InspectError::Failed(reason)) => {
                warn!(path = %source.display(), %reason, "**- inspection failed");
                InspectionReport::failure_text(&reason)
            }
            Err(e) => {
                warn!("Error inspecting {}: {}", source.display(), e);
                return (None, false);
            }
        };
        if let Err(e) = cache_file::write_atomic(&info_path, text.as_bytes()) {
            warn!("Error caching {}: {}", info_path.display(), e);
        }
        (Some(InspectionReport::parse(&text)), false)
    }

    fn fonts(&self, source: &Path, fingerprint: &ContentFingerprint) -> Option<BTreeMap<String, usize>> {
        let fonts_path = self.fonts_path(fingerprint);
        if is_newer_than(&fonts_path, source) {
            if let Ok(text) = fs::read_to_string(&fonts_path) {
                trace!("Found font report for {} in cache", source.display());
                return Some(parse_font_report(&text));
            }
        }

        let Some(inspector) = &self.font_inspector else {
            warn!(path = %source.display(), "**- no font inspector configured");
            return None;
        };
        match inspector.fonts(source) {
            Ok(text) => {
                let fonts = parse_font_report(&text);
                if let Err(e) =
                    cache_file::write_atomic(&fonts_path, render_font_report(&fonts).as_bytes())
                {
                    warn!("Error caching {}: {}", fonts_path.display(), e);
                }
                Some(fonts)
            }
            Err(e) => {
                warn!(path = %source.display(), error = %e, "**- font inspection failed");
                None
            }
        }
    }
}

fn is_newer_than(cache: &Path, source: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(cache), modified(source)) {
        (Some(cache_time), Some(source_time)) => cache_time >= source_time,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingInspector {
        calls: AtomicUsize,
        reply: Result<&'static str, &'static str>,
    }

    impl MetadataInspector for CountingInspector {
        fn inspect(&self, _path: &Path) -> Result<String, InspectError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .map(str::to_string)
                .map_err(|r| InspectError::Failed(r.to_string()))
        }
    }

    struct StaticFonts(&'static str, AtomicUsize);

    impl FontInspector for StaticFonts {
        fn fonts(&self, _path: &Path) -> Result<String, InspectError> {
            self.1.fetch_add(1, Ordering::SeqCst);
            Ok(self.0.to_string())
        }
    }

    fn setup(dir: &Path) -> (FileRecord, ContentFingerprint) {
        let path = dir.join("doc.pdf");
        fs::write(&path, b"%PDF-1.5 body").unwrap();
        let record = FileRecord::new(path, 13);
        let fp = record.fingerprint().unwrap().clone();
        (record, fp)
    }

    #[test]
    fn test_second_load_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (record, fp) = setup(dir.path());
        let inspector = Arc::new(CountingInspector {
            calls: AtomicUsize::new(0),
            reply: Ok("PDF Version: 1.5\nNum Pages: 4\n"),
        });
        let store = MetadataStore::new(dir.path().join("info")).with_inspector(inspector.clone());

        let first = store.load(&record, &fp, false);
        assert!(!first.cache_hit);
        assert_eq!(first.metadata.info().unwrap().pages, 4);
        assert!(store.info_path(&fp).exists());

        let second = store.load(&record, &fp, false);
        assert!(second.cache_hit);
        assert_eq!(second.metadata, first.metadata);
        assert_eq!(inspector.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_inspection_is_cached_as_size_only() {
        let dir = tempfile::tempdir().unwrap();
        let (record, fp) = setup(dir.path());
        let inspector = Arc::new(CountingInspector {
            calls: AtomicUsize::new(0),
            reply: Err("exit status: 1"),
        });
        let store = MetadataStore::new(dir.path().join("info")).with_inspector(inspector.clone());

        let outcome = store.load(&record, &fp, true);
        assert_eq!(
            outcome.metadata,
            Metadata::SizeOnly {
                path: record.path().to_path_buf(),
                size: 13
            }
        );
        assert!(store.load(&record, &fp, true).cache_hit);
        assert_eq!(inspector.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fonts_recomputed_when_source_is_newer() {
        let dir = tempfile::tempdir().unwrap();
        let (record, fp) = setup(dir.path());
        let inspector = Arc::new(CountingInspector {
            calls: AtomicUsize::new(0),
            reply: Ok("PDF Version: 1.5\nNum Pages: 4\n"),
        });
        let fonts = Arc::new(StaticFonts("Font subtypes:\n0 Type3 2\n", AtomicUsize::new(0)));
        let store = MetadataStore::new(dir.path().join("info"))
            .with_inspector(inspector)
            .with_font_inspector(fonts.clone());

        let outcome = store.load(&record, &fp, true);
        assert_eq!(outcome.metadata.info().unwrap().fonts["Type3"], 2);
        assert!(store.fonts_path(&fp).exists());

        // Fresh cache is reused.
        store.load(&record, &fp, true);
        assert_eq!(fonts.1.load(Ordering::SeqCst), 1);

        // Age the cache below the source's mtime: recomputed.
        let old = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1);
        let f = fs::File::options().write(true).open(store.fonts_path(&fp)).unwrap();
        f.set_modified(old).unwrap();
        store.load(&record, &fp, true);
        assert_eq!(fonts.1.load(Ordering::SeqCst), 2);
    }

    struct BrokenFonts;

    impl FontInspector for BrokenFonts {
        fn fonts(&self, _path: &Path) -> Result<String, InspectError> {
            Err(InspectError::Failed("exit status: 2".to_string()))
        }
    }

    #[test]
    fn test_unavailable_font_report_yields_size_only() {
        let dir = tempfile::tempdir().unwrap();
        let (record, fp) = setup(dir.path());
        let inspector = Arc::new(CountingInspector {
            calls: AtomicUsize::new(0),
            reply: Ok("PDF Version: 1.5\nNum Pages: 4\n"),
        });

        let without = MetadataStore::new(dir.path().join("info")).with_inspector(inspector.clone());
        assert!(!without.load(&record, &fp, true).metadata.is_good());
        assert!(without.load(&record, &fp, false).metadata.is_good());

        let broken = MetadataStore::new(dir.path().join("info"))
            .with_inspector(inspector)
            .with_font_inspector(Arc::new(BrokenFonts));
        assert!(!broken.load(&record, &fp, true).metadata.is_good());
        assert!(!broken.fonts_path(&fp).exists());
    }

    #[test]
    fn test_no_inspector_yields_size_only() {
        let dir = tempfile::tempdir().unwrap();
        let (record, fp) = setup(dir.path());
        let store = MetadataStore::new(dir.path().join("info"));
        let outcome = store.load(&record, &fp, false);
        assert!(!outcome.metadata.is_good());
        assert!(!store.info_path(&fp).exists());
    }
}
