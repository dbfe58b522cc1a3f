use crate::hasher::{self, ContentFingerprint};
use crate::model::FileRecord;
use crate::scanner;
use ahash::AHashMap;
use dashmap::DashMap;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// A representative file and the later files with the same content.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub representative: Arc<FileRecord>,
    pub duplicates: Vec<Arc<FileRecord>>,
}

impl DuplicateGroup {
    fn singleton(file: Arc<FileRecord>) -> Self {
        Self {
            representative: file,
            duplicates: Vec::new(),
        }
    }

    /// `None` for files that never needed hashing because nothing else could match them.
    pub fn fingerprint(&self) -> Option<&ContentFingerprint> {
        self.representative.fingerprint_if_computed()
    }

    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    pub fn wasted_bytes(&self) -> u64 {
        self.representative.size() * self.duplicates.len() as u64
    }
}

/// Content index over the corpus. Every scanned file belongs to exactly one
/// group, either as its representative or as one of its duplicates.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    groups: Vec<DuplicateGroup>,
    by_fingerprint: AHashMap<ContentFingerprint, usize>,
    fingerprints_computed: usize,
    hash_failures: usize,
}

impl DuplicateIndex {
    /// Build the index from files already in processing order.
    ///
    /// Two-tier filtering keeps hashing to a minimum:
    /// 1. Files with a unique size are never read.
    /// 2. Same-size files are partially hashed (first 1KB); only partial-hash
    ///    collisions get a full fingerprint.
    ///
    /// Hashing runs in parallel; group assignment walks the input order, so the
    /// earliest file with a given fingerprint is always the representative.
    pub fn build(files: &[Arc<FileRecord>]) -> Self {
        let size_counts = scanner::size_counts(files);
        let hash_failures = AtomicUsize::new(0);

        // Tier 1: partial hash of files sharing a size
        let partial_buckets: DashMap<(u64, u64), Vec<usize>> = DashMap::new();
        (0..files.len())
            .into_par_iter()
            .filter(|&i| size_counts.get(&files[i].size()).copied().unwrap_or(0) > 1)
            .for_each(|i| match hasher::partial_hash(files[i].path()) {
                Ok(hash) => partial_buckets
                    .entry((files[i].size(), hash))
                    .or_default()
                    .push(i),
                Err(e) => {
                    error!("Error processing file '{}': {}", files[i].path().display(), e);
                    hash_failures.fetch_add(1, Ordering::Relaxed);
                }
            });

        let candidates: Vec<usize> = partial_buckets
            .iter()
            .filter(|entry| entry.value().len() > 1)
            .flat_map(|entry| entry.value().clone())
            .collect();

        // Tier 2: full fingerprint on partial-hash collisions
        let fingerprints: DashMap<usize, ContentFingerprint> = DashMap::new();
        candidates
            .par_iter()
            .for_each(|&i| match files[i].fingerprint() {
                Ok(fp) => {
                    fingerprints.insert(i, fp.clone());
                }
                Err(e) => {
                    error!("Error processing file '{}': {}", files[i].path().display(), e);
                    hash_failures.fetch_add(1, Ordering::Relaxed);
                }
            });
        debug!(
            "{} of {} files needed a full fingerprint",
            fingerprints.len(),
            files.len()
        );

        let mut index = DuplicateIndex {
            fingerprints_computed: fingerprints.len(),
            hash_failures: hash_failures.into_inner(),
            ..Default::default()
        };

        for (i, file) in files.iter().enumerate() {
            let Some((_, fp)) = fingerprints.remove(&i) else {
                index.groups.push(DuplicateGroup::singleton(Arc::clone(file)));
                continue;
            };
            match index.by_fingerprint.get(&fp) {
                Some(&group_idx) => {
                    let group = &mut index.groups[group_idx];
                    info!(
                        duplicate = %file.path().display(),
                        of = %group.representative.path().display(),
                        "**! DUPLICATE"
                    );
                    group.duplicates.push(Arc::clone(file));
                }
                None => {
                    index.by_fingerprint.insert(fp, index.groups.len());
                    index.groups.push(DuplicateGroup::singleton(Arc::clone(file)));
                }
            }
        }

        info!(
            "{} groups, {} duplicates",
            index.groups.len(),
            index.duplicate_count()
        );
        index
    }

    /// All groups, ordered by their representative's position in the corpus.
    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    pub fn group(&self, fingerprint: &ContentFingerprint) -> Option<&DuplicateGroup> {
        self.by_fingerprint
            .get(fingerprint)
            .map(|&idx| &self.groups[idx])
    }

    pub fn duplicate_groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(|g| g.has_duplicates())
    }

    pub fn representatives(&self) -> impl Iterator<Item = &Arc<FileRecord>> {
        self.groups.iter().map(|g| &g.representative)
    }

    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.duplicates.len()).sum()
    }

    pub fn fingerprints_computed(&self) -> usize {
        self.fingerprints_computed
    }

    pub fn hash_failures(&self) -> usize {
        self.hash_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn record(dir: &Path, name: &str, content: &[u8]) -> Arc<FileRecord> {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        Arc::new(FileRecord::new(path, content.len() as u64))
    }

    #[test]
    fn test_unique_sizes_are_never_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            record(dir.path(), "a", b"1"),
            record(dir.path(), "b", b"22"),
            record(dir.path(), "c", b"333"),
        ];

        let index = DuplicateIndex::build(&files);
        assert_eq!(index.groups().len(), 3);
        assert_eq!(index.fingerprints_computed(), 0);
        for file in &files {
            assert!(file.fingerprint_if_computed().is_none());
        }
    }

    #[test]
    fn test_same_size_different_prefix_skips_full_hash() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            record(dir.path(), "a", b"alpha"),
            record(dir.path(), "b", b"bravo"),
        ];
        let index = DuplicateIndex::build(&files);
        assert_eq!(index.groups().len(), 2);
        assert_eq!(index.fingerprints_computed(), 0);
    }

    #[test]
    fn test_first_file_is_representative() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            record(dir.path(), "first", b"same bytes"),
            record(dir.path(), "other", b"diff bytes"),
            record(dir.path(), "second", b"same bytes"),
            record(dir.path(), "third", b"same bytes"),
        ];

        let index = DuplicateIndex::build(&files);
        assert_eq!(index.groups().len(), 2);
        assert_eq!(index.duplicate_count(), 2);

        let fp = files[0].fingerprint_if_computed().unwrap();
        let group = index.group(fp).unwrap();
        assert!(Arc::ptr_eq(&group.representative, &files[0]));
        let dupes: Vec<_> = group.duplicates.iter().map(|f| f.display_name()).collect();
        assert_eq!(dupes, vec!["second", "third"]);
        assert_eq!(group.wasted_bytes(), 20);

        // The odd file shared a size and got hashed, but stands alone.
        let other_fp = files[1].fingerprint_if_computed().unwrap();
        assert!(!index.group(other_fp).unwrap().has_duplicates());
        assert_eq!(index.duplicate_groups().count(), 1);
    }

    #[test]
    fn test_unreadable_candidate_becomes_singleton() {
        let dir = tempfile::tempdir().unwrap();
        let a = record(dir.path(), "a", b"xx");
        let b = record(dir.path(), "b", b"xx");
        let ghost = Arc::new(FileRecord::new(dir.path().join("ghost"), 2));

        let index = DuplicateIndex::build(&[a, ghost, b]);
        assert_eq!(index.hash_failures(), 1);
        assert_eq!(index.groups().len(), 2);
        assert_eq!(index.duplicate_count(), 1);
    }
}
