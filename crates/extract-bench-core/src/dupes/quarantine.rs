use super::index::{DuplicateGroup, DuplicateIndex};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{error, info, warn};

/// What to do when `<quarantine dir>/<fingerprint>` already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuarantinePolicy {
    /// Replace the existing file; contents are identical by fingerprint.
    #[default]
    Overwrite,
    /// Leave the duplicate where it is.
    Skip,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QuarantineOutcome {
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl QuarantineOutcome {
    fn absorb(&mut self, other: QuarantineOutcome) {
        self.moved += other.moved;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Move every non-representative file of `group` into `dir`, named by the
/// group fingerprint. Safe to repeat: files already gone are skipped. IO
/// errors are logged and counted as failures, never returned.
pub fn quarantine(group: &DuplicateGroup, dir: &Path, policy: QuarantinePolicy) -> QuarantineOutcome {
    let mut outcome = QuarantineOutcome::default();
    let Some(fingerprint) = group.fingerprint() else {
        return outcome;
    };
    if !group.has_duplicates() {
        return outcome;
    }

    if let Err(e) = fs::create_dir_all(dir) {
        error!("Error creating quarantine directory {}: {}", dir.display(), e);
        outcome.failed += group.duplicates.len();
        return outcome;
    }
    let dest = dir.join(fingerprint.as_str());

    for file in &group.duplicates {
        let source = file.path();
        if !source.exists() {
            outcome.skipped += 1;
            continue;
        }
        if dest.exists() && policy == QuarantinePolicy::Skip {
            warn!(
                "Quarantine target {} exists, leaving {} in place",
                dest.display(),
                source.display()
            );
            outcome.skipped += 1;
            continue;
        }
        match move_file(source, &dest) {
            Ok(()) => {
                info!("\"{}\" → \"{}\"", source.display(), dest.display());
                outcome.moved += 1;
            }
            Err(e) => {
                error!("Error moving {} to {}: {}", source.display(), dest.display(), e);
                outcome.failed += 1;
            }
        }
    }

    outcome
}

pub fn quarantine_all(index: &DuplicateIndex, dir: &Path, policy: QuarantinePolicy) -> QuarantineOutcome {
    let mut total = QuarantineOutcome::default();
    for group in index.duplicate_groups() {
        total.absorb(quarantine(group, dir, policy));
    }
    info!(
        "{} moved, {} skipped, {} failed",
        total.moved, total.skipped, total.failed
    );
    total
}

/// Rename, falling back to copy and delete when the rename cannot cross
/// filesystems.
fn move_file(source: &Path, dest: &Path) -> io::Result<()> {
    if dest.exists() {
        fs::remove_file(dest)?;
    }
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if fs::copy(source, dest).is_err() {
                return Err(rename_err);
            }
            fs::remove_file(source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileRecord;
    use std::sync::Arc;

    fn corpus(dir: &Path, names: &[&str], content: &[u8]) -> Vec<Arc<FileRecord>> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                fs::write(&path, content).unwrap();
                Arc::new(FileRecord::new(path, content.len() as u64))
            })
            .collect()
    }

    #[test]
    fn test_quarantine_moves_duplicates_and_is_repeatable() {
        let root = tempfile::tempdir().unwrap();
        let files = corpus(root.path(), &["a.pdf", "b.pdf"], b"identical");
        let index = DuplicateIndex::build(&files);
        let group = &index.groups()[0];
        let fp = group.fingerprint().unwrap().clone();
        let qdir = root.path().join("duplicates");

        let outcome = quarantine(group, &qdir, QuarantinePolicy::Overwrite);
        assert_eq!(outcome.moved, 1);
        assert!(files[0].path().exists());
        assert!(!files[1].path().exists());
        assert_eq!(fs::read(qdir.join(fp.as_str())).unwrap(), b"identical");

        let again = quarantine(group, &qdir, QuarantinePolicy::Overwrite);
        assert_eq!(again, QuarantineOutcome { moved: 0, skipped: 1, failed: 0 });
    }

    #[test]
    fn test_skip_policy_leaves_duplicate_when_target_exists() {
        let root = tempfile::tempdir().unwrap();
        let files = corpus(root.path(), &["a", "b", "c"], b"same");
        let index = DuplicateIndex::build(&files);
        let qdir = root.path().join("q");

        let outcome = quarantine_all(&index, &qdir, QuarantinePolicy::Skip);
        assert_eq!(outcome.moved, 1);
        assert_eq!(outcome.skipped, 1);
        assert!(!files[1].path().exists());
        assert!(files[2].path().exists());
    }

    #[test]
    fn test_unusable_directory_counts_failures() {
        let root = tempfile::tempdir().unwrap();
        let files = corpus(root.path(), &["a", "b", "c"], b"same");
        let index = DuplicateIndex::build(&files);
        let blocker = root.path().join("not-a-dir");
        fs::write(&blocker, b"").unwrap();

        let outcome = quarantine_all(&index, &blocker.join("q"), QuarantinePolicy::Overwrite);
        assert_eq!(outcome, QuarantineOutcome { moved: 0, skipped: 0, failed: 2 });
        assert!(files.iter().all(|f| f.path().exists()));
    }

    #[test]
    fn test_singletons_are_untouched() {
        let root = tempfile::tempdir().unwrap();
        let files = corpus(root.path(), &["only"], b"solo");
        let index = DuplicateIndex::build(&files);
        let qdir = root.path().join("q");

        let outcome = quarantine_all(&index, &qdir, QuarantinePolicy::Overwrite);
        assert_eq!(outcome, QuarantineOutcome::default());
        assert!(!qdir.exists());
    }
}
