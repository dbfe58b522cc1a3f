pub mod patterns;

use crate::error::Error;
use crate::model::FileRecord;
use ahash::{AHashMap, AHashSet};
use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use patterns::expand_pattern;

const MB: f64 = 1024.0 * 1024.0;

/// Optional caps applied after sorting, smallest files first.
#[derive(Debug, Clone, Default)]
pub struct ScanLimits {
    pub max_size_mb: Option<f64>,
    pub max_files: Option<usize>,
}

#[derive(Debug)]
pub struct CorpusScan {
    pub files: Vec<Arc<FileRecord>>,
    pub patterns: usize,
    pub paths_matched: usize,
    pub unreadable: usize,
    pub distinct_sizes: usize,
}

/// Expand all patterns, drop repeats, stat every file and return the corpus in
/// processing order. Pattern errors abort the scan; unreadable files are
/// logged and skipped.
pub fn scan_corpus(patterns: &[String], limits: &ScanLimits) -> Result<CorpusScan, Error> {
    let mut matched: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        matched.extend(expand_pattern(pattern)?);
    }
    let paths_matched = matched.len();
    info!("{} patterns, {} paths", patterns.len(), paths_matched);

    let mut seen: AHashSet<PathBuf> = AHashSet::new();
    let mut files: Vec<FileRecord> = Vec::new();
    let mut unreadable = 0;

    for path in matched {
        let canonical = match fs::canonicalize(&path) {
            Ok(p) => p,
            Err(e) => {
                warn!("Error resolving {}: {}", path.display(), e);
                unreadable += 1;
                continue;
            }
        };
        if !seen.insert(canonical.clone()) {
            continue;
        }
        match fs::metadata(&canonical) {
            Ok(metadata) if metadata.is_file() => {
                files.push(FileRecord::new(canonical, metadata.len()));
            }
            Ok(_) => debug!("Skipping non-file {}", canonical.display()),
            Err(e) => {
                warn!("Error reading metadata for {}: {}", canonical.display(), e);
                unreadable += 1;
            }
        }
    }

    files.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    if let Some(max_mb) = limits.max_size_mb {
        let max_bytes = max_mb * MB;
        files.retain(|f| f.size() as f64 <= max_bytes);
        info!("{} files <= {:.1} MB", files.len(), max_mb);
    }
    if let Some(max_files) = limits.max_files {
        files.truncate(max_files);
    }

    let distinct_sizes = files
        .iter()
        .map(|f| f.size())
        .collect::<AHashSet<u64>>()
        .len();
    info!(
        "{} files (unique), {} distinct sizes",
        files.len(),
        distinct_sizes
    );

    Ok(CorpusScan {
        files: files.into_iter().map(Arc::new).collect(),
        patterns: patterns.len(),
        paths_matched,
        unreadable,
        distinct_sizes,
    })
}

/// Processing order: smaller files first, then deeper paths, then shorter
/// file names, then the path itself.
pub fn sort_key(file: &FileRecord) -> (u64, Reverse<usize>, usize, &Path) {
    let path = file.path();
    let depth = path.components().count();
    let name_len = path
        .file_name()
        .map(|n| n.to_string_lossy().chars().count())
        .unwrap_or(0);
    (file.size(), Reverse(depth), name_len, path)
}

/// Group sizes, used to skip hashing files whose size is unique.
pub fn size_counts(files: &[Arc<FileRecord>]) -> AHashMap<u64, usize> {
    let mut counts: AHashMap<u64, usize> = AHashMap::new();
    for file in files {
        *counts.entry(file.size()).or_default() += 1;
    }
    counts
}
