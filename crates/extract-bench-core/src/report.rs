use crate::dupes::QuarantineOutcome;
use crate::error::Error;
use crate::filter::RejectionKind;
use crate::hasher::ContentFingerprint;
use crate::inspect::DocumentInfo;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Per-converter conversion outcomes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConverterCounts {
    pub converted: usize,
    pub cached: usize,
    pub failed: usize,
    pub timed_out: usize,
}

/// How many files survived, or dropped out at, each pipeline stage.
#[derive(Debug, Default, Clone)]
pub struct StageCounts {
    pub patterns: usize,
    pub paths_matched: usize,
    pub unreadable: usize,
    pub files: usize,
    pub distinct_sizes: usize,
    pub fingerprints_computed: usize,
    pub hash_failures: usize,
    pub duplicate_groups: usize,
    pub duplicates: usize,
    pub quarantine: QuarantineOutcome,
    pub inspected: usize,
    pub inspection_cache_hits: usize,
    pub accepted: usize,
    pub rejected: BTreeMap<RejectionKind, usize>,
    pub conversions: BTreeMap<String, ConverterCounts>,
    pub missing_artifacts: usize,
    pub decode_failures: usize,
    pub too_short: usize,
    pub scored: usize,
}

impl StageCounts {
    pub fn reject(&mut self, kind: RejectionKind) {
        *self.rejected.entry(kind).or_default() += 1;
    }

    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    pub fn converter(&mut self, name: &str) -> &mut ConverterCounts {
        self.conversions.entry(name.to_string()).or_default()
    }
}

/// Scores for one document: how differently the two converters extracted it.
#[derive(Debug, Clone)]
pub struct ScoreRecord {
    pub name: String,
    pub path: PathBuf,
    pub fingerprint: ContentFingerprint,
    /// Jaccard distance for n = 1, 2, 3.
    pub jaccard: [f64; 3],
    pub token_counts: [usize; 2],
    pub only_in_first: Vec<String>,
    pub only_in_second: Vec<String>,
    pub metadata: Option<DocumentInfo>,
}

impl ScoreRecord {
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.jaccard[0]
            .total_cmp(&other.jaccard[0])
            .then_with(|| self.jaccard[1].total_cmp(&other.jaccard[1]))
            .then_with(|| self.jaccard[2].total_cmp(&other.jaccard[2]))
            .then_with(|| self.name.cmp(&other.name))
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub converters: Vec<String>,
    pub counts: StageCounts,
    pub scores: Vec<ScoreRecord>,
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    rank: usize,
    name: &'a str,
    fingerprint: &'a str,
    jaccard_1: f64,
    jaccard_2: f64,
    jaccard_3: f64,
    tokens_first: usize,
    tokens_second: usize,
    only_in_first: usize,
    only_in_second: usize,
    version: Option<&'a str>,
    pages: Option<u32>,
    size_bytes: Option<u64>,
    path: String,
}

impl Report {
    pub fn new(converters: Vec<String>) -> Self {
        Self {
            started_at: Utc::now(),
            converters,
            counts: StageCounts::default(),
            scores: Vec::new(),
        }
    }

    /// Mean Jaccard distance per n-gram width; zeros when nothing was scored.
    pub fn mean_jaccard(&self) -> [f64; 3] {
        if self.scores.is_empty() {
            return [0.0; 3];
        }
        let count = self.scores.len() as f64;
        let mut sums = [0.0; 3];
        for score in &self.scores {
            for (sum, value) in sums.iter_mut().zip(score.jaccard) {
                *sum += value;
            }
        }
        sums.map(|sum| sum / count)
    }

    /// Most similar first: by distance at n=1, then n=2, then n=3, then name.
    pub fn ranked(&self) -> Vec<&ScoreRecord> {
        let mut ranked: Vec<&ScoreRecord> = self.scores.iter().collect();
        ranked.sort_by(|a, b| a.rank_cmp(b));
        ranked
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), Error> {
        let mut wtr = csv::Writer::from_path(path)?;
        for (rank, score) in self.ranked().into_iter().enumerate() {
            let info = score.metadata.as_ref();
            wtr.serialize(CsvRow {
                rank,
                name: &score.name,
                fingerprint: score.fingerprint.as_str(),
                jaccard_1: score.jaccard[0],
                jaccard_2: score.jaccard[1],
                jaccard_3: score.jaccard[2],
                tokens_first: score.token_counts[0],
                tokens_second: score.token_counts[1],
                only_in_first: score.only_in_first.len(),
                only_in_second: score.only_in_second.len(),
                version: info.map(|i| i.version.as_str()),
                pages: info.map(|i| i.pages),
                size_bytes: info.map(|i| i.size),
                path: score.path.to_string_lossy().into_owned(),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::fingerprint_bytes;

    fn score(name: &str, jaccard: [f64; 3]) -> ScoreRecord {
        ScoreRecord {
            name: name.to_string(),
            path: PathBuf::from(format!("/corpus/{}", name)),
            fingerprint: fingerprint_bytes(name.as_bytes()),
            jaccard,
            token_counts: [10, 12],
            only_in_first: vec!["a".to_string()],
            only_in_second: Vec::new(),
            metadata: None,
        }
    }

    #[test]
    fn test_mean_of_empty_report_is_zero() {
        let report = Report::new(vec!["a".into(), "b".into()]);
        assert_eq!(report.mean_jaccard(), [0.0; 3]);
        assert!(report.ranked().is_empty());
    }

    #[test]
    fn test_mean_jaccard() {
        let mut report = Report::new(vec!["a".into(), "b".into()]);
        report.scores.push(score("x.pdf", [0.2, 0.4, 0.6]));
        report.scores.push(score("y.pdf", [0.4, 0.6, 0.8]));
        let mean = report.mean_jaccard();
        assert!((mean[0] - 0.3).abs() < 1e-12);
        assert!((mean[1] - 0.5).abs() < 1e-12);
        assert!((mean[2] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_ranking_order() {
        let mut report = Report::new(vec!["a".into(), "b".into()]);
        report.scores.push(score("c.pdf", [0.1, 0.5, 0.5]));
        report.scores.push(score("b.pdf", [0.1, 0.2, 0.9]));
        report.scores.push(score("a.pdf", [0.1, 0.2, 0.9]));
        report.scores.push(score("d.pdf", [0.0, 0.9, 0.9]));
        let names: Vec<_> = report.ranked().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["d.pdf", "a.pdf", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn test_stage_counters() {
        let mut counts = StageCounts::default();
        counts.reject(RejectionKind::Encrypted);
        counts.reject(RejectionKind::Encrypted);
        counts.reject(RejectionKind::TooManyPages);
        counts.converter("poppler").failed += 1;
        assert_eq!(counts.rejected_total(), 3);
        assert_eq!(counts.rejected[&RejectionKind::Encrypted], 2);
        assert_eq!(counts.conversions["poppler"].failed, 1);
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.csv");
        let mut report = Report::new(vec!["a".into(), "b".into()]);
        report.scores.push(score("late.pdf", [0.9, 0.9, 0.9]));
        report.scores.push(score("early.pdf", [0.1, 0.1, 0.1]));
        report.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("rank,name,fingerprint,jaccard_1"));
        assert!(lines[1].starts_with("0,early.pdf,"));
        assert!(lines[2].starts_with("1,late.pdf,"));
    }
}
