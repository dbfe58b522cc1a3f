use crate::config::{self, AppConfig};
use crate::convert::{
    CommandConverter, ConversionCache, ConversionError, EnsureOutcome, ExternalConverter,
};
use crate::dupes::{self, DuplicateIndex, QuarantineOutcome};
use crate::error::Error;
use crate::filter::{self, Rejection};
use crate::hasher::ContentFingerprint;
use crate::inspect::{
    DocumentInfo, FontInspector, InspectOutcome, MetadataInspector, MetadataStore,
    ToolFontInspector, ToolInspector,
};
use crate::model::FileRecord;
use crate::progress::ProgressReporter;
use crate::report::{Report, ScoreRecord, StageCounts};
use crate::scanner::{self, CorpusScan, ScanLimits};
use crate::similarity;
use crate::tokenize::{self, Tokenizer};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs the benchmark pipeline: scan, deduplicate, inspect and filter,
/// convert, score.
///
/// Collaborators default to the ones described by the configuration and can
/// be replaced with the `with_*` builders.
pub struct BenchEngine {
    config: AppConfig,
    converters: Vec<Arc<dyn ExternalConverter>>,
    inspector: Option<Arc<dyn MetadataInspector>>,
    font_inspector: Option<Arc<dyn FontInspector>>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
}

#[derive(Debug)]
pub struct DedupeResult {
    pub scan: CorpusScan,
    pub index: DuplicateIndex,
    pub quarantine: QuarantineOutcome,
    pub scan_duration: Duration,
    pub hash_duration: Duration,
}

impl DedupeResult {
    pub fn wasted_bytes(&self) -> u64 {
        self.index.duplicate_groups().map(|g| g.wasted_bytes()).sum()
    }

    fn record(&self, counts: &mut StageCounts) {
        counts.patterns = self.scan.patterns;
        counts.paths_matched = self.scan.paths_matched;
        counts.unreadable = self.scan.unreadable;
        counts.files = self.scan.files.len();
        counts.distinct_sizes = self.scan.distinct_sizes;
        counts.fingerprints_computed = self.index.fingerprints_computed();
        counts.hash_failures = self.index.hash_failures();
        counts.duplicate_groups = self.index.duplicate_groups().count();
        counts.duplicates = self.index.duplicate_count();
        counts.quarantine = self.quarantine;
    }
}

/// A representative that made it through the filter stage.
struct Candidate {
    file: Arc<FileRecord>,
    fingerprint: ContentFingerprint,
    info: Option<DocumentInfo>,
}

struct Screened {
    candidate: Candidate,
    inspection: Option<InspectOutcome>,
    verdict: Result<(), Rejection>,
}

enum Unscored {
    Unreadable,
    Undecodable,
    TooShort,
}

impl BenchEngine {
    pub fn new(config: AppConfig) -> Self {
        let timeout = config.tool_timeout();
        let converters = config
            .converters
            .iter()
            .map(|spec| Arc::new(CommandConverter::new(spec, timeout)) as Arc<dyn ExternalConverter>)
            .collect();
        let inspector = config
            .inspector
            .as_ref()
            .map(|spec| Arc::new(ToolInspector::new(spec, timeout)) as Arc<dyn MetadataInspector>);
        let font_inspector = config
            .font_inspector
            .as_ref()
            .map(|spec| Arc::new(ToolFontInspector::new(spec, timeout)) as Arc<dyn FontInspector>);
        Self {
            config,
            converters,
            inspector,
            font_inspector,
            tokenizer: None,
        }
    }

    pub fn with_converters(mut self, converters: Vec<Arc<dyn ExternalConverter>>) -> Self {
        self.converters = converters;
        self
    }

    pub fn with_inspector(mut self, inspector: Option<Arc<dyn MetadataInspector>>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn with_font_inspector(mut self, inspector: Option<Arc<dyn FontInspector>>) -> Self {
        self.font_inspector = inspector;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Scan the corpus and group duplicates, quarantining them when the
    /// quarantine stage is enabled.
    pub fn dedupe(
        &self,
        patterns: &[String],
        reporter: &dyn ProgressReporter,
    ) -> Result<DedupeResult, Error> {
        let pool = self.thread_pool()?;
        pool.install(|| self.find_duplicates(patterns, reporter))
    }

    /// Run the whole pipeline and collect the scores.
    ///
    /// Only pattern and configuration errors abort the run. Every per-file
    /// failure is logged and shows up in the report's stage counts.
    pub fn run(&self, patterns: &[String], reporter: &dyn ProgressReporter) -> Result<Report, Error> {
        self.validate()?;
        let pool = self.thread_pool()?;
        pool.install(|| self.run_pipeline(patterns, reporter))
    }

    fn validate(&self) -> Result<(), Error> {
        self.config
            .validate_with_font_inspector(self.font_inspector.is_some())?;
        config::validate_converter_names(self.converters.iter().map(|c| c.name()))?;
        if self.config.stages.score && self.converters.len() != 2 {
            return Err(Error::InvalidConfig(format!(
                "scoring compares exactly two converters, {} supplied",
                self.converters.len()
            )));
        }
        Ok(())
    }

    fn thread_pool(&self) -> Result<rayon::ThreadPool, Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency)
            .thread_name(|i| format!("bench-worker-{}", i))
            .build()?;
        debug!("Worker pool with {} threads", pool.current_num_threads());
        Ok(pool)
    }

    fn tokenizer(&self) -> &dyn Tokenizer {
        match &self.tokenizer {
            Some(tokenizer) => tokenizer.as_ref(),
            None => tokenize::shared(),
        }
    }

    fn run_pipeline(
        &self,
        patterns: &[String],
        reporter: &dyn ProgressReporter,
    ) -> Result<Report, Error> {
        let dedupe = self.find_duplicates(patterns, reporter)?;
        let mut report = Report::new(self.converters.iter().map(|c| c.name().to_string()).collect());
        dedupe.record(&mut report.counts);

        let representatives: Vec<Arc<FileRecord>> =
            dedupe.index.representatives().cloned().collect();
        let candidates = self.screen_all(&representatives, &mut report.counts, reporter);
        let artifacts = self.convert_all(&candidates, &mut report.counts, reporter);
        if self.config.stages.score {
            report.scores = self.score_all(&candidates, &artifacts, &mut report.counts, reporter);
        }

        info!(
            "{} accepted, {} scored, {} missing artifacts",
            report.counts.accepted, report.counts.scored, report.counts.missing_artifacts
        );
        Ok(report)
    }

    fn find_duplicates(
        &self,
        patterns: &[String],
        reporter: &dyn ProgressReporter,
    ) -> Result<DedupeResult, Error> {
        info!("Scanning files...");
        reporter.on_scan_start();
        let scan_start = Instant::now();
        let limits = ScanLimits {
            max_size_mb: self.config.max_size_mb,
            max_files: self.config.max_files,
        };
        let scan = scanner::scan_corpus(patterns, &limits)?;
        let scan_duration = scan_start.elapsed();
        reporter.on_scan_complete(scan.files.len(), scan_duration.as_secs_f64());

        info!("Looking for duplicates...");
        reporter.on_hash_start();
        let hash_start = Instant::now();
        let index = DuplicateIndex::build(&scan.files);
        let hash_duration = hash_start.elapsed();
        debug!(
            "Hash completed in {:.2}s, {} fingerprints computed",
            hash_duration.as_secs_f64(),
            index.fingerprints_computed()
        );
        reporter.on_hash_complete(
            index.duplicate_groups().count(),
            index.duplicate_count(),
            hash_duration.as_secs_f64(),
        );

        let quarantine = if self.config.stages.quarantine {
            info!("Moving duplicates to {}", self.config.duplicates_dir.display());
            let outcome = dupes::quarantine_all(
                &index,
                &self.config.duplicates_dir,
                self.config.quarantine_policy,
            );
            reporter.on_quarantine_complete(outcome.moved, outcome.skipped, outcome.failed);
            outcome
        } else {
            QuarantineOutcome::default()
        };

        Ok(DedupeResult {
            scan,
            index,
            quarantine,
            scan_duration,
            hash_duration,
        })
    }

    fn metadata_store(&self) -> Option<MetadataStore> {
        if !self.config.stages.filter {
            return None;
        }
        let mut store = MetadataStore::new(self.config.info_dir());
        match &self.inspector {
            Some(inspector) => store = store.with_inspector(Arc::clone(inspector)),
            None => warn!("No inspector configured, only cached reports will be used"),
        }
        if let Some(inspector) = &self.font_inspector {
            store = store.with_font_inspector(Arc::clone(inspector));
        }
        Some(store)
    }

    /// Fingerprint every representative and, when filtering, inspect it and
    /// check it against the constraints.
    fn screen_all(
        &self,
        files: &[Arc<FileRecord>],
        counts: &mut StageCounts,
        reporter: &dyn ProgressReporter,
    ) -> Vec<Candidate> {
        info!("Inspecting {} files...", files.len());
        let start = Instant::now();
        let total = files.len();
        let done = AtomicUsize::new(0);
        let store = self.metadata_store();
        reporter.on_inspect_start(total);

        let screened: Vec<Option<Screened>> = files
            .par_iter()
            .map(|file| {
                let result = self.screen(file, store.as_ref());
                reporter.on_inspect_progress(done.fetch_add(1, Ordering::Relaxed) + 1, total);
                result
            })
            .collect();

        let mut candidates = Vec::new();
        for entry in screened {
            let Some(screened) = entry else {
                counts.hash_failures += 1;
                continue;
            };
            if let Some(inspection) = &screened.inspection {
                counts.inspected += 1;
                if inspection.cache_hit {
                    counts.inspection_cache_hits += 1;
                }
            }
            match screened.verdict {
                Ok(()) => {
                    counts.accepted += 1;
                    candidates.push(screened.candidate);
                }
                Err(rejection) => counts.reject(rejection.kind()),
            }
        }

        reporter.on_inspect_complete(
            counts.accepted,
            counts.rejected_total(),
            start.elapsed().as_secs_f64(),
        );
        candidates
    }

    fn screen(&self, file: &Arc<FileRecord>, store: Option<&MetadataStore>) -> Option<Screened> {
        let fingerprint = match file.fingerprint() {
            Ok(fp) => fp.clone(),
            Err(e) => {
                warn!(path = %file.path().display(), error = %e, "**- fingerprint failed");
                return None;
            }
        };

        let Some(store) = store else {
            return Some(Screened {
                candidate: Candidate {
                    file: Arc::clone(file),
                    fingerprint,
                    info: None,
                },
                inspection: None,
                verdict: Ok(()),
            });
        };

        let inspection = store.load(file, &fingerprint, self.config.constraints.wants_fonts());
        let verdict = filter::accept(&inspection.metadata, &self.config.constraints);
        match &verdict {
            Ok(()) => info!("{} {} {}", fingerprint.short(), inspection.metadata, file.display_name()),
            Err(rejection) => info!(
                "{} {} {}: {}",
                rejection.kind().marker(),
                fingerprint.short(),
                file.display_name(),
                rejection
            ),
        }

        Some(Screened {
            candidate: Candidate {
                file: Arc::clone(file),
                fingerprint,
                info: inspection.metadata.info().cloned(),
            },
            inspection: Some(inspection),
            verdict,
        })
    }

    /// Make sure every (converter, candidate) pair has an artifact. Returns,
    /// per candidate, the artifact path of each converter when one exists.
    fn convert_all(
        &self,
        candidates: &[Candidate],
        counts: &mut StageCounts,
        reporter: &dyn ProgressReporter,
    ) -> Vec<Vec<Option<PathBuf>>> {
        let cache = ConversionCache::new(&self.config.results_dir);
        let jobs: Vec<(usize, usize)> = (0..candidates.len())
            .flat_map(|f| (0..self.converters.len()).map(move |c| (f, c)))
            .collect();
        info!(
            "Converting {} files with {} tools...",
            candidates.len(),
            self.converters.len()
        );
        let start = Instant::now();
        let total = jobs.len();
        let done = AtomicUsize::new(0);
        reporter.on_convert_start(total);

        let outcomes: Vec<Result<EnsureOutcome, ConversionError>> = jobs
            .par_iter()
            .map(|&(f, c)| {
                let candidate = &candidates[f];
                let converter = &self.converters[c];
                let outcome =
                    cache.ensure(converter.as_ref(), candidate.file.path(), &candidate.fingerprint);
                if let Err(e) = &outcome {
                    warn!(
                        converter = converter.name(),
                        path = %candidate.file.path().display(),
                        error = %e,
                        "**- conversion failed"
                    );
                }
                reporter.on_convert_progress(done.fetch_add(1, Ordering::Relaxed) + 1, total);
                outcome
            })
            .collect();

        for converter in &self.converters {
            counts.converter(converter.name());
        }
        let mut artifacts = vec![vec![None; self.converters.len()]; candidates.len()];
        let (mut converted, mut cached, mut failed) = (0, 0, 0);
        for (&(f, c), outcome) in jobs.iter().zip(outcomes) {
            let stats = counts.converter(self.converters[c].name());
            match outcome {
                Ok(EnsureOutcome::Converted(path)) => {
                    stats.converted += 1;
                    converted += 1;
                    artifacts[f][c] = Some(path);
                }
                Ok(EnsureOutcome::Cached(path)) => {
                    stats.cached += 1;
                    cached += 1;
                    artifacts[f][c] = Some(path);
                }
                Err(e) if e.is_timeout() => {
                    stats.timed_out += 1;
                    failed += 1;
                }
                Err(_) => {
                    stats.failed += 1;
                    failed += 1;
                }
            }
        }

        reporter.on_convert_complete(converted, cached, failed, start.elapsed().as_secs_f64());
        artifacts
    }

    fn score_all(
        &self,
        candidates: &[Candidate],
        artifacts: &[Vec<Option<PathBuf>>],
        counts: &mut StageCounts,
        reporter: &dyn ProgressReporter,
    ) -> Vec<ScoreRecord> {
        let mut ready: Vec<(&Candidate, &Path, &Path)> = Vec::new();
        for (candidate, paths) in candidates.iter().zip(artifacts) {
            match paths.as_slice() {
                [Some(first), Some(second)] => {
                    ready.push((candidate, first.as_path(), second.as_path()))
                }
                _ => {
                    debug!("Missing artifacts for {}", candidate.file.path().display());
                    counts.missing_artifacts += 1;
                }
            }
        }

        info!("Scoring {} files...", ready.len());
        let start = Instant::now();
        let total = ready.len();
        let done = AtomicUsize::new(0);
        reporter.on_score_start(total);

        let results: Vec<Result<ScoreRecord, Unscored>> = ready
            .par_iter()
            .map(|&(candidate, first, second)| {
                let result = self.score(candidate, first, second);
                reporter.on_score_progress(done.fetch_add(1, Ordering::Relaxed) + 1, total);
                result
            })
            .collect();

        let mut scores = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(score) => scores.push(score),
                Err(Unscored::Unreadable) => counts.missing_artifacts += 1,
                Err(Unscored::Undecodable) => counts.decode_failures += 1,
                Err(Unscored::TooShort) => counts.too_short += 1,
            }
        }
        counts.scored = scores.len();

        reporter.on_score_complete(scores.len(), start.elapsed().as_secs_f64());
        scores
    }

    fn score(&self, candidate: &Candidate, first: &Path, second: &Path) -> Result<ScoreRecord, Unscored> {
        let first_bytes = read_artifact(first)?;
        let second_bytes = read_artifact(second)?;
        let tokenizer = self.tokenizer();
        let (first_tokens, second_tokens) =
            match (tokenizer.tokenize_bytes(&first_bytes), tokenizer.tokenize_bytes(&second_bytes)) {
                (Ok(a), Ok(b)) => (a, b),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(
                        path = %candidate.file.path().display(),
                        error = %e,
                        "**- artifact could not be decoded"
                    );
                    return Err(Unscored::Undecodable);
                }
            };

        // Both sides decoded, so the lossy view only counts characters.
        let chars = String::from_utf8_lossy(&first_bytes).chars().count()
            + String::from_utf8_lossy(&second_bytes).chars().count();
        if chars < self.config.min_text_chars {
            debug!(
                "**- {} has only {} characters of text",
                candidate.file.display_name(),
                chars
            );
            return Err(Unscored::TooShort);
        }

        let comparison = similarity::compare(&first_tokens, &second_tokens);

        let name = candidate.file.display_name();
        info!(
            "{} {:.3} {:.3} {:.3} {}",
            candidate.fingerprint.short(),
            comparison.jaccard[0],
            comparison.jaccard[1],
            comparison.jaccard[2],
            name
        );

        Ok(ScoreRecord {
            name,
            path: candidate.file.path().to_path_buf(),
            fingerprint: candidate.fingerprint.clone(),
            jaccard: comparison.jaccard,
            token_counts: [comparison.len_first, comparison.len_second],
            only_in_first: comparison.only_in_first,
            only_in_second: comparison.only_in_second,
            metadata: candidate.info.clone(),
        })
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, Unscored> {
    fs::read(path).map_err(|e| {
        warn!(path = %path.display(), error = %e, "**- error reading artifact");
        Unscored::Unreadable
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl ExternalConverter for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn convert(&self, _source: &Path, _output: &Path) -> Result<(), ConversionError> {
            Ok(())
        }
    }

    #[test]
    fn test_injected_converters_are_validated() {
        let engine = BenchEngine::new(AppConfig::default())
            .with_converters(vec![Arc::new(Named("same")), Arc::new(Named("same"))]);
        assert!(matches!(engine.validate(), Err(Error::InvalidConfig(_))));

        let engine = BenchEngine::new(AppConfig::default())
            .with_converters(vec![Arc::new(Named("only"))]);
        assert!(engine.validate().is_err());

        let engine = BenchEngine::new(AppConfig::default())
            .with_converters(vec![Arc::new(Named("a")), Arc::new(Named("b"))]);
        assert!(engine.validate().is_ok());
    }

    #[test]
    fn test_default_collaborators_follow_config() {
        let mut config = AppConfig::default();
        config.inspector = None;
        let engine = BenchEngine::new(config);
        assert_eq!(engine.converters.len(), 2);
        assert_eq!(engine.converters[0].name(), "poppler");
        assert!(engine.inspector.is_none());
        assert!(engine.font_inspector.is_none());
    }
}
