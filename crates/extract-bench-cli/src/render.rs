use colored::*;
use extract_bench_core::filter::RejectionKind;
use extract_bench_core::{DedupeResult, Report, ScoreRecord};

const SHOWN_TOKENS: usize = 10;

pub fn print_dedupe(result: &DedupeResult) {
    println!();
    for group in result.index.duplicate_groups() {
        let fingerprint = group.fingerprint().map(|f| f.short()).unwrap_or_default();
        println!(
            "{} {}",
            fingerprint.cyan(),
            group.representative.path().display().to_string().bold()
        );
        for duplicate in &group.duplicates {
            println!("           {}", duplicate.path().display().to_string().dimmed());
        }
    }
    println!(
        "{} files, {} duplicate groups, {} duplicates, {} bytes wasted",
        result.scan.files.len().to_string().green(),
        result.index.duplicate_groups().count().to_string().red(),
        result.index.duplicate_count().to_string().red(),
        result.wasted_bytes().to_string().red(),
    );
    if result.quarantine != Default::default() {
        println!(
            "Quarantine: {} moved, {} skipped, {} failed",
            result.quarantine.moved.to_string().green(),
            result.quarantine.skipped.to_string().yellow(),
            result.quarantine.failed.to_string().red(),
        );
    }
}

pub fn print_report(report: &Report) {
    print_counts(report);
    if report.scores.is_empty() {
        println!("{}", "No files were scored.".yellow());
        return;
    }
    print_differences(report);
    print_ranking(report);
    print_means(report);
}

fn print_counts(report: &Report) {
    let counts = &report.counts;
    println!();
    println!("{}", format!("Run started {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC")).bold());
    line("patterns", counts.patterns);
    line("paths matched", counts.paths_matched);
    line("unreadable paths", counts.unreadable);
    line("unique files", counts.files);
    line("distinct sizes", counts.distinct_sizes);
    line("fingerprints computed", counts.fingerprints_computed);
    line("hash failures", counts.hash_failures);
    line("duplicate groups", counts.duplicate_groups);
    line("duplicates", counts.duplicates);
    if counts.quarantine != Default::default() {
        line("quarantined", counts.quarantine.moved);
        line("quarantine skipped", counts.quarantine.skipped);
        line("quarantine failed", counts.quarantine.failed);
    }
    line("inspected", counts.inspected);
    line("inspection cache hits", counts.inspection_cache_hits);
    line("accepted", counts.accepted);
    for kind in RejectionKind::ALL {
        let rejected = counts.rejected.get(&kind).copied().unwrap_or(0);
        if rejected > 0 {
            line(&format!("{} {}", kind.marker(), kind), rejected);
        }
    }
    for (name, stats) in &counts.conversions {
        println!(
            "  {:<24} {} converted, {} cached, {} failed, {} timed out",
            name.cyan(),
            stats.converted,
            stats.cached,
            stats.failed,
            stats.timed_out
        );
    }
    line("missing artifacts", counts.missing_artifacts);
    line("decode failures", counts.decode_failures);
    line("too short", counts.too_short);
    line("scored", counts.scored);
}

fn line(label: &str, value: usize) {
    println!("  {:<24} {}", label, value);
}

fn print_differences(report: &Report) {
    let (first, second) = match report.converters.as_slice() {
        [first, second] => (first.as_str(), second.as_str()),
        _ => ("first", "second"),
    };
    println!();
    for (i, score) in report.scores.iter().enumerate() {
        println!(
            "{:4}: {} {} {}",
            i,
            jaccard(score),
            score.fingerprint.short().cyan(),
            score.name.bold()
        );
        println!(
            "      {:>10} {:5} tokens, unique: {}",
            first,
            score.token_counts[0],
            preview(&score.only_in_first)
        );
        println!(
            "      {:>10} {:5} tokens, unique: {}",
            second,
            score.token_counts[1],
            preview(&score.only_in_second)
        );
    }
}

fn print_ranking(report: &Report) {
    println!();
    println!("{}", "Ranking (most similar first)".bold());
    for (i, score) in report.ranked().iter().enumerate() {
        let detail = score
            .metadata
            .as_ref()
            .map(|info| format!("[{}] {:3} pages", info.version, info.pages))
            .unwrap_or_default();
        println!("{:4}: {} {:<18} {}", i, jaccard(score), detail, score.name);
    }
}

fn print_means(report: &Report) {
    let mean = report.mean_jaccard();
    println!();
    println!(
        "Mean Jaccard distance over {} files: n=1 {} n=2 {} n=3 {}",
        report.scores.len(),
        format!("{:.3}", mean[0]).green(),
        format!("{:.3}", mean[1]).green(),
        format!("{:.3}", mean[2]).green(),
    );
}

fn jaccard(score: &ScoreRecord) -> String {
    format!(
        "{:.3} {:.3} {:.3}",
        score.jaccard[0], score.jaccard[1], score.jaccard[2]
    )
}

fn preview(tokens: &[String]) -> String {
    let shown: Vec<&str> = tokens.iter().take(SHOWN_TOKENS).map(String::as_str).collect();
    let mut text = format!("{:?}", shown);
    if tokens.len() > SHOWN_TOKENS {
        text.push_str(&format!(" +{} more", tokens.len() - SHOWN_TOKENS));
    }
    text
}
