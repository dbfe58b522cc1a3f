mod commands;
mod logging;
mod progress;
mod render;

use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, RunArgs};
use dotenv::dotenv;
use extract_bench_core::config::{load_configuration, AppConfig};
use extract_bench_core::BenchEngine;
use progress::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    if let Err(err) = dispatch(args) {
        error!("{:#}", err);
        process::exit(1);
    }
}

fn dispatch(args: Cli) -> anyhow::Result<()> {
    let mut config =
        load_configuration(args.config.as_deref()).context("Error loading configuration")?;
    if let Some(dir) = &args.run.results_dir {
        config.results_dir = dir.clone();
    }
    if let Some(jobs) = args.run.jobs {
        config.concurrency = jobs;
    }

    match args.command {
        Some(Commands::Dedupe {
            patterns,
            quarantine,
        }) => {
            config.stages.quarantine |= quarantine;
            run_dedupe(config, &patterns)
        }
        Some(Commands::PrintConfig) => {
            let text = config.to_toml().context("Error printing configuration")?;
            println!("{}", text);
            Ok(())
        }
        None if args.run.patterns.is_empty() => {
            Cli::command().print_long_help()?;
            Ok(())
        }
        None => run_bench(config, args.run),
    }
}

fn run_dedupe(config: AppConfig, patterns: &[String]) -> anyhow::Result<()> {
    let engine = BenchEngine::new(config);
    let reporter = CliReporter::new();
    let result = engine.dedupe(patterns, &reporter)?;

    info!(
        "Scan: {}, Hash: {}",
        format!("{:.2}s", result.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.hash_duration.as_secs_f64()).green(),
    );
    render::print_dedupe(&result);
    Ok(())
}

fn run_bench(config: AppConfig, args: RunArgs) -> anyhow::Result<()> {
    let engine = BenchEngine::new(config);
    let reporter = CliReporter::new();
    let report = engine.run(&args.patterns, &reporter)?;

    render::print_report(&report);
    if let Some(path) = args.csv {
        report
            .write_csv(&path)
            .with_context(|| format!("Error writing {}", path.display()))?;
        info!("Scores written to {}", path.display());
    }
    Ok(())
}
