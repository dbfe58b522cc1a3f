use thiserror::Error;

/// Errors that abort a whole run. Per-file failures never surface here; they
/// are logged and counted by the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid path pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Error expanding path pattern: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("Error walking directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Report error: {0}")]
    Csv(#[from] csv::Error),
}
