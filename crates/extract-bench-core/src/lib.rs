pub mod cache_file;
pub mod config;
pub mod convert;
pub mod dupes;
pub mod engine;
pub mod error;
pub mod filter;
pub mod hasher;
pub mod inspect;
pub mod model;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod similarity;
pub mod tokenize;
pub mod tools;

pub use config::AppConfig;
pub use engine::{BenchEngine, DedupeResult};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
pub use report::{Report, ScoreRecord, StageCounts};
