use crate::dupes::QuarantinePolicy;
use crate::error::Error;
use crate::filter::Constraints;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Directory name under `results_dir` that holds inspection reports.
pub const INFO_DIR_NAME: &str = "info";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub results_dir: PathBuf,
    pub duplicates_dir: PathBuf,
    /// Worker pool size. 0 uses one thread per CPU.
    pub concurrency: usize,
    pub tool_timeout_secs: u64,
    /// Minimum combined characters across all artifacts of a file before it is scored.
    pub min_text_chars: usize,
    pub max_size_mb: Option<f64>,
    pub max_files: Option<usize>,
    pub quarantine_policy: QuarantinePolicy,
    pub stages: Stages,
    pub constraints: Constraints,
    pub inspector: Option<ToolSpec>,
    pub font_inspector: Option<ToolSpec>,
    pub converters: Vec<ConverterSpec>,
}

/// Pipeline stages that can be switched on and off.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Stages {
    pub quarantine: bool,
    pub filter: bool,
    pub score: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub program: String,
    #[serde(default = "default_inspector_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterSpec {
    pub name: String,
    pub program: String,
    #[serde(default = "default_converter_args")]
    pub args: Vec<String>,
}

fn default_inspector_args() -> Vec<String> {
    vec!["{input}".to_string()]
}

fn default_converter_args() -> Vec<String> {
    vec!["{input}".to_string(), "{output}".to_string()]
}

impl Default for Stages {
    fn default() -> Self {
        Self {
            quarantine: false,
            filter: true,
            score: true,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            duplicates_dir: PathBuf::from("duplicates"),
            concurrency: 0,
            tool_timeout_secs: 300,
            min_text_chars: 100,
            max_size_mb: None,
            max_files: None,
            quarantine_policy: QuarantinePolicy::default(),
            stages: Stages::default(),
            constraints: Constraints::default(),
            inspector: Some(ToolSpec {
                program: "./pdf_info".to_string(),
                args: default_inspector_args(),
            }),
            font_inspector: None,
            converters: vec![
                ConverterSpec {
                    name: "poppler".to_string(),
                    program: "pdftotext".to_string(),
                    args: vec![
                        "-enc".to_string(),
                        "UTF-8".to_string(),
                        "{input}".to_string(),
                        "{output}".to_string(),
                    ],
                },
                ConverterSpec {
                    name: "unidoc".to_string(),
                    program: "./pdf_to_text".to_string(),
                    args: default_converter_args(),
                },
            ],
        }
    }
}

impl AppConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn info_dir(&self) -> PathBuf {
        self.results_dir.join(INFO_DIR_NAME)
    }

    /// The effective configuration in the same format as `ExtractBench.toml`.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        self.validate_with_font_inspector(self.font_inspector.is_some())
    }

    /// Like `validate`, with the font inspector supplied from elsewhere.
    pub(crate) fn validate_with_font_inspector(&self, has_font_inspector: bool) -> Result<(), Error> {
        if self.converters.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one converter must be configured".to_string(),
            ));
        }

        validate_converter_names(self.converters.iter().map(|c| c.name.as_str()))?;

        if self.stages.score && self.converters.len() != 2 {
            return Err(Error::InvalidConfig(format!(
                "scoring compares exactly two converters, {} configured",
                self.converters.len()
            )));
        }

        if let Some(max) = self.max_size_mb {
            if max.is_nan() || max < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "max_size_mb must be non-negative, got {}",
                    max
                )));
            }
        }

        if self.stages.filter && self.constraints.wants_fonts() && !has_font_inspector
        {
            return Err(Error::InvalidConfig(
                "reject_font_subtypes needs a font_inspector while the filter stage is on"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Converter names become directories under `results_dir`, next to `info/`.
pub(crate) fn validate_converter_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for name in names {
        if !is_plain_segment(name) {
            return Err(Error::InvalidConfig(format!(
                "converter name '{}' must be a plain directory name",
                name
            )));
        }
        if name == INFO_DIR_NAME {
            return Err(Error::InvalidConfig(format!(
                "converter name '{}' is reserved for inspection reports",
                INFO_DIR_NAME
            )));
        }
        if !seen.insert(name) {
            return Err(Error::InvalidConfig(format!(
                "converter '{}' is configured more than once",
                name
            )));
        }
    }
    Ok(())
}

fn is_plain_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.starts_with('.')
}

/// Load configuration from `ExtractBench.toml` (or `path`), then apply
/// `EXTRACT_BENCH_*` environment overrides, e.g. `EXTRACT_BENCH_RESULTS_DIR`.
pub fn load_configuration(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let file_source = match path {
        Some(path) => ConfigFile::with_name(path).required(true),
        None => ConfigFile::with_name("ExtractBench").required(false),
    };
    let builder = Config::builder()
        .add_source(file_source)
        .add_source(
            Environment::with_prefix("EXTRACT_BENCH")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
