pub mod cache;

use crate::config::ConverterSpec;
use crate::tools::{ToolCommand, ToolError};
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub use cache::{ConversionCache, EnsureOutcome};

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("{converter} produced no output")]
    NoOutput { converter: String },

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ConversionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConversionError::Tool(ToolError::Timeout { .. }))
    }
}

/// A tool that turns a source document into a text file.
///
/// `convert` only reports whether the tool could be run. Whether it
/// succeeded is judged by the caller from the existence of `output`.
pub trait ExternalConverter: Send + Sync {
    fn name(&self) -> &str;
    fn convert(&self, source: &Path, output: &Path) -> Result<(), ConversionError>;
}

/// Converter backed by a command line, e.g. `pdftotext -enc UTF-8 {input} {output}`.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    name: String,
    command: ToolCommand,
    timeout: Duration,
}

impl CommandConverter {
    pub fn new(spec: &ConverterSpec, timeout: Duration) -> Self {
        Self {
            name: spec.name.clone(),
            command: ToolCommand::new(spec.program.clone(), spec.args.clone()),
            timeout,
        }
    }
}

impl ExternalConverter for CommandConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn convert(&self, source: &Path, output: &Path) -> Result<(), ConversionError> {
        let result = self.command.run(source, Some(output), self.timeout)?;
        // Exit status is not trusted either way; the output file decides.
        if !result.status.success() {
            debug!(
                "{} exited with {} for {}",
                self.name,
                result.status,
                source.display()
            );
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_command_converter_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.pdf");
        let output = dir.path().join("out.txt");
        fs::write(&source, b"words words").unwrap();

        let spec = ConverterSpec {
            name: "copy".to_string(),
            program: "cp".to_string(),
            args: vec!["{input}".to_string(), "{output}".to_string()],
        };
        let converter = CommandConverter::new(&spec, Duration::from_secs(10));
        converter.convert(&source, &output).unwrap();
        assert_eq!(converter.name(), "copy");
        assert_eq!(fs::read(&output).unwrap(), b"words words");
    }

    #[test]
    fn test_failing_tool_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ConverterSpec {
            name: "broken".to_string(),
            program: "false".to_string(),
            args: vec![],
        };
        let converter = CommandConverter::new(&spec, Duration::from_secs(10));
        let output = dir.path().join("out.txt");
        converter.convert(&dir.path().join("in.pdf"), &output).unwrap();
        assert!(!output.exists());
    }
}
