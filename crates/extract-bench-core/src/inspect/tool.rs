use super::{FontInspector, InspectError, MetadataInspector};
use crate::config::ToolSpec;
use crate::tools::ToolCommand;
use std::path::Path;
use std::time::Duration;

/// Runs `<tool> <source-path>` and hands back its stdout. A non-zero exit
/// means the tool rejected the document.
#[derive(Debug, Clone)]
pub struct ToolInspector {
    command: ToolCommand,
    timeout: Duration,
}

impl ToolInspector {
    pub fn new(spec: &ToolSpec, timeout: Duration) -> Self {
        Self {
            command: ToolCommand::new(spec.program.clone(), spec.args.clone()),
            timeout,
        }
    }
}

impl MetadataInspector for ToolInspector {
    fn inspect(&self, path: &Path) -> Result<String, InspectError> {
        run_report(&self.command, path, self.timeout)
    }
}

#[derive(Debug, Clone)]
pub struct ToolFontInspector {
    command: ToolCommand,
    timeout: Duration,
}

impl ToolFontInspector {
    pub fn new(spec: &ToolSpec, timeout: Duration) -> Self {
        Self {
            command: ToolCommand::new(spec.program.clone(), spec.args.clone()),
            timeout,
        }
    }
}

impl FontInspector for ToolFontInspector {
    fn fonts(&self, path: &Path) -> Result<String, InspectError> {
        run_report(&self.command, path, self.timeout)
    }
}

fn run_report(command: &ToolCommand, path: &Path, timeout: Duration) -> Result<String, InspectError> {
    let output = command.run(path, None, timeout)?;
    if !output.status.success() {
        return Err(InspectError::Failed(output.status.to_string()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
