use std::ffi::OsString;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("'{program}' could not be started: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("IO error talking to '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
}

/// An external program plus an argument template. `{input}` and `{output}`
/// in the arguments are replaced per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn render_args(&self, input: &Path, output: Option<&Path>) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| render_arg(arg, input, output))
            .collect()
    }

    /// Run the tool to completion, capturing stdout. The process is killed if
    /// it outlives `timeout`.
    pub fn run(
        &self,
        input: &Path,
        output: Option<&Path>,
        timeout: Duration,
    ) -> Result<ToolOutput, ToolError> {
        let args = self.render_args(input, output);
        trace!("Running {} {:?}", self.program, args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Drain stdout on a separate thread so a chatty tool cannot block on a full pipe.
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                stdout.read_to_end(&mut buf).map(|_| buf)
            })
        });

        let status = match wait_with_timeout(&mut child, timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                debug!("Killed '{}' after {:?}", self.program, timeout);
                return Err(ToolError::Timeout {
                    program: self.program.clone(),
                    timeout,
                });
            }
            Err(source) => {
                let _ = child.kill();
                return Err(ToolError::Io {
                    program: self.program.clone(),
                    source,
                });
            }
        };

        let stdout = match reader {
            Some(handle) => match handle.join() {
                Ok(result) => result.map_err(|source| ToolError::Io {
                    program: self.program.clone(),
                    source,
                })?,
                Err(_) => Vec::new(),
            },
            None => Vec::new(),
        };

        Ok(ToolOutput { status, stdout })
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Substitute placeholders without a round trip through `str`, so paths that
/// are not valid UTF-8 reach the tool unchanged. `{output}` stays literal when
/// there is no output path.
fn render_arg(template: &str, input: &Path, output: Option<&Path>) -> OsString {
    let mut arg = OsString::new();
    let mut rest = template;
    loop {
        let next = [("{input}", Some(input)), ("{output}", output)]
            .into_iter()
            .filter_map(|(token, path)| Some((rest.find(token)?, token, path?)))
            .min_by_key(|&(at, _, _)| at);
        match next {
            Some((at, token, path)) => {
                arg.push(&rest[..at]);
                arg.push(path.as_os_str());
                rest = &rest[at + token.len()..];
            }
            None => {
                arg.push(rest);
                return arg;
            }
        }
    }
}
