//! External tool execution.
//!
//! One child process per call, argv rendered from a configured template.
//! Non-zero exits become [`VfsError::Process`] carrying stderr. When a
//! timeout is configured the child is killed once it expires.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{VfsError, VfsResult};

/// Runs configured external tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    timeout: Option<Duration>,
}

impl ToolRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Run `template` with placeholders substituted, returning stdout.
    ///
    /// `stdin` is streamed to the child concurrently with reading its
    /// output, so large inputs cannot deadlock on a full pipe.
    #[tracing::instrument(skip(self, template, vars, stdin), fields(argv0 = template.first().map(String::as_str)))]
    pub async fn run(
        &self,
        tool: &str,
        template: &[String],
        vars: &[(&str, &str)],
        stdin: Option<Vec<u8>>,
    ) -> VfsResult<Vec<u8>> {
        let argv = render_argv(template, vars);
        let Some((program, args)) = argv.split_first() else {
            return Err(VfsError::collaborator(format!("{tool} is not configured")));
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| VfsError::Process {
            tool: tool.to_string(),
            status: "spawn".to_string(),
            stderr: format!("{program}: {e}"),
        })?;

        let writer = match (stdin, child.stdin.take()) {
            (Some(data), Some(mut pipe)) => Some(tokio::spawn(async move {
                // The tool may exit before draining stdin
                if let Err(e) = pipe.write_all(&data).await {
                    tracing::debug!("stdin closed early: {}", e);
                }
            })),
            _ => None,
        };

        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(tool, secs = limit.as_secs(), "external tool timed out");
                    if let Some(writer) = writer {
                        writer.abort();
                    }
                    return Err(VfsError::Timeout {
                        tool: tool.to_string(),
                        secs: limit.as_secs(),
                    });
                }
            },
            None => wait.await,
        }?;

        if let Some(writer) = writer {
            let _ = writer.await;
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(tool, status = %output.status, "external tool failed");
            return Err(VfsError::Process {
                tool: tool.to_string(),
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(output.stdout)
    }
}

/// Substitute `{name}` placeholders in every argument.
pub fn render_argv(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), value)
            })
        })
        .collect()
}
