//! Scenarios backed by an external program

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use super::Scenario;
use crate::{Error, Result};

/// Default timeout for external programs
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a program and return its trimmed stdout
///
/// `input`, when given, is written to the program's stdin.
///
/// # Errors
///
/// Returns error if the program cannot be spawned, times out, or exits unsuccessfully
pub async fn run_program(
    argv: &[String],
    input: Option<&str>,
    run_timeout: Duration,
) -> Result<String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| Error::Config("empty program command".to_string()))?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::Scenario(format!("failed to spawn {program}: {e}")))?;

    let stdin = child.stdin.take();
    let run = async move {
        if let (Some(input), Some(mut stdin)) = (input, stdin) {
            // A program may exit without reading its input
            match stdin.write_all(input.as_bytes()).await {
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!(program, "program closed stdin early");
                }
                other => other?,
            }
            drop(stdin);
        }
        child.wait_with_output().await
    };

    let output = timeout(run_timeout, run)
        .await
        .map_err(|_| Error::Scenario(format!("{program} timed out after {run_timeout:?}")))?
        .map_err(|e| Error::Scenario(format!("{program} failed: {e}")))?;

    if !output.stderr.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(program, stderr = %stderr, "program stderr");
    }

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        return Err(Error::Scenario(format!("{program} exited with code {code}")));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Scenario whose result is the output of a program
#[derive(Debug, Clone)]
pub struct ExecScenario {
    name: String,
    feedback: String,
    argv: Vec<String>,
    timeout: Duration,
}

impl ExecScenario {
    /// Create a program-backed scenario
    ///
    /// # Errors
    ///
    /// Returns error if `argv` is empty
    pub fn new(
        name: impl Into<String>,
        feedback: impl Into<String>,
        argv: Vec<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let name = name.into();
        if argv.is_empty() {
            return Err(Error::Config(format!(
                "scenario {name}: exec command must not be empty"
            )));
        }

        Ok(Self {
            name,
            feedback: feedback.into(),
            argv,
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

#[async_trait]
impl Scenario for ExecScenario {
    fn name(&self) -> &str {
        &self.name
    }

    fn feedback_message(&self) -> String {
        self.feedback.clone()
    }

    async fn execute(&self) -> Result<String> {
        tracing::debug!(scenario = %self.name, argv = ?self.argv, "running scenario program");
        run_program(&self.argv, None, self.timeout).await
    }
}
