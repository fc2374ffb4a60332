use super::DocumentExtractor;
use crate::error::{ManscopeError, Result};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::trace;

/// Renders man pages as plain text: `man <cmd> | col -b`.
pub struct ManPageExtractor {
    man_program: String,
    col_program: String,
}

impl ManPageExtractor {
    pub fn new() -> Self {
        Self {
            man_program: "man".to_string(),
            col_program: "col".to_string(),
        }
    }

    /// Overrides the programs used, mostly for environments with odd installs.
    pub fn with_programs(man_program: impl Into<String>, col_program: impl Into<String>) -> Self {
        Self {
            man_program: man_program.into(),
            col_program: col_program.into(),
        }
    }

    async fn render(&self, command: &str) -> Result<Vec<u8>> {
        let output = Command::new(&self.man_program)
            .arg(command)
            .env("MANPAGER", "cat")
            .env("PAGER", "cat")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_failure(&self.man_program, e))?;

        if !output.status.success() {
            return Err(tool_failure(command, output.status, &output.stderr));
        }
        Ok(output.stdout)
    }

    async fn strip_formatting(&self, command: &str, raw: Vec<u8>) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.col_program)
            .arg("-b")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_failure(&self.col_program, e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ManscopeError::Internal("col stdin was not captured".to_string()))?;
        // Feed stdin concurrently so a full stdout pipe cannot deadlock us.
        let feed = tokio::spawn(async move {
            let result = stdin.write_all(&raw).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| spawn_failure(&self.col_program, e))?;
        match feed.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ManscopeError::Extraction(format!("col -b: {e}"))),
            Err(e) => return Err(ManscopeError::Internal(e.to_string())),
        }

        if !output.status.success() {
            return Err(tool_failure(command, output.status, &output.stderr));
        }
        Ok(output.stdout)
    }
}

impl Default for ManPageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentExtractor for ManPageExtractor {
    async fn extract(&self, command: &str) -> Result<String> {
        let raw = self.render(command).await?;
        let plain = self.strip_formatting(command, raw).await?;
        trace!("Extracted {} bytes for {}", plain.len(), command);
        Ok(String::from_utf8_lossy(&plain).into_owned())
    }

    fn name(&self) -> &str {
        "man"
    }
}

fn spawn_failure(program: &str, e: std::io::Error) -> ManscopeError {
    ManscopeError::Extraction(format!("failed to run {program}: {e}"))
}

fn tool_failure(command: &str, status: ExitStatus, stderr: &[u8]) -> ManscopeError {
    let stderr = String::from_utf8_lossy(stderr);
    let detail = stderr.trim();
    if detail.is_empty() {
        ManscopeError::Extraction(format!("no manual entry for {command} ({status})"))
    } else {
        ManscopeError::Extraction(detail.to_string())
    }
}
