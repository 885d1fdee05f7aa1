//! Tool runners for invoking the macOS binary editing tools.

use async_trait::async_trait;
use chrono::Utc;
use std::ffi::OsString;
use tokio::process::Command;
use tracing::{debug, warn};
use xcflat_common::{Error, Result};
use xcflat_schema::{AuditEntry, AuditLog, ToolNames};

use crate::tools::ToolCommand;

/// Captured result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Short description of a failed run, for reports.
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        match (self.exit_code, stderr.is_empty()) {
            (Some(code), true) => format!("exited with status {}", code),
            (Some(code), false) => format!("exited with status {}: {}", code, stderr),
            (None, true) => "terminated by signal".to_string(),
            (None, false) => format!("terminated by signal: {}", stderr),
        }
    }
}

/// Trait for running external tools.
///
/// Arguments are passed as a list; nothing goes through a shell.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `program` with `args` and wait for it to exit.
    async fn run(&self, program: &str, args: &[OsString]) -> Result<ToolOutput>;
}

/// Runs tools as local child processes.
pub struct LocalRunner;

impl LocalRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolRunner for LocalRunner {
    async fn run(&self, program: &str, args: &[OsString]) -> Result<ToolOutput> {
        debug!("Local exec: {} {:?}", program, args);

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::ToolSpawn {
                program: program.to_string(),
                reason: e.to_string(),
            })?;

        Ok(ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Run a command and record it in the audit log.
///
/// Spawn failures are recorded too, then returned to the caller.
pub async fn execute(
    runner: &dyn ToolRunner,
    audit: &mut AuditLog,
    command: &ToolCommand,
) -> Result<ToolOutput> {
    let started_at = Utc::now();
    let result = runner.run(&command.program, &command.args).await;
    let completed_at = Utc::now();
    let args: Vec<String> = command
        .args
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let entry = match &result {
        Ok(output) => AuditEntry::new(
            command.program.clone(),
            args.clone(),
            command.category,
            started_at,
            completed_at,
            output.exit_code,
            output.stdout.len() as u64,
            output.stderr.len() as u64,
            (!output.success()).then(|| output.failure_reason()),
        ),
        Err(e) => AuditEntry::new(
            command.program.clone(),
            args,
            command.category,
            started_at,
            completed_at,
            None,
            0,
            0,
            Some(e.to_string()),
        ),
    };
    audit.add(entry);

    result
}

/// Configured tools that cannot be found on `PATH`.
pub fn missing_tools(tools: &ToolNames) -> Vec<String> {
    tools
        .all()
        .into_iter()
        .filter(|name| {
            let found = which::which(name).is_ok();
            if !found {
                warn!("{} not found in PATH", name);
            }
            !found
        })
        .map(str::to_string)
        .collect()
}
