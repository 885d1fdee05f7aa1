//! Audit log of every external tool invocation made during a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a tool invocation was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Copy,
    Identity,
    Inspect,
    Dependency,
}

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Sequence number, assigned by the log.
    pub seq: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub program: String,
    pub args: Vec<String>,
    /// Exit code, `None` if the process was killed or never started.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout_bytes: u64,
    pub stderr_bytes: u64,
    /// Spawn error or captured stderr of a failed invocation.
    pub error: Option<String>,
    pub category: ToolCategory,
}

impl AuditEntry {
    /// Create a new audit entry.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        program: String,
        args: Vec<String>,
        category: ToolCategory,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        exit_code: Option<i32>,
        stdout_bytes: u64,
        stderr_bytes: u64,
        error: Option<String>,
    ) -> Self {
        let duration = completed_at - started_at;
        let duration_ms = duration.num_milliseconds().max(0) as u64;
        let success = exit_code.map(|c| c == 0).unwrap_or(false);

        Self {
            seq: 0,
            started_at,
            completed_at,
            duration_ms,
            program,
            args,
            exit_code,
            success,
            stdout_bytes,
            stderr_bytes,
            error,
            category,
        }
    }

    /// The invocation as a single display string.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Collection of audit entries (written as JSONL).
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
    next_seq: u64,
}

impl AuditLog {
    /// Create a new empty audit log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry to the audit log.
    pub fn add(&mut self, mut entry: AuditEntry) {
        entry.seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(entry);
    }

    /// Get all entries.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Entries whose tool did not exit with status 0.
    pub fn failures(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(|e| !e.success)
    }

    /// Convert to JSONL format.
    pub fn to_jsonl(&self) -> String {
        self.entries
            .iter()
            .filter_map(|e| serde_json::to_string(e).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
