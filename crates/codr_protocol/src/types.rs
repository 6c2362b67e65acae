use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use codr_ids::JobId;

/// Supported source languages. A tagged variant plus a resolver function,
/// not a class hierarchy — see `Language::ALL` / `Language::parse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    C,
    Cpp,
    Rust,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::Javascript,
        Language::C,
        Language::Cpp,
        Language::Rust,
    ];

    /// The authoritative source for which languages the service accepts.
    pub fn get_supported_languages() -> &'static [Language] {
        &Self::ALL
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "python" | "py" => Some(Language::Python),
            "javascript" | "js" => Some(Language::Javascript),
            "c" => Some(Language::C),
            "cpp" | "c++" => Some(Language::Cpp),
            "rust" | "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    pub fn default_filename(&self) -> &'static str {
        match self {
            Language::Python => "main.py",
            Language::Javascript => "main.js",
            Language::C => "main.c",
            Language::Cpp => "main.cpp",
            Language::Rust => "main.rs",
        }
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self, Language::C | Language::Cpp | Language::Rust)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Rust => "rust",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-language resource policy. A data table, not a conditional buried in
/// the sandbox helper — JavaScript omits `address_space_bytes` because V8
/// needs more headroom than the rlimit applied to the other four.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    pub cpu_seconds: u64,
    pub wall_seconds: u64,
    pub address_space_bytes: Option<u64>,
    pub max_fsize_bytes: u64,
}

impl SandboxLimits {
    pub fn for_language(language: Language, execution_timeout_secs: u64, max_memory_mb: u64, max_file_size_mb: u64) -> Self {
        let address_space_bytes = match language {
            Language::Javascript => None,
            _ => Some(max_memory_mb * 1024 * 1024),
        };
        Self {
            cpu_seconds: execution_timeout_secs,
            wall_seconds: execution_timeout_secs,
            address_space_bytes,
            max_fsize_bytes: max_file_size_mb * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Whether `self -> next` is a legal status transition. Status only
    /// ever advances queued -> processing -> (completed|failed).
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub exit_code: i32,
    pub execution_time: f64,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn new(exit_code: i32, execution_time: f64, stdout: String, stderr: String) -> Self {
        Self {
            success: exit_code == 0,
            exit_code,
            execution_time,
            stdout,
            stderr,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub code: String,
    pub language: Language,
    pub filename: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<ExecutionResult>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(job_id: JobId, code: String, language: Language, filename: String) -> Self {
        Self {
            job_id,
            code,
            language,
            filename,
            status: JobStatus::Queued,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
        }
    }
}

/// Envelope pushed onto the FIFO work list. Ownership transfers from the
/// gateway to exactly one worker on pop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobQueueEntry {
    pub job_id: JobId,
    pub code: String,
    pub language: Language,
    pub filename: String,
    pub queued_at: DateTime<Utc>,
}

/// Frames the client sends to the gateway over `/ws/execute`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    Execute {
        job_id: JobId,
        job_token: String,
        code: String,
        language: Language,
    },
    Input {
        data: String,
    },
}

/// Frames the gateway sends to the client, and the shape every bus message
/// carries (`type` discriminator in {output, complete, error}).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Output { stream: String, data: String },
    Complete { exit_code: i32, execution_time: f64 },
    Error { message: String },
}

impl ServerFrame {
    pub fn output(data: String) -> Self {
        ServerFrame::Output {
            stream: "stdout".to_string(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_advances_only_forward() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
    }

    #[test]
    fn javascript_has_no_address_space_limit() {
        let limits = SandboxLimits::for_language(Language::Javascript, 7, 300, 1);
        assert!(limits.address_space_bytes.is_none());
        let limits = SandboxLimits::for_language(Language::Python, 7, 300, 1);
        assert_eq!(limits.address_space_bytes, Some(300 * 1024 * 1024));
    }

    #[test]
    fn client_frame_execute_round_trips() {
        let json = serde_json::json!({
            "type": "execute",
            "job_id": JobId::new().to_string(),
            "job_token": "tok",
            "code": "print(1)",
            "language": "python",
        });
        let frame: ClientFrame = serde_json::from_value(json).unwrap();
        assert!(matches!(frame, ClientFrame::Execute { .. }));
    }

    #[test]
    fn server_frame_complete_serializes_with_type_tag() {
        let frame = ServerFrame::Complete {
            exit_code: 0,
            execution_time: 0.42,
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "complete");
    }
}
