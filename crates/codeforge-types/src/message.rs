//! Conversation messages and the request/response shapes of the backend calls

use super::{Artifact, ModelProvider};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One conversation entry. Only assistant messages carry an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            artifact: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, artifact: Option<Artifact>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            artifact,
            created_at: Utc::now(),
        }
    }

    /// Prose preceding the artifact markup, if the model inlined one
    pub fn prose(&self) -> &str {
        match self.content.find("<artifact") {
            Some(start) => self.content[..start].trim(),
            None => self.content.trim(),
        }
    }

    pub fn to_history(&self) -> HistoryEntry {
        HistoryEntry {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Conversation history entry sent with a generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// `POST /api/generate` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub model_provider: ModelProvider,
}

/// `POST /api/generate` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub artifact: Option<Artifact>,
}

/// `POST /api/execute` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub session_id: String,
    pub actions: Vec<super::Action>,
}

/// Status carried by a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Executing,
    /// Still executing, blocked on a dependent service coming up
    WaitingForServer,
    Completed,
    #[serde(other)]
    Unknown,
}

/// Per-action result reported with a `completed` progress event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            status: "completed".to_string(),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: "failed".to_string(),
            error: Some(error.into()),
            warning: None,
        }
    }

    /// Only an explicit `failed` status marks the action failed
    pub fn is_failure(&self) -> bool {
        self.status == "failed"
    }
}

/// One event of the execution progress stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    Progress {
        action_index: usize,
        status: ProgressStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<ActionResult>,
    },
    Complete {
        #[serde(default, alias = "previewEndpoint")]
        preview_url: Option<String>,
    },
    Error {
        #[serde(default)]
        message: String,
    },
}

impl ExecutionEvent {
    /// Event `type` tags this client understands
    pub const KNOWN_TYPES: &'static [&'static str] = &["progress", "complete", "error"];

    pub fn progress(action_index: usize, status: ProgressStatus) -> Self {
        ExecutionEvent::Progress {
            action_index,
            status,
            result: None,
        }
    }

    pub fn completed(action_index: usize, result: ActionResult) -> Self {
        ExecutionEvent::Progress {
            action_index,
            status: ProgressStatus::Completed,
            result: Some(result),
        }
    }
}

/// `POST /api/terminal` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalRequest {
    pub session_id: String,
    pub command: String,
}

/// `POST /api/terminal` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalResponse {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub exit_code: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_progress_event_with_result() {
        let event: ExecutionEvent = serde_json::from_str(
            r#"{"type":"progress","action_index":1,"status":"completed","result":{"type":"shell","command":"npm i","status":"failed","error":"exit 1"}}"#,
        )
        .unwrap();

        match event {
            ExecutionEvent::Progress {
                action_index,
                status,
                result: Some(result),
            } => {
                assert_eq!(action_index, 1);
                assert_eq!(status, ProgressStatus::Completed);
                assert!(result.is_failure());
                assert_eq!(result.error.as_deref(), Some("exit 1"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unrecognised_progress_status_is_unknown() {
        let event: ExecutionEvent =
            serde_json::from_str(r#"{"type":"progress","action_index":0,"status":"queued"}"#)
                .unwrap();
        assert_eq!(event, ExecutionEvent::progress(0, ProgressStatus::Unknown));
    }

    #[test]
    fn test_timeout_result_is_not_a_failure() {
        let result: ActionResult = serde_json::from_str(r#"{"status":"timeout"}"#).unwrap();
        assert!(!result.is_failure());
    }

    #[test]
    fn test_complete_with_null_preview() {
        let event: ExecutionEvent =
            serde_json::from_str(r#"{"type":"complete","preview_url":null}"#).unwrap();
        assert_eq!(event, ExecutionEvent::Complete { preview_url: None });
    }

    #[test]
    fn test_message_prose_strips_artifact_markup() {
        let message = Message::assistant(
            "Here is your page.\n\n<artifact id=\"a\" title=\"t\"><action type=\"shell\">ls</action></artifact>",
            None,
        );
        assert_eq!(message.prose(), "Here is your page.");
        assert_eq!(Message::user("  hi  ").prose(), "hi");
    }

    #[test]
    fn test_generate_request_wire_names() {
        let request = GenerateRequest {
            prompt: "build a todo app".to_string(),
            conversation_history: vec![Message::user("hello").to_history()],
            model_provider: ModelProvider::Claude,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model_provider"], "claude");
        assert_eq!(value["conversation_history"][0]["role"], "user");
        assert_eq!(value["conversation_history"][0]["content"], "hello");
    }
}
