//! Terminal log types

use serde::{Deserialize, Serialize};

/// Sandbox home directory; the terminal starts here
pub const SANDBOX_HOME: &str = "/home/user";

/// Kind of a terminal log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Input,
    Output,
    Error,
}

/// One entry of the terminal log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalLine {
    pub kind: LineKind,
    pub content: String,
}

impl TerminalLine {
    pub fn input(content: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Input,
            content: content.into(),
        }
    }

    pub fn output(content: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Output,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Error,
            content: content.into(),
        }
    }
}

/// Render a sandbox path for the prompt, abbreviating the home directory to `~`
pub fn display_dir(cwd: &str) -> String {
    match cwd.strip_prefix(SANDBOX_HOME) {
        Some("") => "~".to_string(),
        Some(rest) if rest.starts_with('/') => format!("~{}", rest),
        _ => cwd.to_string(),
    }
}
