//! Build actions and the artifacts that group them

use serde::{Deserialize, Deserializer, Serialize};

/// Action kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    File,
    Shell,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::File => write!(f, "file"),
            ActionKind::Shell => write!(f, "shell"),
        }
    }
}

/// One unit of work inside an artifact.
///
/// A file action carries the full replacement text for `path`; a shell action
/// carries the literal command run in the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    File {
        #[serde(rename = "filePath", alias = "filepath")]
        path: String,
        #[serde(default)]
        content: String,
    },
    Shell {
        #[serde(default)]
        command: String,
    },
}

impl Action {
    pub fn file(path: impl Into<String>, content: impl Into<String>) -> Self {
        Action::File {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn shell(command: impl Into<String>) -> Self {
        Action::Shell {
            command: command.into(),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::File { .. } => ActionKind::File,
            Action::Shell { .. } => ActionKind::Shell,
        }
    }

    /// Path written by a file action
    pub fn file_path(&self) -> Option<&str> {
        match self {
            Action::File { path, .. } => Some(path),
            Action::Shell { .. } => None,
        }
    }
}

/// Ordered, immutable plan of actions produced by one assistant turn.
///
/// The position of an action is both its execution order and the index used by
/// the progress protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default = "new_artifact_id", deserialize_with = "id_or_generated")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub title: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Artifact {
    pub fn new(id: impl Into<String>, title: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            actions,
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn action(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    /// File actions in artifact order as `(index, path, content)`
    pub fn file_actions(&self) -> impl Iterator<Item = (usize, &str, &str)> {
        self.actions
            .iter()
            .enumerate()
            .filter_map(|(index, action)| match action {
                Action::File { path, content } => Some((index, path.as_str(), content.as_str())),
                Action::Shell { .. } => None,
            })
    }
}

pub fn new_artifact_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn id_or_generated<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let id = Option::<String>::deserialize(deserializer)?;
    Ok(id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(new_artifact_id))
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
