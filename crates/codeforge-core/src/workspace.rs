//! Workspace view folded from the conversation
//!
//! The snapshot maps each path to the content most recently *requested* for
//! it, in conversation order, whether or not that request ever executed
//! successfully. The tree is a projection of the snapshot and is rebuilt from
//! scratch on every change.

use codeforge_types::Message;
use std::collections::BTreeMap;
use tracing::debug;

/// Latest requested content of one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFile {
    pub path: String,
    pub content: String,
    /// Index of the message whose artifact wrote it last
    pub message_index: usize,
    /// Declaration order across the whole conversation
    pub seq: usize,
}

/// Path -> latest content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceSnapshot {
    files: BTreeMap<String, WorkspaceFile>,
}

impl WorkspaceSnapshot {
    pub fn get(&self, path: &str) -> Option<&WorkspaceFile> {
        self.files
            .get(path)
            .or_else(|| self.files.get(&normalize_path(path)?))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths in lexicographic order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn files(&self) -> impl Iterator<Item = &WorkspaceFile> {
        self.files.values()
    }
}

/// Node of the derived file tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileNode {
    Folder {
        name: String,
        path: String,
        children: Vec<FileNode>,
    },
    File {
        name: String,
        path: String,
    },
}

impl FileNode {
    pub fn name(&self) -> &str {
        match self {
            FileNode::Folder { name, .. } | FileNode::File { name, .. } => name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            FileNode::Folder { path, .. } | FileNode::File { path, .. } => path,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, FileNode::Folder { .. })
    }

    pub fn children(&self) -> &[FileNode] {
        match self {
            FileNode::Folder { children, .. } => children,
            FileNode::File { .. } => &[],
        }
    }
}

/// Forest of folders and files; every sibling list has folders first, then
/// files, each group ordered by name (byte-wise, case-sensitive)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTree {
    pub roots: Vec<FileNode>,
}

impl FileTree {
    /// Build the tree from a snapshot.
    ///
    /// Entries are placed in declaration order. When a file and a folder
    /// claim the same name at one level, the entry declared later takes the
    /// slot and the earlier one is dropped from the tree (it stays in the
    /// snapshot).
    pub fn from_snapshot(snapshot: &WorkspaceSnapshot) -> Self {
        let mut entries: Vec<&WorkspaceFile> = snapshot.files().collect();
        entries.sort_by_key(|file| file.seq);

        let mut root = BTreeMap::new();
        for file in entries {
            let segments: Vec<&str> = file.path.split('/').collect();
            insert(&mut root, &segments, &file.path);
        }

        Self {
            roots: into_nodes(root, ""),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first walk yielding `(depth, node)`
    pub fn walk(&self) -> Vec<(usize, &FileNode)> {
        fn visit<'a>(nodes: &'a [FileNode], depth: usize, out: &mut Vec<(usize, &'a FileNode)>) {
            for node in nodes {
                out.push((depth, node));
                visit(node.children(), depth + 1, out);
            }
        }

        let mut out = Vec::new();
        visit(&self.roots, 0, &mut out);
        out
    }
}

enum Slot {
    Folder(BTreeMap<String, Slot>),
    File(String),
}

fn insert(level: &mut BTreeMap<String, Slot>, segments: &[&str], path: &str) {
    match segments {
        [] => {}
        [leaf] => {
            level.insert(leaf.to_string(), Slot::File(path.to_string()));
        }
        [folder, rest @ ..] => {
            let slot = level
                .entry(folder.to_string())
                .or_insert_with(|| Slot::Folder(BTreeMap::new()));
            if let Slot::File(previous) = &*slot {
                debug!("Folder {} replaces file {} in tree", folder, previous);
                *slot = Slot::Folder(BTreeMap::new());
            }
            if let Slot::Folder(children) = slot {
                insert(children, rest, path);
            }
        }
    }
}

fn into_nodes(level: BTreeMap<String, Slot>, parent: &str) -> Vec<FileNode> {
    let mut nodes: Vec<FileNode> = level
        .into_iter()
        .map(|(name, slot)| match slot {
            Slot::Folder(children) => {
                let path = if parent.is_empty() {
                    name.clone()
                } else {
                    format!("{}/{}", parent, name)
                };
                FileNode::Folder {
                    children: into_nodes(children, &path),
                    name,
                    path,
                }
            }
            Slot::File(path) => FileNode::File { name, path },
        })
        .collect();
    // BTreeMap already yields names in order; the stable sort only moves folders up
    nodes.sort_by_key(|node| !node.is_folder());
    nodes
}

/// Strip empty and `.` segments. `None` when nothing is left.
pub fn normalize_path(path: &str) -> Option<String> {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Snapshot plus the tree derived from it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceView {
    pub snapshot: WorkspaceSnapshot,
    pub tree: FileTree,
}

/// Folds the file actions of every message into a [`WorkspaceView`]
pub struct WorkspaceAggregator;

impl WorkspaceAggregator {
    pub fn aggregate(messages: &[Message]) -> WorkspaceView {
        let snapshot = Self::snapshot(messages);
        let tree = FileTree::from_snapshot(&snapshot);
        WorkspaceView { snapshot, tree }
    }

    pub fn snapshot(messages: &[Message]) -> WorkspaceSnapshot {
        let mut files = BTreeMap::new();
        let mut seq = 0;

        for (message_index, message) in messages.iter().enumerate() {
            let Some(artifact) = &message.artifact else {
                continue;
            };
            for (_, path, content) in artifact.file_actions() {
                let Some(path) = normalize_path(path) else {
                    debug!("Skipping file action with empty path in message {}", message_index);
                    continue;
                };
                files.insert(
                    path.clone(),
                    WorkspaceFile {
                        path,
                        content: content.to_string(),
                        message_index,
                        seq,
                    },
                );
                seq += 1;
            }
        }

        WorkspaceSnapshot { files }
    }
}
