//! Terminal rendering of session state

use codeforge_core::{ActionState, FileTree, FileVerb, RunSummary, SessionContext};
use codeforge_types::{Action, LineKind, TerminalLine};
use colored::{ColoredString, Colorize};

pub fn marker(state: &ActionState) -> ColoredString {
    match state {
        ActionState::Pending => "○".dimmed(),
        ActionState::Executing { waiting: false } => "…".yellow(),
        ActionState::Executing { waiting: true } => "…".yellow().dimmed(),
        ActionState::Completed => "✓".green(),
        ActionState::Failed { .. } => "✗".red(),
    }
}

/// `Create index.html`, `Update index.html` or `Run npm install`
pub fn action_label(action: &Action, verb: Option<FileVerb>) -> String {
    match action {
        Action::File { path, .. } => {
            format!("{} {}", verb.unwrap_or(FileVerb::Create), path)
        }
        Action::Shell { command } => format!("Run {}", command),
    }
}

/// One line per action of the current artifact
pub fn action_line(action: &Action, state: &ActionState, verb: Option<FileVerb>) -> String {
    let mut line = format!("  {} {}", marker(state), action_label(action, verb));
    match state {
        ActionState::Executing { waiting: true } => {
            line.push_str(&format!(" {}", "(waiting for server)".dimmed()));
        }
        ActionState::Failed { error: Some(error) } => {
            line.push_str(&format!(" {}", error.red()));
        }
        _ => {}
    }
    line
}

pub fn status_lines(ctx: &SessionContext) -> Vec<String> {
    let Some(artifact) = ctx.current_artifact() else {
        return vec!["No artifact yet".dimmed().to_string()];
    };

    let states = ctx.current_states();
    let mut lines = vec![format!("{}", display_title(&artifact.title).bold())];
    for (action, state) in artifact.actions.iter().zip(&states) {
        let verb = action.file_path().map(|path| ctx.tracker().file_verb(path));
        lines.push(action_line(action, state, verb));
    }

    let summary = RunSummary::of(&states);
    lines.push(
        format!(
            "  {} completed, {} failed, {} pending",
            summary.completed, summary.failed, summary.pending
        )
        .dimmed()
        .to_string(),
    );
    lines
}

fn display_title(title: &str) -> &str {
    if title.trim().is_empty() {
        "Untitled artifact"
    } else {
        title
    }
}

/// Indented listing, folders suffixed with `/`
pub fn tree_lines(tree: &FileTree) -> Vec<String> {
    tree.walk()
        .into_iter()
        .map(|(depth, node)| {
            let indent = "  ".repeat(depth);
            if node.is_folder() {
                format!("{}{}/", indent, node.name())
            } else {
                format!("{}{}", indent, node.name())
            }
        })
        .collect()
}

pub fn terminal_line(line: &TerminalLine) -> String {
    match line.kind {
        LineKind::Input => line.content.cyan().to_string(),
        LineKind::Output => line.content.trim_end_matches('\n').to_string(),
        LineKind::Error => line.content.trim_end_matches('\n').red().to_string(),
    }
}
