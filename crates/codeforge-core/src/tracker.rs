//! Per-action execution status for the artifact currently being run
//!
//! Pure state machine, no I/O. Each action index is in exactly one state;
//! an index with no entry is pending:
//!
//! ```text
//! Pending -> Executing (waiting?) -> Completed | Failed
//! ```
//!
//! Completed and Failed are sticky for the lifetime of the artifact, so a
//! re-run never regresses a step that already finished.

use codeforge_types::{Action, ActionResult, Artifact, ProgressStatus};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Identifies one submitted run; bumped by every [`ActionStateTracker::begin_run`]
pub type RunGeneration = u64;

/// Status of one action index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionState {
    Pending,
    /// `waiting` marks the "blocked on a dependent service" sub-state
    Executing { waiting: bool },
    Completed,
    Failed { error: Option<String> },
}

impl ActionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionState::Completed | ActionState::Failed { .. })
    }

    pub fn is_executing(&self) -> bool {
        matches!(self, ActionState::Executing { .. })
    }
}

/// Label for a file action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileVerb {
    Create,
    Update,
}

impl std::fmt::Display for FileVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileVerb::Create => write!(f, "Create"),
            FileVerb::Update => write!(f, "Update"),
        }
    }
}

/// Why an update was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    /// From a superseded or already finished run
    StaleRun,
    /// Index does not belong to the current artifact
    UnknownIndex,
    /// Index already completed or failed
    Terminal,
    UnknownStatus,
}

/// Outcome of [`ActionStateTracker::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    NoChange,
    Ignored(Ignored),
}

/// Counts per state across the current artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pending: usize,
    pub executing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn of(states: &[ActionState]) -> Self {
        let mut summary = RunSummary::default();
        for state in states {
            match state {
                ActionState::Pending => summary.pending += 1,
                ActionState::Executing { .. } => summary.executing += 1,
                ActionState::Completed => summary.completed += 1,
                ActionState::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Default)]
pub struct ActionStateTracker {
    artifact: Option<Arc<Artifact>>,
    states: BTreeMap<usize, ActionState>,
    known_paths: BTreeSet<String>,
    generation: RunGeneration,
    running: bool,
}

impl ActionStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a new run of `artifact`.
    ///
    /// Clears executing entries. Completed/failed entries survive when
    /// `artifact` is the very instance already tracked and are reset for any
    /// other one. Ids are chosen by the model and reused across turns, so
    /// they do not identify a turn.
    pub fn begin_run(&mut self, artifact: Arc<Artifact>) -> RunGeneration {
        let same_artifact = self.tracks(&artifact);

        if same_artifact {
            self.states.retain(|_, state| state.is_terminal());
        } else {
            self.states.clear();
        }

        self.generation += 1;
        self.running = true;
        debug!(
            "Run {} begins for artifact {} ({} actions, resumed: {})",
            self.generation,
            artifact.id,
            artifact.len(),
            same_artifact
        );
        self.artifact = Some(artifact);
        self.generation
    }

    /// Apply one progress update belonging to run `generation`
    pub fn apply(
        &mut self,
        generation: RunGeneration,
        action_index: usize,
        status: ProgressStatus,
        result: Option<&ActionResult>,
    ) -> Applied {
        if !self.is_current(generation) {
            return Applied::Ignored(Ignored::StaleRun);
        }

        let action = match self.artifact.as_ref().and_then(|a| a.action(action_index)) {
            Some(action) => action.clone(),
            None => return Applied::Ignored(Ignored::UnknownIndex),
        };

        let current = self.state(action_index);
        if current.is_terminal() {
            return Applied::Ignored(Ignored::Terminal);
        }

        let next = match status {
            ProgressStatus::Executing => ActionState::Executing { waiting: false },
            ProgressStatus::WaitingForServer => ActionState::Executing { waiting: true },
            ProgressStatus::Completed => match result {
                Some(result) if result.is_failure() => {
                    warn!(
                        "Action {} failed: {}",
                        action_index,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                    ActionState::Failed {
                        error: result.error.clone(),
                    }
                }
                _ => {
                    if let Action::File { path, .. } = &action {
                        self.known_paths.insert(path.clone());
                    }
                    ActionState::Completed
                }
            },
            ProgressStatus::Unknown => return Applied::Ignored(Ignored::UnknownStatus),
        };

        if next == current {
            return Applied::NoChange;
        }
        self.states.insert(action_index, next);
        Applied::Updated
    }

    /// End run `generation`: nothing stays executing. No-op for a stale run.
    pub fn finish_run(&mut self, generation: RunGeneration) -> bool {
        if generation != self.generation || !self.running {
            return false;
        }
        self.states.retain(|_, state| !state.is_executing());
        self.running = false;
        true
    }

    /// Whether `generation` is the run currently being tracked
    pub fn is_current(&self, generation: RunGeneration) -> bool {
        self.running && generation == self.generation
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn generation(&self) -> RunGeneration {
        self.generation
    }

    pub fn artifact(&self) -> Option<&Arc<Artifact>> {
        self.artifact.as_ref()
    }

    /// Whether `artifact` is the instance the tracked states belong to
    pub fn tracks(&self, artifact: &Arc<Artifact>) -> bool {
        self.artifact
            .as_ref()
            .map_or(false, |current| Arc::ptr_eq(current, artifact))
    }

    pub fn state(&self, action_index: usize) -> ActionState {
        self.states
            .get(&action_index)
            .cloned()
            .unwrap_or(ActionState::Pending)
    }

    /// State of every action of the current artifact, in artifact order
    pub fn states(&self) -> Vec<ActionState> {
        let len = self.artifact.as_ref().map(|a| a.len()).unwrap_or(0);
        (0..len).map(|index| self.state(index)).collect()
    }

    pub fn executing(&self) -> BTreeSet<usize> {
        self.indices_where(ActionState::is_executing)
    }

    pub fn completed(&self) -> BTreeSet<usize> {
        self.indices_where(|state| matches!(state, ActionState::Completed))
    }

    pub fn failed(&self) -> BTreeSet<usize> {
        self.indices_where(|state| matches!(state, ActionState::Failed { .. }))
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::of(&self.states())
    }

    /// `Update` once any run has successfully written `path`, `Create` before
    pub fn file_verb(&self, path: &str) -> FileVerb {
        if self.known_paths.contains(path) {
            FileVerb::Update
        } else {
            FileVerb::Create
        }
    }

    fn indices_where(&self, predicate: impl Fn(&ActionState) -> bool) -> BTreeSet<usize> {
        self.states
            .iter()
            .filter(|(_, state)| predicate(state))
            .map(|(index, _)| *index)
            .collect()
    }
}
