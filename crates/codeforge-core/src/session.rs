//! Per-chat session state
//!
//! One [`SessionContext`] per chat session, shared between the components as
//! a [`SharedSession`]. Two sessions share nothing.

use crate::tracker::{ActionState, ActionStateTracker};
use crate::workspace::{WorkspaceAggregator, WorkspaceView};
use codeforge_types::{Artifact, Message, ModelProvider};
use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedSession = Arc<RwLock<SessionContext>>;

#[derive(Debug)]
pub struct SessionContext {
    id: String,
    provider: ModelProvider,
    conversation: Vec<Message>,
    current_artifact: Option<Arc<Artifact>>,
    preview_url: Option<String>,
    pub(crate) tracker: ActionStateTracker,
    workspace: WorkspaceView,
    pub(crate) generating: bool,
    pub(crate) sandbox_ready: bool,
}

impl SessionContext {
    /// New session with a fresh UUID v4 id
    pub fn new(provider: ModelProvider) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), provider)
    }

    pub fn with_id(id: impl Into<String>, provider: ModelProvider) -> Self {
        Self {
            id: id.into(),
            provider,
            conversation: Vec::new(),
            current_artifact: None,
            preview_url: None,
            tracker: ActionStateTracker::new(),
            workspace: WorkspaceView::default(),
            generating: false,
            sandbox_ready: false,
        }
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn provider(&self) -> ModelProvider {
        self.provider
    }

    pub fn set_provider(&mut self, provider: ModelProvider) {
        self.provider = provider;
    }

    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    /// Append to the conversation and recompute the workspace view
    pub fn push_message(&mut self, message: Message) {
        self.conversation.push(message);
        self.workspace = WorkspaceAggregator::aggregate(&self.conversation);
    }

    pub fn current_artifact(&self) -> Option<&Arc<Artifact>> {
        self.current_artifact.as_ref()
    }

    pub(crate) fn set_current_artifact(&mut self, artifact: Arc<Artifact>) {
        self.current_artifact = Some(artifact);
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.preview_url.as_deref()
    }

    pub(crate) fn set_preview_url(&mut self, preview_url: Option<String>) {
        self.preview_url = preview_url;
    }

    pub fn tracker(&self) -> &ActionStateTracker {
        &self.tracker
    }

    /// State of each action of the current artifact.
    ///
    /// All pending until a run of this artifact begins; the tracker may still
    /// hold the states of the previous turn's artifact.
    pub fn current_states(&self) -> Vec<ActionState> {
        match &self.current_artifact {
            Some(artifact) if self.tracker.tracks(artifact) => self.tracker.states(),
            Some(artifact) => vec![ActionState::Pending; artifact.len()],
            None => Vec::new(),
        }
    }

    pub fn workspace(&self) -> &WorkspaceView {
        &self.workspace
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Whether an execution run has been submitted, so the sandbox exists
    pub fn sandbox_ready(&self) -> bool {
        self.sandbox_ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeforge_types::{Action, ActionResult, ProgressStatus};

    #[test]
    fn test_new_session_is_empty() {
        let session = SessionContext::new(ModelProvider::Claude);
        assert!(uuid::Uuid::parse_str(session.id()).is_ok());
        assert_eq!(session.provider(), ModelProvider::Claude);
        assert!(session.conversation().is_empty());
        assert!(session.current_artifact().is_none());
        assert!(session.preview_url().is_none());
        assert!(!session.sandbox_ready());
        assert!(session.workspace().snapshot.is_empty());
    }

    #[test]
    fn test_push_message_refreshes_workspace() {
        let mut session = SessionContext::with_id("s1", ModelProvider::Gpt);
        session.push_message(Message::user("page please"));
        assert!(session.workspace().tree.is_empty());

        let artifact = Artifact::new("a1", "Page", vec![Action::file("index.html", "<p/>")]);
        session.push_message(Message::assistant("Done", Some(artifact)));

        assert_eq!(session.conversation().len(), 2);
        assert_eq!(
            session.workspace().snapshot.get("index.html").map(|f| f.content.as_str()),
            Some("<p/>")
        );
    }

    #[test]
    fn test_new_turn_shows_pending_until_its_run_begins() {
        let mut session = SessionContext::with_id("s1", ModelProvider::Gpt);
        let first = Arc::new(Artifact::new(
            "site",
            "Site",
            vec![Action::file("index.html", "<p/>"), Action::shell("npm i")],
        ));
        session.set_current_artifact(first.clone());
        let run = session.tracker.begin_run(first);
        session.tracker.apply(run, 0, ProgressStatus::Completed, Some(&ActionResult::ok()));
        session.tracker.apply(
            run,
            1,
            ProgressStatus::Completed,
            Some(&ActionResult::failed("exit 1")),
        );
        session.tracker.finish_run(run);
        assert_eq!(
            session.current_states(),
            vec![
                ActionState::Completed,
                ActionState::Failed {
                    error: Some("exit 1".to_string())
                }
            ]
        );

        let second = Arc::new(Artifact::new(
            "site",
            "Site",
            vec![Action::file("index.html", "<h1/>"), Action::shell("npm i")],
        ));
        session.set_current_artifact(second.clone());
        assert_eq!(session.current_states(), vec![ActionState::Pending; 2]);

        session.tracker.begin_run(second);
        assert_eq!(session.current_states(), vec![ActionState::Pending; 2]);
    }

    #[test]
    fn test_sessions_are_independent() {
        let a = SessionContext::new(ModelProvider::Gpt);
        let b = SessionContext::new(ModelProvider::Gpt);
        assert_ne!(a.id(), b.id());
    }
}
