//! CodeForge Core - Artifact execution orchestration
//!
//! Submits generated action lists to a remote sandbox, follows the streamed
//! progress, and keeps per-action status, the workspace view and the
//! sandbox terminal in sync for one chat session. Transport is abstracted
//! behind the traits in [`ports`].

pub mod error;
pub mod generation;
pub mod orchestrator;
pub mod ports;
pub mod progress;
pub mod session;
pub mod terminal;
pub mod tracker;
pub mod workspace;

pub use error::*;
pub use generation::GenerationClient;
pub use orchestrator::{ExecutionOrchestrator, RunOutcome};
pub use ports::*;
pub use progress::{FrameDecoder, ProgressStreamReader};
pub use session::{SessionContext, SharedSession};
pub use terminal::{TerminalSession, TerminalState};
pub use tracker::{
    ActionState, ActionStateTracker, Applied, FileVerb, Ignored, RunGeneration, RunSummary,
};
pub use workspace::{
    FileNode, FileTree, WorkspaceAggregator, WorkspaceFile, WorkspaceSnapshot, WorkspaceView,
};
