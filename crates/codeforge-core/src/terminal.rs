//! Single-flight command channel into the session sandbox

use crate::error::TerminalError;
use crate::ports::TerminalBackend;
use crate::session::SharedSession;
use codeforge_types::{display_dir, TerminalLine, TerminalRequest, TerminalResponse, SANDBOX_HOME};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

pub const READY_LINE: &str = "Terminal ready. Type commands to execute in the sandbox.";
pub const CLEARED_LINE: &str = "Terminal cleared.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalState {
    pub cwd: String,
    pub lines: Vec<TerminalLine>,
    pub busy: bool,
}

impl Default for TerminalState {
    fn default() -> Self {
        Self {
            cwd: SANDBOX_HOME.to_string(),
            lines: vec![TerminalLine::output(READY_LINE)],
            busy: false,
        }
    }
}

/// Terminal attached to one chat session.
///
/// `busy` is checked and set under one lock acquisition, so two commands can
/// never be in flight at once; a command arriving while busy is rejected.
pub struct TerminalSession {
    backend: Arc<dyn TerminalBackend>,
    state: Mutex<TerminalState>,
}

impl TerminalSession {
    pub fn new(backend: Arc<dyn TerminalBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(TerminalState::default()),
        }
    }

    /// Run `command` in the session's sandbox, refusing until an execution run
    /// has created one
    pub async fn run_in(
        &self,
        session: &SharedSession,
        command: &str,
    ) -> Result<TerminalResponse, TerminalError> {
        let session_id = {
            let ctx = session.read().await;
            if !ctx.sandbox_ready() {
                return Err(TerminalError::NoSandbox);
            }
            ctx.id().to_string()
        };
        self.run(&session_id, command).await
    }

    /// Run `command` in sandbox `session_id`
    pub async fn run(
        &self,
        session_id: &str,
        command: &str,
    ) -> Result<TerminalResponse, TerminalError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(TerminalError::EmptyCommand);
        }

        {
            let mut state = self.state.lock().await;
            if state.busy {
                return Err(TerminalError::Busy);
            }
            state.busy = true;
            let prompt = format!("{} $ {}", display_dir(&state.cwd), command);
            state.lines.push(TerminalLine::input(prompt));
        }

        debug!("Running terminal command in {}: {}", session_id, command);
        let request = TerminalRequest {
            session_id: session_id.to_string(),
            command: command.to_string(),
        };
        let result = self.backend.run_command(&request).await;

        let mut state = self.state.lock().await;
        state.busy = false;
        match result {
            Ok(response) => {
                if !response.stdout.is_empty() {
                    state.lines.push(TerminalLine::output(response.stdout.clone()));
                }
                if !response.stderr.is_empty() {
                    state.lines.push(TerminalLine::error(response.stderr.clone()));
                }
                if !response.cwd.is_empty() {
                    state.cwd = response.cwd.clone();
                }
                debug!("Command exited with {}", response.exit_code);
                Ok(response)
            }
            Err(e) => {
                error!("Terminal command failed: {}", e);
                state.lines.push(TerminalLine::error(format!("Error: {}", e)));
                Err(e.into())
            }
        }
    }

    /// Truncate the log to a single informational line
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.lines.clear();
        state.lines.push(TerminalLine::output(CLEARED_LINE));
    }

    pub async fn snapshot(&self) -> TerminalState {
        self.state.lock().await.clone()
    }

    pub async fn cwd(&self) -> String {
        self.state.lock().await.cwd.clone()
    }

    /// Prompt prefix for the next command, e.g. `~/app $`
    pub async fn prompt(&self) -> String {
        format!("{} $", display_dir(&self.state.lock().await.cwd))
    }

    pub async fn is_busy(&self) -> bool {
        self.state.lock().await.busy
    }
}
