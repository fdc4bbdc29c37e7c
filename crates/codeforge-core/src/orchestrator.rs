//! Drives one execution run: submit, read progress, apply to the tracker

use crate::error::ExecutionError;
use crate::ports::ExecutionBackend;
use crate::progress::ProgressStreamReader;
use crate::session::SharedSession;
use crate::tracker::{Applied, Ignored, RunGeneration};
use codeforge_types::{Artifact, ExecuteRequest, ExecutionEvent};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How a run ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The executor sent `complete`; the session preview now holds this value
    Completed { preview_url: Option<String> },
    /// The stream ended without `complete`; preview unchanged
    Ended,
    /// A newer run started while this one was still draining
    Superseded,
}

#[derive(Clone)]
pub struct ExecutionOrchestrator {
    backend: Arc<dyn ExecutionBackend>,
}

impl ExecutionOrchestrator {
    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        Self { backend }
    }

    /// Execute the session's current artifact
    pub async fn execute_current(
        &self,
        session: &SharedSession,
    ) -> Result<RunOutcome, ExecutionError> {
        let artifact = session
            .read()
            .await
            .current_artifact()
            .cloned()
            .ok_or(ExecutionError::NoArtifact)?;
        self.execute(session, artifact).await
    }

    /// Submit `artifact` for the session and apply its progress as it arrives.
    ///
    /// Starting a run supersedes tracking for any earlier run of the session;
    /// the earlier stream is left to drain and its events are dropped.
    pub async fn execute(
        &self,
        session: &SharedSession,
        artifact: Arc<Artifact>,
    ) -> Result<RunOutcome, ExecutionError> {
        let (generation, request) = {
            let mut ctx = session.write().await;
            let generation = ctx.tracker.begin_run(artifact.clone());
            let request = ExecuteRequest {
                session_id: ctx.id().to_string(),
                actions: artifact.actions.clone(),
            };
            (generation, request)
        };

        info!(
            "Executing {} actions for session {} (run {})",
            request.actions.len(),
            request.session_id,
            generation
        );

        let result = self.drive(session, generation, &request).await;

        let mut ctx = session.write().await;
        ctx.tracker.finish_run(generation);
        match &result {
            Ok(outcome) => info!("Run {} finished: {:?}", generation, outcome),
            Err(e) => error!("Run {} failed: {}", generation, e),
        }
        result
    }

    async fn drive(
        &self,
        session: &SharedSession,
        generation: RunGeneration,
        request: &ExecuteRequest,
    ) -> Result<RunOutcome, ExecutionError> {
        let body = self.backend.submit(request).await?;
        session.write().await.sandbox_ready = true;
        let mut reader = ProgressStreamReader::new(body);
        let mut dropped = 0usize;

        while let Some(event) = reader.next_event().await {
            let event = event?;
            let mut ctx = session.write().await;
            let current = ctx.tracker.is_current(generation);

            match event {
                ExecutionEvent::Progress {
                    action_index,
                    status,
                    result,
                } => {
                    let applied =
                        ctx.tracker
                            .apply(generation, action_index, status, result.as_ref());
                    debug!(
                        "Progress {} {:?} -> {:?} (run {})",
                        action_index, status, applied, generation
                    );
                    if applied == Applied::Ignored(Ignored::StaleRun) {
                        dropped += 1;
                    }
                }
                ExecutionEvent::Complete { preview_url } => {
                    if !current {
                        warn!("Ignoring completion of superseded run {}", generation);
                        return Ok(RunOutcome::Superseded);
                    }
                    ctx.set_preview_url(preview_url.clone());
                    return Ok(RunOutcome::Completed { preview_url });
                }
                ExecutionEvent::Error { message } => {
                    if !current {
                        warn!("Ignoring error from superseded run {}: {}", generation, message);
                        return Ok(RunOutcome::Superseded);
                    }
                    return Err(ExecutionError::Protocol(message));
                }
            }
        }

        if dropped > 0 {
            warn!("Dropped {} events from superseded run {}", dropped, generation);
        }
        if session.read().await.tracker.is_current(generation) {
            Ok(RunOutcome::Ended)
        } else {
            Ok(RunOutcome::Superseded)
        }
    }
}
