//! CLI commands

pub mod build;
pub mod chat;
pub mod config;

use crate::api::HttpBackend;
use crate::render;
use anyhow::{Context, Result};
use codeforge_core::{
    ActionState, ExecutionError, ExecutionOrchestrator, FileVerb, GenerationClient, RunOutcome,
    SessionContext, SharedSession, TerminalSession,
};
use codeforge_types::{Artifact, ModelProvider, Settings};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const PROGRESS_POLL: Duration = Duration::from_millis(100);

/// Components of one chat session wired to the HTTP backend
pub struct Workbench {
    pub session: SharedSession,
    pub generation: GenerationClient,
    pub orchestrator: ExecutionOrchestrator,
    pub terminal: TerminalSession,
}

impl Workbench {
    pub fn connect(settings: &Settings, provider: ModelProvider) -> Result<Self> {
        let backend = Arc::new(HttpBackend::from_settings(settings)?);
        let session = SessionContext::new(provider);
        info!(
            "Session {} against {} ({})",
            session.id(),
            backend.base_url(),
            provider
        );

        Ok(Self {
            session: session.shared(),
            generation: GenerationClient::new(backend.clone()),
            orchestrator: ExecutionOrchestrator::new(backend.clone()),
            terminal: TerminalSession::new(backend),
        })
    }

    pub async fn session_id(&self) -> String {
        self.session.read().await.id().to_string()
    }

    /// Execute `artifact`, printing each action as its state changes
    pub async fn execute(
        &self,
        artifact: Arc<Artifact>,
    ) -> Result<std::result::Result<RunOutcome, ExecutionError>> {
        // labels are fixed at submission so a fresh file reads "Create" throughout
        let verbs: Vec<Option<FileVerb>> = {
            let ctx = self.session.read().await;
            artifact
                .actions
                .iter()
                .map(|action| action.file_path().map(|path| ctx.tracker().file_verb(path)))
                .collect()
        };

        println!(
            "{} {}",
            "▶ Executing".cyan().bold(),
            format!("{} actions", artifact.len()).dimmed()
        );

        let mut run = {
            let orchestrator = self.orchestrator.clone();
            let session = self.session.clone();
            let artifact = artifact.clone();
            tokio::spawn(async move { orchestrator.execute(&session, artifact).await })
        };

        let mut shown = vec![ActionState::Pending; artifact.len()];
        let mut ticker = tokio::time::interval(PROGRESS_POLL);
        let result = loop {
            tokio::select! {
                result = &mut run => {
                    self.print_changes(&artifact, &verbs, &mut shown).await;
                    break result.context("Execution task failed")?;
                }
                _ = ticker.tick() => {
                    self.print_changes(&artifact, &verbs, &mut shown).await;
                }
            }
        };

        match &result {
            Ok(RunOutcome::Completed {
                preview_url: Some(url),
            }) => println!("{} Preview: {}", "✓".green(), url.cyan()),
            Ok(RunOutcome::Completed { preview_url: None }) => {
                println!("{} Run complete (no preview)", "✓".green())
            }
            Ok(RunOutcome::Ended) => println!("{}", "Run ended without completion".yellow()),
            Ok(RunOutcome::Superseded) => println!("{}", "Run superseded".dimmed()),
            Err(e) => println!("{} {}", "✗ Execution failed:".red().bold(), e),
        }
        Ok(result)
    }

    async fn print_changes(
        &self,
        artifact: &Arc<Artifact>,
        verbs: &[Option<FileVerb>],
        shown: &mut [ActionState],
    ) {
        let ctx = self.session.read().await;
        if !ctx.tracker().tracks(artifact) {
            return;
        }
        for (index, action) in artifact.actions.iter().enumerate() {
            let state = ctx.tracker().state(index);
            if state != shown[index] && state != ActionState::Pending {
                println!("{}", render::action_line(action, &state, verbs[index]));
            }
            shown[index] = state;
        }
    }
}
