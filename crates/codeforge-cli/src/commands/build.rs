//! Build command - One-shot generate, execute and report

use super::Workbench;
use crate::config::SettingsManager;
use crate::render;
use anyhow::{Context, Result};
use codeforge_core::RunOutcome;
use codeforge_types::ModelProvider;
use colored::Colorize;

pub async fn run(prompt: &str, model: Option<ModelProvider>) -> Result<()> {
    let settings = SettingsManager::from_env()?
        .load()
        .context("Failed to load settings")?;
    let provider = model.unwrap_or(settings.default_model_provider);
    let workbench = Workbench::connect(&settings, provider)?;

    println!("{}", "🔨 Generating…".cyan().bold());
    let artifact = workbench
        .generation
        .send(&workbench.session, prompt)
        .await
        .context("Generation failed")?;

    let Some(artifact) = artifact else {
        let ctx = workbench.session.read().await;
        if let Some(reply) = ctx.conversation().last() {
            println!("{}", reply.prose());
        }
        anyhow::bail!("The model replied without an artifact to execute");
    };

    let title = if artifact.title.is_empty() {
        "Untitled artifact"
    } else {
        artifact.title.as_str()
    };
    println!("  {} {}", "📦".green(), title.bold());

    let outcome = workbench
        .execute(artifact)
        .await?
        .context("Execution failed")?;

    let ctx = workbench.session.read().await;
    println!();
    println!("{}", "Workspace:".cyan().bold());
    for line in render::tree_lines(&ctx.workspace().tree) {
        println!("  {}", line);
    }

    let failed = ctx.tracker().failed().len();
    if let RunOutcome::Completed {
        preview_url: Some(url),
    } = &outcome
    {
        println!();
        println!("{} {}", "Preview:".cyan().bold(), url);
    }

    if failed > 0 {
        anyhow::bail!("{} action(s) failed", failed);
    }
    println!("{}", "✅ Build completed successfully!".green().bold());
    Ok(())
}
