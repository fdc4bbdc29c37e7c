//! Config command - Manage CLI configuration

use crate::config::{normalize_server_url, SettingsManager, SERVER_URL_ENV};
use anyhow::{Context, Result};
use codeforge_types::{ModelProvider, Settings};
use colored::Colorize;

/// Set the backend server URL
pub async fn set_server(url: &str) -> Result<()> {
    let url = normalize_server_url(url)?;
    let manager = SettingsManager::from_env()?;
    manager
        .update(|s| s.server_url = url.clone())
        .context("Failed to save settings")?;

    println!("{} Server URL set to: {}", "✓".green(), url.cyan());
    Ok(())
}

/// Set the default generation model
pub async fn set_model(model: &str) -> Result<()> {
    let provider = ModelProvider::parse(model)
        .with_context(|| format!("Unknown model: {}. Supported: gpt, claude", model))?;
    let manager = SettingsManager::from_env()?;
    manager
        .update(|s| s.default_model_provider = provider)
        .context("Failed to save settings")?;

    println!(
        "{} Default model set to: {}",
        "✓".green(),
        provider.to_string().cyan()
    );
    Ok(())
}

/// Choose whether generated artifacts run immediately
pub async fn set_auto_execute(enabled: bool) -> Result<()> {
    let manager = SettingsManager::from_env()?;
    manager
        .update(|s| s.auto_execute = enabled)
        .context("Failed to save settings")?;

    let state = if enabled { "on".green() } else { "off".yellow() };
    println!("{} Auto-execute: {}", "✓".green(), state);
    Ok(())
}

/// Show current configuration
pub async fn show() -> Result<()> {
    let manager = SettingsManager::from_env()?;
    let stored = manager.load_stored().context("Failed to load settings")?;
    let effective = manager.load()?;

    println!("{}", "CodeForge Configuration".bold().underline());
    println!();

    println!("{}", "Server:".cyan().bold());
    println!("  URL:             {}", effective.server_url);
    if effective.server_url != stored.server_url {
        println!(
            "  {}",
            format!("(from {}, saved: {})", SERVER_URL_ENV, stored.server_url).dimmed()
        );
    }
    println!("  Connect timeout: {}s", effective.connect_timeout_secs);
    println!();

    println!("{}", "Generation:".cyan().bold());
    println!("  Default model:   {}", effective.default_model_provider.to_string().cyan());
    println!(
        "  Auto-execute:    {}",
        if effective.auto_execute {
            "on".green()
        } else {
            "off".yellow()
        }
    );
    println!();

    println!("{}", "Last session:".cyan().bold());
    match &effective.last_session_id {
        Some(id) => println!("  {}", id),
        None => println!("  {}", "None".dimmed()),
    }
    println!();

    println!("{}", "Config Files:".cyan().bold());
    println!(
        "  Settings: {}",
        manager.settings_path().display().to_string().dimmed()
    );

    Ok(())
}

/// Reset configuration to defaults
pub async fn reset() -> Result<()> {
    use dialoguer::Confirm;

    let confirm = Confirm::new()
        .with_prompt("Are you sure you want to reset all configuration?")
        .default(false)
        .interact()?;

    if !confirm {
        println!("{}", "Reset cancelled.".yellow());
        return Ok(());
    }

    SettingsManager::from_env()?
        .save(&Settings::default())
        .context("Failed to save default settings")?;

    println!("{} Configuration reset to defaults.", "✓".green());
    Ok(())
}
