//! CodeForge CLI
//!
//! Describe an app, watch the generated plan execute in a remote sandbox and
//! inspect the resulting workspace.

mod api;
mod commands;
mod config;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use codeforge_types::ModelProvider;
use colored::Colorize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codeforge")]
#[command(author, version, about = "CodeForge - Build apps from a prompt in a live sandbox", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session
    Chat {
        /// Generation model (gpt, claude)
        #[arg(short, long)]
        model: Option<ModelProvider>,

        /// Do not execute generated artifacts automatically
        #[arg(long)]
        no_auto_execute: bool,
    },

    /// Generate and execute in one shot
    Build {
        /// What to build
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,

        /// Generation model (gpt, claude)
        #[arg(short, long)]
        model: Option<ModelProvider>,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set the backend server URL
    SetServer {
        /// Server URL (e.g., http://localhost:8000)
        url: String,
    },
    /// Set the default generation model
    SetModel {
        /// gpt or claude
        model: String,
    },
    /// Execute generated artifacts immediately (true/false)
    SetAutoExecute {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Show current configuration
    Show,
    /// Reset to default configuration
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "codeforge_cli=debug,codeforge_core=debug"
    } else {
        "codeforge_cli=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    info!("Starting CodeForge CLI");

    let result = match cli.command {
        Commands::Chat {
            model,
            no_auto_execute,
        } => {
            commands::chat::run(commands::chat::ChatOptions {
                model,
                no_auto_execute,
            })
            .await
        }
        Commands::Build { prompt, model } => commands::build::run(&prompt.join(" "), model).await,
        Commands::Config { action } => match action {
            ConfigAction::SetServer { url } => commands::config::set_server(&url).await,
            ConfigAction::SetModel { model } => commands::config::set_model(&model).await,
            ConfigAction::SetAutoExecute { enabled } => {
                commands::config::set_auto_execute(enabled).await
            }
            ConfigAction::Show => commands::config::show().await,
            ConfigAction::Reset => commands::config::reset().await,
        },
    };

    if let Err(ref e) = result {
        error!("Command failed: {:#}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    result
}
