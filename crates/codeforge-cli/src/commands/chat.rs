//! Chat command - Interactive session: prompt, execute, inspect

use super::Workbench;
use crate::config::SettingsManager;
use crate::render;
use anyhow::{Context, Result};
use codeforge_core::{GenerationError, TerminalError};
use codeforge_types::{ModelProvider, Role};
use colored::Colorize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

pub struct ChatOptions {
    pub model: Option<ModelProvider>,
    pub no_auto_execute: bool,
}

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Prompt(String),
    Run,
    Status,
    Files,
    Tree,
    Cat(String),
    Preview,
    Shell(String),
    Log,
    Clear,
    Model(String),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }
        if let Some(command) = line.strip_prefix('!') {
            return ReplCommand::Shell(command.trim().to_string());
        }
        let Some(rest) = line.strip_prefix('/') else {
            return ReplCommand::Prompt(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name {
            "run" => ReplCommand::Run,
            "status" => ReplCommand::Status,
            "files" => ReplCommand::Files,
            "tree" => ReplCommand::Tree,
            "cat" => ReplCommand::Cat(arg.to_string()),
            "preview" => ReplCommand::Preview,
            "log" => ReplCommand::Log,
            "clear" => ReplCommand::Clear,
            "model" => ReplCommand::Model(arg.to_string()),
            "help" | "?" => ReplCommand::Help,
            "quit" | "exit" | "q" => ReplCommand::Quit,
            other => ReplCommand::Unknown(other.to_string()),
        }
    }
}

const HELP: &[(&str, &str)] = &[
    ("<text>", "Describe what to build or change"),
    ("/run", "Execute the current artifact again"),
    ("/status", "Show the action list with progress markers"),
    ("/files", "List workspace files"),
    ("/tree", "Show the workspace tree"),
    ("/cat <path>", "Print the latest content of a file"),
    ("/preview", "Show the live preview URL"),
    ("!<command>", "Run a command in the sandbox terminal"),
    ("/log", "Show the terminal log"),
    ("/clear", "Clear the terminal log"),
    ("/model <gpt|claude>", "Switch the generation model"),
    ("/help", "Show this help"),
    ("/quit", "Leave the session"),
];

pub async fn run(options: ChatOptions) -> Result<()> {
    let manager = SettingsManager::from_env()?;
    let settings = manager.load().context("Failed to load settings")?;
    let provider = options.model.unwrap_or(settings.default_model_provider);
    let auto_execute = settings.auto_execute && !options.no_auto_execute;

    let workbench = Workbench::connect(&settings, provider)?;
    let session_id = workbench.session_id().await;
    if let Err(e) = manager.update(|s| s.last_session_id = Some(session_id.clone())) {
        warn!("Could not record session id: {}", e);
    }

    println!("{}", "CodeForge".bold().underline());
    println!(
        "  Session {} · model {} · server {}",
        session_id.dimmed(),
        provider.to_string().cyan(),
        settings.server_url.dimmed()
    );
    println!("  Type {} for commands.", "/help".cyan());
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "›".cyan().bold());
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        let command = ReplCommand::parse(&line);
        debug!("REPL command: {:?}", command);
        if command == ReplCommand::Quit {
            break;
        }
        handle(&workbench, command, auto_execute).await?;
    }

    println!("{}", "Bye.".dimmed());
    Ok(())
}

async fn handle(workbench: &Workbench, command: ReplCommand, auto_execute: bool) -> Result<()> {
    match command {
        ReplCommand::Prompt(prompt) => prompt_and_execute(workbench, &prompt, auto_execute).await?,
        ReplCommand::Run => {
            let artifact = workbench.session.read().await.current_artifact().cloned();
            match artifact {
                Some(artifact) => {
                    // outcome already reported
                    let _ = workbench.execute(artifact).await?;
                }
                None => println!("{}", "Nothing to run yet. Describe what to build first.".yellow()),
            }
        }
        ReplCommand::Status => {
            for line in render::status_lines(&*workbench.session.read().await) {
                println!("{}", line);
            }
        }
        ReplCommand::Files => {
            let ctx = workbench.session.read().await;
            let snapshot = &ctx.workspace().snapshot;
            if snapshot.is_empty() {
                println!("{}", "No files yet".dimmed());
            }
            for path in snapshot.paths() {
                println!("  {}", path);
            }
        }
        ReplCommand::Tree => {
            let ctx = workbench.session.read().await;
            for line in render::tree_lines(&ctx.workspace().tree) {
                println!("  {}", line);
            }
        }
        ReplCommand::Cat(path) => {
            let ctx = workbench.session.read().await;
            match ctx.workspace().snapshot.get(&path) {
                Some(file) => println!("{}", file.content),
                None => println!("{} {}", "No such file:".yellow(), path),
            }
        }
        ReplCommand::Preview => match workbench.session.read().await.preview_url() {
            Some(url) => println!("{}", url.cyan()),
            None => println!("{}", "No preview yet".dimmed()),
        },
        ReplCommand::Shell(command) => shell(workbench, &command).await?,
        ReplCommand::Log => {
            for line in workbench.terminal.snapshot().await.lines.iter() {
                println!("{}", render::terminal_line(line));
            }
        }
        ReplCommand::Clear => {
            workbench.terminal.clear().await;
            println!("{}", "Terminal cleared.".dimmed());
        }
        ReplCommand::Model(name) => match ModelProvider::parse(&name) {
            Some(provider) => {
                workbench.session.write().await.set_provider(provider);
                println!("{} Model set to {}", "✓".green(), provider.to_string().cyan());
            }
            None => println!("{} expected gpt or claude", "Unknown model:".yellow()),
        },
        ReplCommand::Help => {
            for (usage, description) in HELP {
                println!("  {:<22} {}", usage.cyan(), description);
            }
        }
        ReplCommand::Unknown(name) => {
            println!("{} /{} (try /help)", "Unknown command:".yellow(), name)
        }
        ReplCommand::Empty | ReplCommand::Quit => {}
    }
    Ok(())
}

async fn prompt_and_execute(workbench: &Workbench, prompt: &str, auto_execute: bool) -> Result<()> {
    println!("{}", "Generating…".dimmed());
    let artifact = match workbench.generation.send(&workbench.session, prompt).await {
        Ok(artifact) => artifact,
        Err(GenerationError::Busy) => {
            println!("{}", "Still generating the previous reply.".yellow());
            return Ok(());
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            return Ok(());
        }
    };

    {
        let ctx = workbench.session.read().await;
        if let Some(reply) = ctx.conversation().last().filter(|m| m.role == Role::Assistant) {
            println!("{}", reply.prose());
        }
        if artifact.is_some() {
            for line in render::status_lines(&ctx) {
                println!("{}", line);
            }
        }
    }

    if let Some(artifact) = artifact {
        if auto_execute {
            // outcome already reported
            let _ = workbench.execute(artifact).await?;
        } else {
            println!("{}", "Type /run to execute.".dimmed());
        }
    }
    Ok(())
}

async fn shell(workbench: &Workbench, command: &str) -> Result<()> {
    let before = workbench.terminal.snapshot().await.lines.len();
    match workbench.terminal.run_in(&workbench.session, command).await {
        Err(TerminalError::NoSandbox) => {
            println!("{}", "No sandbox yet. Execute an artifact first.".yellow());
            return Ok(());
        }
        Err(TerminalError::EmptyCommand) => return Ok(()),
        Err(TerminalError::Busy) => {
            println!("{}", "A command is already running.".yellow());
            return Ok(());
        }
        _ => {}
    }
    // echo, output and error lines were appended to the log
    for line in workbench.terminal.snapshot().await.lines.iter().skip(before) {
        println!("{}", render::terminal_line(line));
    }
    Ok(())
}
