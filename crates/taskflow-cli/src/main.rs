//! TaskFlow CLI - manage your task list from the terminal
//!
//! Each invocation restores the profile's session from the OS keychain, runs
//! one operation against the server, and prints its notification.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::tasks::{run_add, run_delete, run_edit, run_list, run_toggle};
use crate::error::CliError;

const DEFAULT_LOG_DIRECTIVE: &str = "taskflow=warn";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        if error.needs_report() {
            eprintln!("Error: {error}");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Auth { command } => run_auth(command, profile).await?,
        Commands::List { json } => run_list(json, profile).await?,
        Commands::Add { title, description } => run_add(&title, &description, profile).await?,
        Commands::Toggle { id } => run_toggle(&id, profile).await?,
        Commands::Delete { id } => run_delete(&id, profile).await?,
        Commands::Edit {
            id,
            title,
            description,
        } => {
            run_edit(&id, title.as_deref(), description.as_deref(), profile).await?;
        }
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
        Commands::Config { command } => run_config(command, profile)?,
    }

    Ok(())
}
