//! Lexi CLI - manage a topic dictionary from the terminal
//!
//! Entries live in a local libSQL database and sync to a remote store when
//! one is configured.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::filter::Directive;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::CliContext;
use crate::commands::completions::run_completions;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::show::run_show;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "lexi=info".parse::<Directive>() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let ctx = CliContext::resolve(cli.db_path, &cli.table, cli.config)?;

    match cli.command {
        Commands::Add {
            key,
            description,
            examples,
        } => run_add(&ctx, &key, &description, &examples).await?,
        Commands::Edit {
            key,
            description,
            examples,
            clear_examples,
        } => run_edit(&ctx, &key, description.as_deref(), &examples, clear_examples).await?,
        Commands::Delete { key } => run_delete(&ctx, &key).await?,
        Commands::Show { key, json } => run_show(&ctx, &key, json).await?,
        Commands::List { json } => run_list(&ctx, json).await?,
        Commands::Sync { strategy } => {
            run_sync(&ctx, strategy.map(Into::into)).await?;
        }
        Commands::Status { json } => run_status(&ctx, json).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
