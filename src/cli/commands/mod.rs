//! CLI command dispatch and handlers.
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod groups;
pub mod refresh;
pub mod run;

use crate::cli::args::{Cli, Commands, GroupsSubcommand};
use crate::config::Settings;
use crate::error::HonorFxError;
use crate::store::FileGroupStore;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the group store
/// cannot be opened, or the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<(), HonorFxError> {
    let mut settings = Settings::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = cli.groups_dir {
        settings.groups_dir = dir;
    }
    tracing::debug!(groups_dir = %settings.groups_dir.display(), "using group store");
    let store = FileGroupStore::open(&settings.groups_dir).await?;

    match cli.command {
        Commands::Groups(cmd) => match cmd.subcommand {
            GroupsSubcommand::List(args) => groups::list(&store, &args).await,
            GroupsSubcommand::Info(args) => groups::info(&store, &args).await,
            GroupsSubcommand::Set(args) => groups::set(&store, &args).await,
            GroupsSubcommand::Remove(args) => groups::remove(&store, &args).await,
            GroupsSubcommand::Delete(args) => groups::delete(&store, &args).await,
            GroupsSubcommand::Check(args) => groups::check(&store, &args).await,
        },
        Commands::Refresh(args) => refresh::run(&store, &args).await,
        Commands::Run(args) => run::run(&args, &settings, store).await,
    }
}

/// Serializes `value` as pretty JSON and prints it.
fn print_json(value: &serde_json::Value) -> Result<(), HonorFxError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
