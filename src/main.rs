use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

mod cli;

use cli::commands::add_note::AddNoteCommand;
use cli::commands::dashboard::DashboardCommand;
use cli::commands::delete_note::DeleteNoteCommand;
use cli::commands::edit_note::EditNoteCommand;
use cli::commands::mark_sent::MarkSentCommand;
use cli::commands::progress::ProgressCommand;
use cli::commands::set_status::SetStatusCommand;
use cli::commands::{show_how_to_use, Command};
use cli::{Cli, Commands};
use mo_progress::{config, init_config, init_telemetry, JsonFileStore, ProgressEngine, RateLimitedStore, RecordStore};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return show_how_to_use();
    };

    let settings = config()?.clone();
    init_telemetry(&settings.observability)?;
    init_config()?;

    let data_file = cli.data_file.unwrap_or_else(|| settings.store.data_file.clone());
    let file_store: Arc<dyn RecordStore> = Arc::new(JsonFileStore::new(data_file));
    let store: Arc<dyn RecordStore> = Arc::new(RateLimitedStore::new(
        file_store,
        settings.store.requests_per_second,
        settings.store.burst_capacity,
    ));
    let engine = ProgressEngine::new(store, settings);

    tokio::runtime::Runtime::new()?.block_on(async {
        match command {
            Commands::Progress { order } => ProgressCommand::new(order).execute(&engine).await,
            Commands::SetStatus { order, actor, edits } => {
                SetStatusCommand::new(order, actor, edits).execute(&engine).await
            }
            Commands::MarkSent {
                order,
                actor,
                file,
                all: _,
            } => MarkSentCommand::new(order, actor, file).execute(&engine).await,
            Commands::AddNote { order, actor, text } => AddNoteCommand::new(order, actor, text).execute(&engine).await,
            Commands::EditNote {
                order,
                actor,
                position,
                text,
            } => EditNoteCommand::new(order, actor, position, text).execute(&engine).await,
            Commands::DeleteNote { order, actor, position } => {
                DeleteNoteCommand::new(order, actor, position).execute(&engine).await
            }
            Commands::Dashboard { json } => DashboardCommand::new(json).execute(&engine).await,
        }
    })
}
