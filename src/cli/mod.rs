use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "mo-progress")]
#[command(about = "Manufacturing order progress tracking and notifications")]
#[command(long_about = "mo-progress reports how far manufacturing orders have progressed, stages and saves \
                       process status changes, tracks which files were sent to production, and notifies \
                       stakeholders when an order completes or gets a new note.")]
pub struct Cli {
    /// Override the JSON data file used as the record store
    #[arg(long, global = true, help = "Path to the JSON data file (defaults to the configured store.data_file)")]
    pub data_file: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the completion of one order, part by part
    Progress {
        /// Order record id
        order: String,
    },
    /// Stage process status changes and save them in one pass
    SetStatus {
        /// Order record id
        order: String,
        /// User id of the production engineer making the change
        #[arg(long, help = "User id performing the change")]
        actor: String,
        /// Edits written as <part>:<slot>=<status>, e.g. r1x:2=Done
        #[arg(required = true, help = "One or more <part>:<slot>=<status> edits")]
        edits: Vec<String>,
    },
    /// Mark one file, or every file, of an order as sent
    MarkSent {
        /// Order record id
        order: String,
        /// User id of the production engineer
        #[arg(long, help = "User id performing the change")]
        actor: String,
        /// File name to mark
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        file: Option<String>,
        /// Mark every known file
        #[arg(long, help = "Mark every file attached to the order")]
        all: bool,
    },
    /// Add a note to an order and notify its stakeholders
    AddNote {
        /// Order record id
        order: String,
        /// User id of the note's author
        #[arg(long, help = "User id of the author")]
        actor: String,
        /// Note text
        text: String,
    },
    /// Rewrite one of your own notes on an order
    EditNote {
        /// Order record id
        order: String,
        /// User id of the note's author
        #[arg(long, help = "User id of the author")]
        actor: String,
        /// Note position as listed, starting at 1
        position: usize,
        /// New note text
        text: String,
    },
    /// Delete one of your own notes from an order
    DeleteNote {
        /// Order record id
        order: String,
        /// User id of the note's author
        #[arg(long, help = "User id of the author")]
        actor: String,
        /// Note position as listed, starting at 1
        position: usize,
    },
    /// Summarize progress across all orders
    Dashboard {
        /// Print the summary as JSON
        #[arg(long, help = "Emit machine-readable JSON instead of a table")]
        json: bool,
    },
}
