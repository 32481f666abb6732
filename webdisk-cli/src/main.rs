//! WebDisk CLI - personal file storage in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;
mod output;

use commands::{auth, file, logs};

/// WebDisk - accounts and file storage in your terminal
#[derive(Parser)]
#[command(name = "wd", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Register {
        username: String,
        /// Password (otherwise WEBDISK_PASSWORD or an interactive prompt)
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a username and password
    Login {
        username: String,
        /// Password (otherwise WEBDISK_PASSWORD or an interactive prompt)
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change an account's password
    Passwd {
        username: String,
        /// Current password
        #[arg(short, long)]
        password: Option<String>,
        /// New password (prompted with confirmation if omitted)
        #[arg(long)]
        new_password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload a file
    Upload {
        path: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List uploaded files
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a file by its generated name
    Download {
        name: String,
        /// Destination file or directory (defaults to the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a file by id
    Delete {
        id: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register { username, password, json } => {
            auth::run_register(&username, password, json)
        }
        Commands::Login { username, password, json } => auth::run_login(&username, password, json),
        Commands::Passwd { username, password, new_password, json } => {
            auth::run_passwd(&username, password, new_password, json)
        }
        Commands::Upload { path, json } => file::run_upload(&path, json),
        Commands::List { json } => file::run_list(json),
        Commands::Download { name, output, json } => file::run_download(&name, output, json),
        Commands::Delete { id, json } => file::run_delete(id, json),
        Commands::Logs { command } => logs::run(command),
    }
}
