//! Command-line interface for tictactoe_lobby.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tic-tac-toe lobby server and room watcher
#[derive(Parser, Debug)]
#[command(name = "tictactoe_lobby")]
#[command(about = "Polling tic-tac-toe lobby with pluggable room stores", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP lobby server
    Serve {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host to bind to (overrides config and LOBBY_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config and LOBBY_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Poll a room and print the board whenever it changes
    Watch {
        /// Lobby server URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server_url: String,

        /// Four-digit room code
        room_code: String,

        /// Poll interval in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
}
