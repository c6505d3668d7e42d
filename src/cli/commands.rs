use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hnefatafl")]
#[command(about = "Nine-by-nine Hnefatafl, pass-and-play or over a matchmaking relay")]
pub struct Cli {
    /// Configuration file to use instead of the platform default
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the matchmaking relay
    ///
    /// Pairs clients into rooms of two by room code, assigns sides and forwards their
    /// moves to each other.
    ///
    /// Examples:
    ///   hnefatafl relay
    ///   hnefatafl relay --bind 127.0.0.1:9000
    Relay {
        /// Address to listen on (default from config, 0.0.0.0:8765)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Play online through a relay
    ///
    /// Both players pick the same room code. Sides are assigned at random once the
    /// second player arrives.
    ///
    /// Examples:
    ///   hnefatafl play --room 1234 --name Astrid
    ///   hnefatafl play --room 7 --name Bjorn --host 10.0.0.5 --port 8765
    Play {
        /// Room code, 1 to 4 digits
        #[arg(short, long)]
        room: String,
        /// Display name shown to the opponent
        #[arg(short, long)]
        name: String,
        /// Relay host (default from config)
        #[arg(long)]
        host: Option<String>,
        /// Relay port (default from config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Pass-and-play on this terminal
    Local,
}
