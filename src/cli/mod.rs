//! CLI module - Command-line interface for the dashboard
//!
//! Running without a subcommand starts the web server.

mod commands;

use clap::{Parser, Subcommand};

/// ModernAuth dashboard
/// SSO-gated control panel for ModernAuth server owners
#[derive(Parser)]
#[command(name = "modernauthdash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Inspect or adjust dashboard user records
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Print a user's stored record
    Show {
        /// SSO username
        username: String,
    },
    /// Grant or revoke premium
    Premium {
        /// SSO username
        username: String,
        /// true or false
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Record the player counters shown on the analytics page
    Players {
        /// SSO username
        username: String,
        /// Players connecting through ModernAuth
        modern: i32,
        /// All players
        total: i32,
    },
}

pub use commands::*;
