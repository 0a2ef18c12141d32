//! CLI module - Command-line interface for MercadoBoom
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// MercadoBoom - Storefront backend
/// Catalog, checkout, bank-transfer verification and support tickets
#[derive(Parser)]
#[command(name = "mercadoboom")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server (default)
    #[command(alias = "daemon", alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Apply pending database migrations and exit
    Migrate,

    /// List registered users
    #[command(alias = "u")]
    Users {
        /// Only show administrators
        #[arg(long)]
        admins: bool,
    },

    /// List bank transfers waiting for review
    #[command(alias = "transfers", alias = "pending")]
    PendingTransfers,
}

pub use commands::*;
