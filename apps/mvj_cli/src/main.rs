use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{
    config::normalize_api_url,
    effects::{Navigator, Notifier},
    load_settings, MvjClient,
};
use tracing_subscriber::EnvFilter;

mod commands;
mod views;

#[derive(Parser, Debug)]
#[command(name = "mvj", about = "Land lease back office from the terminal")]
struct Cli {
    /// API root, e.g. https://mvj.example.fi/v1/ (overrides mvj.toml and env).
    #[arg(long)]
    api_url: Option<String>,
    /// Bearer token (overrides mvj.toml and env).
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Leases(LeaseCommand),
    #[command(subcommand)]
    Contacts(ContactCommand),
    #[command(subcommand)]
    Invoices(InvoiceCommand),
    #[command(subcommand)]
    RentBasis(RentBasisCommand),
    #[command(subcommand)]
    Comments(CommentCommand),
}

#[derive(Subcommand, Debug)]
enum LeaseCommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Lease with its comments and invoices.
    Show { id: i64 },
    Attributes,
    Create {
        /// JSON object.
        payload: String,
    },
    Patch { id: i64, payload: String },
}

#[derive(Subcommand, Debug)]
enum ContactCommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
    Show { id: i64 },
    Create { payload: String },
    /// Replaces the whole contact record.
    Edit { id: i64, payload: String },
}

#[derive(Subcommand, Debug)]
enum InvoiceCommand {
    ByLease { lease_id: i64 },
}

#[derive(Subcommand, Debug)]
enum RentBasisCommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
    Show { id: i64 },
}

#[derive(Subcommand, Debug)]
enum CommentCommand {
    ByLease {
        lease_id: i64,
    },
    Add {
        lease_id: i64,
        text: String,
        #[arg(long)]
        topic: Option<i64>,
    },
    Edit {
        lease_id: i64,
        id: i64,
        text: String,
    },
    Delete {
        lease_id: i64,
        id: i64,
    },
}

/// No router in a terminal; the target route is printed instead.
struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, path: &str) {
        println!("-> {path}");
    }
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        println!("{message}");
    }

    // The command result already carries the error text.
    fn error(&self, message: &str) {
        tracing::debug!(message, "error notification");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_url = normalize_api_url(&api_url);
    }
    if let Some(token) = cli.token.filter(|token| !token.trim().is_empty()) {
        settings.api_token = Some(token);
    }

    let filter =
        EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let client = MvjClient::new_with_notifier(
        &settings,
        Arc::new(PrintNavigator),
        Arc::new(ConsoleNotifier),
    )?;
    let orchestrator = client.orchestrator();

    let output = match cli.command {
        Command::Leases(command) => {
            commands::leases(command, orchestrator, settings.page_size).await?
        }
        Command::Contacts(command) => {
            commands::contacts(command, orchestrator, settings.page_size).await?
        }
        Command::Invoices(command) => commands::invoices(command, orchestrator).await?,
        Command::RentBasis(command) => {
            commands::rent_basis(command, orchestrator, settings.page_size).await?
        }
        Command::Comments(command) => commands::comments(command, orchestrator).await?,
    };
    print!("{output}");

    Ok(())
}
