use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dtool-notify",
    about = "Receive object-storage notifications and keep the dataset lookup indexes current",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file. Defaults plus environment overrides without it.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the notification HTTP server
    Serve(ServeArgs),
    /// Show how an object key is interpreted
    Parse(ParseArgs),
    /// Manage registered base URIs
    BaseUri(BaseUriArgs),
    /// Set the users allowed to search and register under a base URI
    Grant(GrantArgs),
    /// List datasets visible to a user
    Datasets(DatasetsArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<std::net::SocketAddr>,
}

#[derive(Args)]
pub struct ParseArgs {
    /// Object path as it appears after `/notify/all/`
    pub objpath: String,
}

/// Relational index location, overriding the configured one.
#[derive(Args)]
pub struct DbArgs {
    #[arg(long)]
    pub db: Option<PathBuf>,
}

#[derive(Args)]
pub struct BaseUriArgs {
    #[command(subcommand)]
    pub command: BaseUriCommand,
}

#[derive(Subcommand)]
pub enum BaseUriCommand {
    /// Register a base URI
    Add {
        base_uri: String,
        #[command(flatten)]
        db: DbArgs,
    },
    /// List registered base URIs
    List {
        #[command(flatten)]
        db: DbArgs,
    },
}

#[derive(Args)]
pub struct GrantArgs {
    pub base_uri: String,
    /// Users allowed to search (repeatable)
    #[arg(long = "search")]
    pub search: Vec<String>,
    /// Users allowed to register (repeatable)
    #[arg(long = "register")]
    pub register: Vec<String>,
    #[command(flatten)]
    pub db: DbArgs,
}

#[derive(Args)]
pub struct DatasetsArgs {
    #[arg(long)]
    pub user: String,
    #[command(flatten)]
    pub db: DbArgs,
}
