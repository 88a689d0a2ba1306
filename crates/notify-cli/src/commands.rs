use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use notify_server::{NotifyServer, ServerConfig};
use notify_store::{BasePermissions, RelationalIndex, SqliteRelationalIndex};
use notify_types::{parse_objpath, sanitise_base_uri, ParsedKey};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Parse(args) => cmd_parse(&config, args, &cli.format),
        Command::BaseUri(args) => match args.command {
            BaseUriCommand::Add { base_uri, db } => cmd_base_uri_add(&open(&config, &db)?, &base_uri),
            BaseUriCommand::List { db } => cmd_base_uri_list(&open(&config, &db)?, &cli.format),
        },
        Command::Grant(args) => cmd_grant(&open(&config, &args.db)?, args),
        Command::Datasets(args) => cmd_datasets(&open(&config, &args.db)?, &args.user, &cli.format),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => ServerConfig::from_env().context("reading configuration from the environment"),
    }
}

fn db_path(config: &ServerConfig, db: &DbArgs) -> PathBuf {
    db.db.clone().unwrap_or_else(|| config.relational_db.clone())
}

fn open(config: &ServerConfig, db: &DbArgs) -> anyhow::Result<SqliteRelationalIndex> {
    let path = db_path(config, db);
    SqliteRelationalIndex::open(&path)
        .with_context(|| format!("opening relational index {}", path.display()))
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let server = NotifyServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_parse(config: &ServerConfig, args: ParseArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let parsed = parse_objpath(&args.objpath, &config.bucket_to_base_uri);
    if *format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }
    print_parsed(&args.objpath, &parsed);
    Ok(())
}

fn print_parsed(objpath: &str, parsed: &ParsedKey) {
    let missing = || "-".dimmed().to_string();
    println!("Key {}", objpath.bold());
    println!(
        "  Base URI: {}",
        parsed.base_uri.as_deref().map_or_else(missing, |b| b.cyan().to_string())
    );
    println!(
        "  UUID:     {}",
        parsed.uuid.as_deref().map_or_else(missing, |u| u.yellow().to_string())
    );
    println!(
        "  Kind:     {}",
        parsed.kind.as_ref().map_or_else(missing, |k| k.as_str().green().to_string())
    );
    if parsed.identity().is_none() {
        println!("  {} no dataset identity, notifications for this key are ignored", "!".yellow().bold());
    }
}

fn cmd_base_uri_add(index: &dyn RelationalIndex, base_uri: &str) -> anyhow::Result<()> {
    let base_uri = sanitise_base_uri(base_uri)?;
    if index.register_base_uri(&base_uri)? {
        println!("{} Registered {}", "✓".green().bold(), base_uri.cyan());
    } else {
        println!("{} is already registered", base_uri.cyan());
    }
    Ok(())
}

fn cmd_base_uri_list(index: &dyn RelationalIndex, format: &OutputFormat) -> anyhow::Result<()> {
    let mut all = Vec::new();
    for base_uri in index.list_base_uris()? {
        let permissions = index
            .permissions(&base_uri)?
            .unwrap_or_else(|| BasePermissions::new(base_uri.clone()));
        all.push(permissions);
    }
    if *format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }
    if all.is_empty() {
        println!("No base URIs registered.");
    }
    for p in &all {
        println!("{}", p.base_uri.cyan().bold());
        println!("  search:   {}", p.users_with_search_permissions.join(", "));
        println!("  register: {}", p.users_with_register_permissions.join(", "));
    }
    Ok(())
}

fn cmd_grant(index: &dyn RelationalIndex, args: GrantArgs) -> anyhow::Result<()> {
    let permissions = BasePermissions {
        base_uri: sanitise_base_uri(&args.base_uri)?,
        users_with_search_permissions: args.search,
        users_with_register_permissions: args.register,
    };
    index.update_permissions(&permissions)?;
    println!(
        "{} {}: {} searching, {} registering",
        "✓".green().bold(),
        permissions.base_uri.cyan(),
        permissions.users_with_search_permissions.len(),
        permissions.users_with_register_permissions.len(),
    );
    Ok(())
}

fn cmd_datasets(index: &dyn RelationalIndex, user: &str, format: &OutputFormat) -> anyhow::Result<()> {
    let datasets = index.list_datasets_by_user(user)?;
    if *format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&datasets)?);
        return Ok(());
    }
    if datasets.is_empty() {
        println!("No datasets visible to {}.", user.bold());
    }
    for d in &datasets {
        println!("{}  {}  {}", d.uuid.yellow(), d.name.bold(), d.uri.dimmed());
    }
    Ok(())
}
