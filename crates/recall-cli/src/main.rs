//! `recall` — CLI front end for the distributed command-history store.

mod logging;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use recall_store::{HistoryClient, StoreConfig, StoreError};
use recall_types::{HistoryRecord, Mode, SaveOptions, SearchOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "recall", version, about = "Distributed command-history store")]
struct Cli {
    /// TOML config file (defaults to config/recall.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database URL: libsql://... for remote, otherwise a local file path.
    #[arg(long, global = true, env = "RECALL_DB_URL")]
    url: Option<String>,

    /// Auth token for remote databases.
    #[arg(long, global = true, env = "RECALL_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Remote URL to sync a local replica against.
    #[arg(long, global = true, env = "RECALL_SYNC_URL")]
    sync_url: Option<String>,

    /// Operating mode: global, user, machine, or hybrid.
    #[arg(long, global = true)]
    mode: Option<String>,

    /// Resolve this user before running the command.
    #[arg(long, global = true)]
    user: Option<String>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, global = true)]
    debug: bool,

    #[arg(long, global = true)]
    quiet: bool,

    /// Log output format: text or json.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a command/response pair.
    Save {
        command: String,
        #[arg(long)]
        response: Option<String>,
        #[arg(long)]
        tokens: Option<i64>,
        /// Execution time in milliseconds (feeds the cache running average).
        #[arg(long)]
        exec_ms: Option<i64>,
        /// Tags, repeatable (global partition only).
        #[arg(long)]
        tag: Vec<String>,
        /// Free-form context (user partition only).
        #[arg(long)]
        context: Option<String>,
        /// Exit/error code (machine partition only).
        #[arg(long)]
        error_code: Option<i64>,
        /// Skip the command-cache upsert.
        #[arg(long)]
        no_cache: bool,
    },
    /// Show recent history in the current mode.
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Substring search over command and response text.
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Scope override; defaults to the active mode.
        #[arg(long)]
        scope: Option<String>,
    },
    /// Usage counts and top commands over a rolling window.
    Stats {
        #[arg(long, default_value_t = 1)]
        days: u32,
    },
    /// Look up the cached result for a command.
    Cached { command: String },
    /// Directory administration.
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Push local replica writes to the remote.
    Sync,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user.
    Add {
        username: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Deactivate a user; lookups then treat them as not found.
    Deactivate { username: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => StoreConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StoreConfig::load()?,
    };
    if let Some(url) = cli.url {
        config.url = url;
    }
    if let Some(token) = cli.auth_token {
        config.auth_token = Some(token);
    }
    if let Some(sync_url) = cli.sync_url {
        config.sync_url = Some(sync_url);
    }
    if let Some(mode) = &cli.mode {
        config.mode = mode
            .parse::<Mode>()
            .map_err(anyhow::Error::msg)?;
    }
    if cli.debug {
        config.debug = true;
    }

    let format = cli
        .log_format
        .parse::<logging::LogFormat>()
        .map_err(anyhow::Error::msg)?;
    // The debug preset can come from the flag or from the config file.
    logging::init(
        logging::LogPreset::from_flags(cli.verbose, config.debug, cli.quiet),
        format,
    );

    let mut client = HistoryClient::connect(config).await?;

    if let Some(username) = &cli.user {
        match client.set_user(Some(username)).await {
            Ok(_) => {}
            Err(StoreError::UserNotFound(name)) => {
                bail!(
                    "user '{}' not found or inactive; create the user first: recall user add {}",
                    name,
                    name
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    let result = run(&client, cli.command).await;
    client.close().await?;
    result
}

async fn run(client: &HistoryClient, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Save {
            command,
            response,
            tokens,
            exec_ms,
            tag,
            context,
            error_code,
            no_cache,
        } => {
            let receipt = client
                .save_command(
                    &command,
                    response.as_deref(),
                    SaveOptions {
                        tokens_used: tokens,
                        execution_time_ms: exec_ms,
                        tags: tag,
                        context,
                        error_code,
                        skip_cache: no_cache,
                        ..Default::default()
                    },
                )
                .await?;
            let partitions: Vec<&str> = receipt
                .written
                .iter()
                .map(|(p, _)| p.as_str())
                .collect();
            println!("saved to {} ({})", partitions.join(", "), receipt.session_id);
        }
        Commands::History { limit, offset } => {
            for record in client.get_history(limit, offset).await? {
                print_record(&record);
            }
        }
        Commands::Search { query, limit, scope } => {
            let mode = match scope {
                Some(s) => Some(s.parse::<Mode>().map_err(anyhow::Error::msg)?),
                None => None,
            };
            let records = client
                .search_history(
                    &query,
                    SearchOptions {
                        mode,
                        limit: Some(limit),
                    },
                )
                .await?;
            for record in &records {
                print_record(record);
            }
        }
        Commands::Stats { days } => {
            let stats = client.get_stats(days).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Cached { command } => match client.get_cached_command(&command).await? {
            Some(entry) => {
                println!(
                    "{} (runs: {}, avg: {:.1} ms, last: {})",
                    entry.output.as_deref().unwrap_or("<no output>"),
                    entry.execution_count,
                    entry.avg_execution_time_ms,
                    format_ts(entry.last_executed),
                );
            }
            None => println!("cache miss"),
        },
        Commands::User { action } => match action {
            UserAction::Add { username, name, email } => {
                let user = client
                    .create_user(&username, name.as_deref(), email.as_deref())
                    .await?;
                println!("created user {} ({})", user.username, user.id);
            }
            UserAction::Deactivate { username } => {
                if client.deactivate_user(&username).await? {
                    println!("deactivated {}", username);
                } else {
                    bail!("no such user: {}", username);
                }
            }
        },
        Commands::Sync => {
            client.sync().await?;
            println!("synced");
        }
    }
    Ok(())
}

fn print_record(record: &HistoryRecord) {
    let source = record
        .source
        .map(|p| format!(" [{}]", p))
        .unwrap_or_default();
    println!(
        "{}{}  {}  ->  {}",
        format_ts(record.timestamp),
        source,
        record.command,
        record.response.as_deref().unwrap_or("<pending>"),
    );
}

fn format_ts(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}
