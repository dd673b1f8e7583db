use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use rasbot::application::errors::{BotError, ConfigError};
use rasbot::application::messaging::MessageDispatcher;
use rasbot::application::services::Session;
use rasbot::domain::traits::{AuthProvider, ConfigStore};
use rasbot::infrastructure::adapters::ConsoleAdapter;
use rasbot::infrastructure::auth::StaticAuth;
use rasbot::infrastructure::config::Config;
use rasbot::infrastructure::plugins::ModuleLoader;
use rasbot::infrastructure::storage::JsonFileStore;

#[derive(Parser)]
#[command(name = "rasbot")]
#[command(about = "A modular chat bot with template commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: String,

    /// Only run this channel (id or name)
    #[arg(long, global = true)]
    channel: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

/// A running channel: its console and the dispatcher feeding its session
struct Channel {
    console: Arc<ConsoleAdapter>,
    dispatcher: MessageDispatcher,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Run => {
            if let Err(e) = run_bot(&cli.config, cli.channel.as_deref()) {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("rasbot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn run_bot(config_path: &str, only: Option<&str>) -> Result<(), BotError> {
    // Load config
    let config = if std::path::Path::new(config_path).exists() {
        Config::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        })
    } else {
        Config::load_env()
    };

    tracing::info!("Starting rasbot: {}", config.bot.name);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::Internal(format!("failed to start runtime: {}", e)))?;
    rt.block_on(run_channels(config, only))
}

async fn run_channels(config: Config, only: Option<&str>) -> Result<(), BotError> {
    let store: Arc<dyn ConfigStore> = Arc::new(JsonFileStore::new(&config.bot.data_dir));
    let auth: Option<Arc<dyn AuthProvider>> = StaticAuth::from_config(&config.auth)
        .map(|a| Arc::new(a) as Arc<dyn AuthProvider>);

    let entries = config.channels(only);
    if entries.is_empty() {
        return Err(ConfigError::InvalidValue(format!(
            "no channel to run{}",
            only.map(|o| format!(" matching '{}'", o)).unwrap_or_default()
        ))
        .into());
    }

    let mut channels = Vec::new();
    for entry in entries {
        let console = Arc::new(ConsoleAdapter::new(&entry.name));

        let mut builder = Session::builder(&entry.id, store.clone(), console.clone())
            .delimiter(config.bot.mention_delimiter)
            .default_prefix(&config.bot.default_prefix)
            .loader(ModuleLoader::new(&config.modules.directory));
        if let Some(auth) = &auth {
            builder = builder.auth(auth.clone());
        }

        let session = builder.build()?;
        tracing::info!(
            "Joined #{} ({}) with prefix '{}' and {} command(s)",
            entry.name,
            entry.id,
            session.prefix(),
            session.commands().len()
        );
        channels.push(Channel {
            console,
            dispatcher: MessageDispatcher::new(session),
        });
    }

    tracing::info!("Type lines as 'name[@role]: text'; start with '#channel' to pick a channel");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => route_line(&channels, &line),
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to read stdin: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, tearing down modules");
                break;
            }
        }
    }

    for channel in &channels {
        channel.dispatcher.session().shutdown();
    }
    Ok(())
}

/// Hand a console line to its channel; the first channel unless `#name` leads
fn route_line(channels: &[Channel], line: &str) {
    let (target, line) = match line.trim_start().strip_prefix('#') {
        Some(rest) => {
            let (name, rest) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let found = channels
                .iter()
                .find(|c| c.console.channel() == name || c.dispatcher.session().id() == name);
            match found {
                Some(channel) => (channel, rest),
                None => {
                    tracing::warn!("No channel named {}", name);
                    return;
                }
            }
        }
        None => match channels.first() {
            Some(channel) => (channel, line),
            None => return,
        },
    };

    if let Some((author, text)) = target.console.parse_line(line) {
        target.dispatcher.handle_line(author, &text);
    }
}

fn init_config() {
    match Config::default().to_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => tracing::error!("Failed to render default config: {}", e),
    }
}
