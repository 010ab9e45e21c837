//! Auto-Reply Bot - Entry Point

use autoreply_bot::channels::discord;
use autoreply_bot::{Config, Dispatcher, RuleManager, RuleStore};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let json_logs = args.iter().any(|a| a == "--json-logs");
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");

    if help_mode {
        println!("Auto-Reply Bot v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: autoreply-bot [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --json-logs        Log as JSON to stderr");
        println!("  --help, -h         Show this help");
        println!();
        println!("Environment variables:");
        println!("  DISCORD_BOT_TOKEN      Discord bot token (required)");
        println!("  AUTOREPLY_DATA_PATH    Rule file (default: auto_replies.json)");
        println!("  EXCHANGERATE_API_KEY   exchangerate-api.com key for /convert");
        println!("  EXCHANGERATE_BASE_URL  Exchange-rate API host");
        println!("  NEWS_BASE_URL          RSS host for /analisis");
        println!("  ANALISIS_GUILD_ID      Restrict /analisis to one server");
        println!("  ANALISIS_CHANNEL_ID    Restrict /analisis to one channel");
        println!("  HTTP_TIMEOUT_SECS      Outbound HTTP timeout (default: 10)");
        println!("  RUST_LOG               Log filter (default: info,serenity=warn)");
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,serenity=warn"));

    if json_logs {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("Auto-Reply Bot v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}. Set it in the environment or a .env file.", e);
            return Err(e);
        }
    };

    let rules = Arc::new(RuleManager::open(RuleStore::new(&config.data_path)));
    let stats = rules.stats();
    info!(
        "Loaded {} auto-reply rule(s) across {} server(s) from {}",
        stats.rules,
        stats.scopes,
        config.data_path.display()
    );

    let dispatcher = Arc::new(Dispatcher::from_config(&config, rules));
    discord::run(&config, dispatcher).await
}
