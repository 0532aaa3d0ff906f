mod gateway;
mod generator;
mod keyboards;
mod motivation;
mod state;

use clap::{Parser, Subcommand};
use generator::Generator;
use nosugar_channels::TelegramChannel;
use nosugar_core::{
    config::{self, Config},
    shellexpand,
    traits::{Channel, Provider},
};
use nosugar_memory::Store;
use nosugar_providers::OpenAiProvider;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[derive(Parser)]
#[command(
    name = "nosugar",
    version,
    about = "NoSugar: a Telegram companion for quitting sugar"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Show configuration, backend availability and user counts.
    Status,
    /// Send the daily check-in reminder to one user now.
    Remind {
        /// Telegram user id.
        telegram_id: i64,
    },
    /// Issue a weekly challenge to one user now.
    Challenge {
        /// Telegram user id.
        telegram_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_logging(&cfg)?;

    match cli.command {
        Commands::Start => {
            let gw = build_gateway(&cfg).await?;
            info!("{} starting", cfg.bot.name);
            Arc::new(gw).run().await?;
        }
        Commands::Status => print_status(&cli.config, &cfg).await?,
        Commands::Remind { telegram_id } => {
            let gw = build_gateway(&cfg).await?;
            gw.remind_user(telegram_id).await?;
            println!("Reminder sent to {telegram_id}.");
        }
        Commands::Challenge { telegram_id } => {
            let gw = build_gateway(&cfg).await?;
            gw.challenge_user(telegram_id).await?;
            println!("Challenge sent to {telegram_id}.");
        }
    }

    Ok(())
}

/// Log to stdout and a daily rolling file under `data_dir/logs`.
///
/// `RUST_LOG` overrides `bot.log_level`. The returned guard flushes the
/// file writer on drop.
fn init_logging(cfg: &Config) -> anyhow::Result<WorkerGuard> {
    let log_dir = PathBuf::from(shellexpand(&cfg.bot.data_dir)).join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file = tracing_appender::rolling::daily(&log_dir, "nosugar.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.bot.log_level)),
        )
        .with_writer(file_writer.and(std::io::stdout))
        .with_ansi(false)
        .init();

    Ok(guard)
}

/// The text backend, if one is enabled and has a key.
fn build_provider(cfg: &Config) -> Option<Arc<dyn Provider>> {
    match cfg.provider.default.as_str() {
        "deepseek" => {
            let ds = cfg.provider.deepseek.as_ref()?;
            if !ds.enabled || ds.api_key.trim().is_empty() {
                return None;
            }
            Some(Arc::new(OpenAiProvider::from_config(ds)))
        }
        other => {
            tracing::warn!("unsupported provider '{other}', using fallback texts only");
            None
        }
    }
}

fn build_channel(cfg: &Config) -> anyhow::Result<Arc<dyn Channel>> {
    let Some(tg) = cfg.channel.telegram.as_ref().filter(|tg| tg.enabled) else {
        anyhow::bail!("Telegram is not enabled. Enable [channel.telegram] in config.toml.");
    };
    if tg.bot_token.is_empty() {
        anyhow::bail!(
            "Telegram is enabled but bot_token is empty. \
             Set it in config.toml or the {} env var.",
            config::TELEGRAM_TOKEN_ENV
        );
    }
    Ok(Arc::new(TelegramChannel::new(tg.clone())))
}

async fn build_gateway(cfg: &Config) -> anyhow::Result<gateway::Gateway> {
    let generator = match build_provider(cfg) {
        Some(provider) => Generator::new(Some(provider)),
        None => {
            info!(
                "no text backend configured (set {}), using fallback texts",
                config::DEEPSEEK_KEY_ENV
            );
            Generator::offline()
        }
    };
    let channel = build_channel(cfg)?;
    let store = Store::new(&cfg.memory).await?;

    Ok(gateway::Gateway::new(
        channel,
        Arc::new(store),
        generator,
        cfg.scheduler.clone(),
        cfg.bot.payment_card.clone(),
    )?)
}

async fn print_status(config_path: &str, cfg: &Config) -> anyhow::Result<()> {
    println!("{} status\n", cfg.bot.name);
    println!("Config: {config_path}");
    println!("Database: {}", shellexpand(&cfg.memory.db_path));
    println!(
        "Scheduler: {} (reminder {}, challenge {} {}, UTC{:+})",
        if cfg.scheduler.enabled { "enabled" } else { "disabled" },
        cfg.scheduler.reminder_time,
        cfg.scheduler.challenge_weekday,
        cfg.scheduler.challenge_time,
        cfg.scheduler.utc_offset_hours,
    );
    println!();

    match build_provider(cfg) {
        Some(p) => println!(
            "  {}: {}",
            p.name(),
            if p.is_available().await {
                "available"
            } else {
                "unreachable"
            }
        ),
        None => println!("  text backend: not configured (fallback texts)"),
    }

    match cfg.channel.telegram {
        Some(ref tg) => println!(
            "  telegram: {}",
            if tg.enabled && !tg.bot_token.is_empty() {
                "configured"
            } else if tg.enabled {
                "enabled but missing bot_token"
            } else {
                "disabled"
            }
        ),
        None => println!("  telegram: not configured"),
    }

    let store = Store::new(&cfg.memory).await?;
    let (total, active) = store.user_counts().await?;
    println!("\nUsers: {total} ({active} active)");
    Ok(())
}
