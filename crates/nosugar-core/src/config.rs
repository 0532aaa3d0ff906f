use chrono::{FixedOffset, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::NoSugarError;

/// Env var that overrides `channel.telegram.bot_token`.
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Env var that overrides `provider.deepseek.api_key`.
pub const DEEPSEEK_KEY_ENV: &str = "DEEPSEEK_API_KEY";

/// Top-level NoSugar configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Card number shown in the slip-up "penalty" reminder. Unset = no reminder.
    #[serde(default)]
    pub payment_card: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            payment_card: None,
        }
    }
}

/// Provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider")]
    pub default: String,
    #[serde(default)]
    pub deepseek: Option<OpenAiConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default: default_provider(),
            deepseek: Some(OpenAiConfig::default()),
        }
    }
}

/// OpenAI-compatible provider config (DeepSeek by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub telegram: Option<TelegramConfig>,
}

/// Telegram bot config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    /// Telegram user ids allowed to talk to the bot. Empty = everyone.
    #[serde(default)]
    pub allowed_users: Vec<i64>,
}

/// Storage config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Scheduler configuration: daily reminder and weekly challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fixed UTC offset all wall-clock times are evaluated in.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,
    /// Daily check-in reminder, "HH:MM".
    #[serde(default = "default_reminder_time")]
    pub reminder_time: String,
    /// Weekly challenge time, "HH:MM".
    #[serde(default = "default_challenge_time")]
    pub challenge_time: String,
    /// Weekly challenge day, e.g. "Mon" or "Monday".
    #[serde(default = "default_challenge_weekday")]
    pub challenge_weekday: String,
    /// Wait before retrying a failed firing.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,
    /// Attempts per firing before giving up on that slot.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            utc_offset_hours: default_utc_offset(),
            reminder_time: default_reminder_time(),
            challenge_time: default_challenge_time(),
            challenge_weekday: default_challenge_weekday(),
            retry_backoff_secs: default_retry_backoff(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl SchedulerConfig {
    /// The fixed timezone.
    pub fn timezone(&self) -> Result<FixedOffset, NoSugarError> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                NoSugarError::Config(format!(
                    "utc_offset_hours out of range: {}",
                    self.utc_offset_hours
                ))
            })
    }

    pub fn reminder_at(&self) -> Result<NaiveTime, NoSugarError> {
        parse_hhmm(&self.reminder_time)
    }

    pub fn challenge_at(&self) -> Result<NaiveTime, NoSugarError> {
        parse_hhmm(&self.challenge_time)
    }

    pub fn weekday(&self) -> Result<Weekday, NoSugarError> {
        self.challenge_weekday.parse::<Weekday>().map_err(|_| {
            NoSugarError::Config(format!(
                "invalid challenge_weekday '{}'",
                self.challenge_weekday
            ))
        })
    }
}

/// Parse a wall-clock "HH:MM" time.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime, NoSugarError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| NoSugarError::Config(format!("invalid time '{s}' (expected HH:MM): {e}")))
}

// --- Default value functions ---

fn default_name() -> String {
    "NoSugar".to_string()
}
fn default_data_dir() -> String {
    "~/.nosugar".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_provider() -> String {
    "deepseek".to_string()
}
fn default_true() -> bool {
    true
}
fn default_model() -> String {
    "deepseek-chat".to_string()
}
fn default_base_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}
fn default_db_path() -> String {
    "~/.nosugar/nosugar.db".to_string()
}
fn default_utc_offset() -> i32 {
    6
}
fn default_reminder_time() -> String {
    "19:00".to_string()
}
fn default_challenge_time() -> String {
    "07:00".to_string()
}
fn default_challenge_weekday() -> String {
    "Mon".to_string()
}
fn default_retry_backoff() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    3
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist. Secrets from the
/// environment take precedence over the file.
pub fn load(path: &str) -> Result<Config, NoSugarError> {
    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NoSugarError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str::<Config>(&content)
            .map_err(|e| NoSugarError::Config(format!("failed to parse config: {}", e)))?
    } else {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    };

    apply_env_overrides(
        &mut config,
        std::env::var(TELEGRAM_TOKEN_ENV).ok(),
        std::env::var(DEEPSEEK_KEY_ENV).ok(),
    );
    validate(&config)?;
    Ok(config)
}

/// Apply secrets taken from the environment.
fn apply_env_overrides(
    config: &mut Config,
    telegram_token: Option<String>,
    deepseek_key: Option<String>,
) {
    if let Some(token) = telegram_token.filter(|t| !t.is_empty()) {
        let tg = config
            .channel
            .telegram
            .get_or_insert_with(|| TelegramConfig {
                enabled: true,
                ..Default::default()
            });
        tg.bot_token = token;
    }
    if let Some(key) = deepseek_key.filter(|k| !k.is_empty()) {
        config
            .provider
            .deepseek
            .get_or_insert_with(OpenAiConfig::default)
            .api_key = key;
    }
}

/// Reject scheduler settings that would only fail later at runtime.
fn validate(config: &Config) -> Result<(), NoSugarError> {
    let s = &config.scheduler;
    s.timezone()?;
    s.reminder_at()?;
    s.challenge_at()?;
    s.weekday()?;
    if s.max_attempts == 0 {
        return Err(NoSugarError::Config(
            "scheduler.max_attempts must be at least 1".into(),
        ));
    }
    Ok(())
}
