use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Bot configuration loaded from YAML file
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub reset: ResetConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token (overridden by TELEGRAM_BOT_TOKEN)
    #[serde(default)]
    pub bot_token: String,
    /// Operator user id for restricted commands (overridden by ADMIN_ID)
    #[serde(default)]
    pub admin_id: Option<i64>,
    /// getUpdates long-poll duration (s)
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    /// API request timeout (ms); must exceed the long-poll duration
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelsConfig {
    /// Channel publishing game results (overridden by RESULTS_CHANNEL_ID)
    #[serde(default)]
    pub results_channel_id: i64,
    /// Channel publishing per-suit counters (overridden by STATS_CHANNEL_ID)
    #[serde(default)]
    pub stats_channel_id: i64,
    /// Destination channel for predictions (overridden by
    /// PREDICTION_CHANNEL_ID); unset means predictions are tracked
    /// in-memory but never displayed
    #[serde(default)]
    pub prediction_channel_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictorConfig {
    /// Added to the last seen game number to pick the predicted game
    #[serde(default = "default_game_offset")]
    pub game_offset: u64,
    /// Min counter difference on the ♠️/♦️ mirror before a trigger
    #[serde(default = "default_mirror_threshold")]
    pub spade_diamond_threshold: u32,
    /// Min counter difference on the ❤️/♣️ mirror before a trigger
    #[serde(default = "default_mirror_threshold")]
    pub heart_club_threshold: u32,
    /// Minutes between win/loss reports (0 disables)
    #[serde(default)]
    pub report_interval_min: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    /// Local hour of the daily full-state clear
    #[serde(default)]
    pub hour: u32,
    /// Operating timezone as whole hours east of UTC
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Health endpoint port (overridden by PORT)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_poll_timeout() -> u64 {
    5
}
fn default_request_timeout() -> u64 {
    15_000
}
fn default_game_offset() -> u64 {
    1
}
fn default_mirror_threshold() -> u32 {
    10
}
fn default_utc_offset() -> i32 {
    1
}
fn default_port() -> u16 {
    8080
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            admin_id: None,
            poll_timeout_secs: default_poll_timeout(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            game_offset: default_game_offset(),
            spade_diamond_threshold: default_mirror_threshold(),
            heart_club_threshold: default_mirror_threshold(),
            report_interval_min: 0,
        }
    }
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            hour: 0,
            utc_offset_hours: default_utc_offset(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            channels: ChannelsConfig::default(),
            predictor: PredictorConfig::default(),
            reset: ResetConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl BotConfig {
    /// Load configuration from YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: BotConfig =
            serde_yaml::from_str(&contents).with_context(|| "Failed to parse YAML configuration")?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = val;
        }
        if let Ok(val) = std::env::var("ADMIN_ID") {
            if let Ok(id) = val.parse() {
                self.telegram.admin_id = Some(id);
            }
        }
        if let Ok(val) = std::env::var("RESULTS_CHANNEL_ID") {
            self.channels.results_channel_id = val.parse().unwrap_or(self.channels.results_channel_id);
        }
        if let Ok(val) = std::env::var("STATS_CHANNEL_ID") {
            self.channels.stats_channel_id = val.parse().unwrap_or(self.channels.stats_channel_id);
        }
        if let Ok(val) = std::env::var("PREDICTION_CHANNEL_ID") {
            if let Ok(id) = val.parse() {
                self.channels.prediction_channel_id = Some(id);
            }
        }
        if let Ok(val) = std::env::var("PORT") {
            self.server.port = val.parse().unwrap_or(self.server.port);
        }
    }
}
