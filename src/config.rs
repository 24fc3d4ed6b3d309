use crate::api::cfbd_api::RetryPolicy;
use crate::error::CfbError;
use crate::features::FeatureDefaults;
use crate::picks::staking::KellySettings;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by every subcommand. Each flag can also come from the
/// environment (or a `.env` file), and may be given before or after the
/// subcommand.
#[derive(Args, Debug, Clone)]
pub struct Config {
    /// CollegeFootballData API key
    #[arg(long, global = true, env = "CFBD_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// CollegeFootballData API base URL
    #[arg(
        long,
        global = true,
        env = "CFBD_BASE_URL",
        default_value = "https://api.collegefootballdata.com"
    )]
    pub base_url: String,

    /// Prediction ledger (CSV)
    #[arg(long, global = true, env = "HISTORY_FILE", default_value = "live_predictions.csv")]
    pub history_file: PathBuf,

    /// Directory holding model_spread.json, model_total.json and model_winner.json
    #[arg(long, global = true, env = "MODEL_DIR", default_value = "models")]
    pub model_dir: PathBuf,

    /// Directory for cached API responses
    #[arg(long, global = true, env = "CACHE_DIR", default_value = "cache")]
    pub cache_dir: PathBuf,

    /// Serve API responses from the cache directory when present
    #[arg(long, global = true, env = "USE_CACHE")]
    pub use_cache: bool,

    /// Bookmakers whose lines are eligible for shopping
    #[arg(
        long,
        global = true,
        env = "VALID_BOOKS",
        value_delimiter = ',',
        default_value = "DraftKings,FanDuel,BetMGM,Caesars,PointsBet,BetRivers,Unibet"
    )]
    pub valid_books: Vec<String>,

    /// Talent composite assumed for teams missing from /talent
    #[arg(long, global = true, env = "DEFAULT_TALENT", default_value = "10.0")]
    pub default_talent: f64,

    /// SRS rating assumed for teams missing from /ratings/srs
    #[arg(
        long,
        global = true,
        env = "DEFAULT_SRS",
        default_value = "-5.0",
        allow_negative_numbers = true
    )]
    pub default_srs: f64,

    /// Over/under used when a line quotes a spread but no total
    #[arg(long, global = true, env = "DEFAULT_TOTAL", default_value = "55.5")]
    pub default_total: f64,

    /// Bankroll used for Kelly stake sizing (USD)
    #[arg(long, global = true, env = "BANKROLL", default_value = "1000.0")]
    pub bankroll: f64,

    /// Fractional Kelly multiplier (0.0–1.0)
    #[arg(long, global = true, env = "KELLY_FRACTION", default_value = "0.25")]
    pub kelly_fraction: f64,

    /// Maximum attempts per API request
    #[arg(long, global = true, env = "CFBD_MAX_ATTEMPTS", default_value = "3")]
    pub max_attempts: u32,

    /// Delay after every successful API call, in milliseconds
    #[arg(long, global = true, env = "CFBD_REQUEST_DELAY_MS", default_value = "500")]
    pub request_delay_ms: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.kelly_fraction) {
            anyhow::bail!("kelly_fraction must be between 0.0 and 1.0");
        }
        if self.bankroll <= 0.0 {
            anyhow::bail!("bankroll must be positive");
        }
        if self.valid_books.iter().all(|b| b.trim().is_empty()) {
            anyhow::bail!("valid_books must name at least one bookmaker");
        }
        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }
        Ok(())
    }

    pub fn api_key(&self) -> Result<&str, CfbError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(CfbError::MissingApiKey)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            request_delay: Duration::from_millis(self.request_delay_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn feature_defaults(&self) -> FeatureDefaults {
        FeatureDefaults {
            talent: self.default_talent,
            srs: self.default_srs,
            total: self.default_total,
        }
    }

    pub fn kelly(&self) -> KellySettings {
        KellySettings {
            bankroll: self.bankroll,
            fraction: self.kelly_fraction,
            ..KellySettings::default()
        }
    }

    pub fn books(&self) -> Vec<String> {
        self.valid_books
            .iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect()
    }
}
