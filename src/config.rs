//! Configuration types for market-dash

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub collector: CollectorConfig,
    pub feed: FeedConfig,
    pub storage: StorageConfig,
    pub validation: ValidationConfig,
    pub risk: RiskConfig,
    pub ai: AiConfig,
    pub api: ApiConfig,
    pub telemetry: TelemetryConfig,
}

/// Tick collection and bar aggregation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Canonical symbols to poll
    pub symbols: Vec<String>,
    /// Seconds between polls
    pub tick_interval_secs: u64,
    /// Seconds per OHLC bar
    pub bar_interval_secs: u64,
    /// A stored or last accepted price older than this many bars no longer
    /// anchors the jump filter
    pub reference_max_age_bars: u32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            symbols: vec![
                "GBPUSD".to_string(),
                "EURUSD".to_string(),
                "BTCUSD".to_string(),
            ],
            tick_interval_secs: 5,
            bar_interval_secs: 300,
            reference_max_age_bars: 3,
        }
    }
}

/// Market data provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Provider: "yahoo" or "simulated"
    pub provider: FeedProvider,
    /// Base URL of the chart API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Canonical symbol -> provider ticker
    pub tickers: HashMap<String, String>,
}

/// Which price source backs the collector
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedProvider {
    #[default]
    Yahoo,
    Simulated,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let tickers = [
            ("GBPUSD", "GBPUSD=X"),
            ("EURUSD", "EURUSD=X"),
            ("BTCUSD", "BTC-USD"),
        ]
        .into_iter()
        .map(|(s, t)| (s.to_string(), t.to_string()))
        .collect();

        Self {
            provider: FeedProvider::Yahoo,
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
            tickers,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
    pub backup_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/market.db"),
            backup_dir: PathBuf::from("backups"),
        }
    }
}

/// Tick sanity checks
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Plausible `[min, max]` price band per canonical symbol
    pub bands: HashMap<String, [f64; 2]>,
    /// Reject a tick that moves more than this fraction from the last accepted one
    pub max_jump_pct: f64,
    /// Consecutive jump rejections within `max_jump_pct` of each other that
    /// move the reference to the new level
    pub reanchor_after: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let bands = [
            ("GBPUSD", [0.8, 2.0]),
            ("EURUSD", [0.7, 1.6]),
            ("BTCUSD", [1_000.0, 1_000_000.0]),
        ]
        .into_iter()
        .map(|(s, b)| (s.to_string(), b))
        .collect();

        Self {
            bands,
            max_jump_pct: 0.05,
            reanchor_after: 3,
        }
    }
}

/// Risk engine parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Rolling window length in bars
    pub volatility_window: usize,
    /// |Z| above which a price is anomalous
    pub anomaly_threshold: f64,
    /// Rolling return std above which volatility is "high"
    pub high_volatility_threshold: f64,
    /// Default number of closes analysed
    pub default_points: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            volatility_window: 20,
            anomaly_threshold: 2.5,
            high_volatility_threshold: 0.02,
            default_points: 300,
        }
    }
}

/// LLM summary configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_calls_per_day: u32,
    pub cooldown_secs: u64,
    /// How long a generated summary is served from cache
    pub cache_ttl_secs: u64,
    pub lookback_days: i64,
    pub usage_file: PathBuf,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 250,
            timeout_secs: 10,
            max_calls_per_day: 20,
            cooldown_secs: 300,
            cache_ttl_secs: 300,
            lookback_days: 7,
            usage_file: PathBuf::from("data/ai_usage.json"),
        }
    }
}

impl AiConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// REST API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Symbol used when a request omits one
    pub default_symbol: String,
    pub default_limit: usize,
    pub max_limit: usize,
    /// Simple moving average periods drawn on the dashboard
    pub ma_periods: Vec<usize>,
    /// Exponential moving average periods drawn on the dashboard
    pub ema_periods: Vec<usize>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            default_symbol: "GBPUSD".to_string(),
            default_limit: 500,
            max_limit: 5000,
            ma_periods: vec![5, 20],
            ema_periods: vec![12],
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Prometheus exporter port, disabled when unset
    pub metrics_port: Option<u16>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config from {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Load configuration, falling back to defaults only when the file is missing
    ///
    /// Syntax errors and failed validation are returned, never replaced.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                eprintln!("Warning: {} not found, using default configuration", path.display());
                Ok(Self::default())
            }
            Err(e) => {
                Err(e).with_context(|| format!("Could not read config from {}", path.display()))
            }
        }
    }

    /// Parse and validate TOML configuration text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the collector or risk engine cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        let c = &self.collector;
        if c.symbols.is_empty() {
            anyhow::bail!("collector.symbols must not be empty");
        }
        if c.tick_interval_secs == 0 {
            anyhow::bail!("collector.tick_interval_secs must be positive");
        }
        if c.bar_interval_secs == 0 || 86_400 % c.bar_interval_secs != 0 {
            anyhow::bail!(
                "collector.bar_interval_secs must divide a day, got {}",
                c.bar_interval_secs
            );
        }
        if c.reference_max_age_bars == 0 {
            anyhow::bail!("collector.reference_max_age_bars must be positive");
        }
        if self.validation.reanchor_after < 2 {
            anyhow::bail!("validation.reanchor_after must be at least 2");
        }
        if self.risk.volatility_window < 2 {
            anyhow::bail!("risk.volatility_window must be at least 2");
        }
        let jump = self.validation.max_jump_pct;
        if !jump.is_finite() || jump <= 0.0 {
            anyhow::bail!("validation.max_jump_pct must be positive");
        }
        for (symbol, [min, max]) in &self.validation.bands {
            if !min.is_finite() || !max.is_finite() || min >= max {
                anyhow::bail!("validation band for {} is empty: [{}, {}]", symbol, min, max);
            }
        }
        if self.api.max_limit == 0 {
            anyhow::bail!("api.max_limit must be positive");
        }
        Ok(())
    }
}
