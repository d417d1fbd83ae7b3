//! Bot configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for an override file (explicit path, else ~/.local/share/spendbot/config/spendbot.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override keep their default values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/spendbot.toml");

/// Longest accepted subscription billing cycle (ten years)
pub const MAX_BILLING_CYCLE_DAYS: i64 = 3650;

/// Settings for the budget and subscription logic
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetConfig {
    pub billing_cycle_days: i64,
    pub currency_symbol: String,
}

/// Settings for the Messenger Send API
#[derive(Debug, Clone, PartialEq)]
pub struct MessengerConfig {
    pub graph_api_base: String,
    pub graph_api_version: String,
    pub timeout: Duration,
}

impl MessengerConfig {
    /// Full Send API endpoint, without the access token
    pub fn messages_url(&self) -> String {
        format!(
            "{}/{}/me/messages",
            self.graph_api_base.trim_end_matches('/'),
            self.graph_api_version
        )
    }
}

/// Settings for the chart renderer
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub timeout: Duration,
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub budget: BudgetConfig,
    pub messenger: MessengerConfig,
    pub chart: ChartConfig,
    pub classifier_timeout: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            budget: BudgetConfig {
                billing_cycle_days: 30,
                currency_symbol: "$".to_string(),
            },
            messenger: MessengerConfig {
                graph_api_base: "https://graph.facebook.com".to_string(),
                graph_api_version: "v18.0".to_string(),
                timeout: Duration::from_secs(15),
            },
            chart: ChartConfig {
                url: "https://quickchart.io/chart".to_string(),
                width: 500,
                height: 300,
                timeout: Duration::from_secs(20),
            },
            classifier_timeout: Duration::from_secs(30),
        }
    }
}

impl BotConfig {
    /// Load config from the default override location, falling back to embedded defaults
    pub fn load() -> Result<Self> {
        load_config(default_config_path().as_deref())
    }

    /// Load config from an explicit override path
    ///
    /// A path that does not exist is an error here, unlike the implicit location.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        load_config(Some(path))
    }

    /// Parse config from TOML content, layered over the defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("spendbot").join("config").join("spendbot.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&Path>) -> Result<BotConfig> {
    let content = match override_path {
        Some(path) if path.exists() => fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    budget: Option<RawBudget>,
    messenger: Option<RawMessenger>,
    chart: Option<RawChart>,
    classifier: Option<RawClassifier>,
}

#[derive(Debug, Deserialize)]
struct RawBudget {
    billing_cycle_days: Option<i64>,
    currency_symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessenger {
    graph_api_base: Option<String>,
    graph_api_version: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawChart {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawClassifier {
    timeout_secs: Option<u64>,
}

fn parse_config(content: &str) -> Result<BotConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = BotConfig::default();

    if let Some(budget) = raw.budget {
        if let Some(days) = budget.billing_cycle_days {
            if !(1..=MAX_BILLING_CYCLE_DAYS).contains(&days) {
                return Err(Error::Config(format!(
                    "billing_cycle_days must be between 1 and {}, got {}",
                    MAX_BILLING_CYCLE_DAYS, days
                )));
            }
            config.budget.billing_cycle_days = days;
        }
        if let Some(symbol) = budget.currency_symbol {
            config.budget.currency_symbol = symbol;
        }
    }

    if let Some(messenger) = raw.messenger {
        if let Some(base) = messenger.graph_api_base {
            config.messenger.graph_api_base = base;
        }
        if let Some(version) = messenger.graph_api_version {
            config.messenger.graph_api_version = version;
        }
        if let Some(secs) = messenger.timeout_secs {
            config.messenger.timeout = Duration::from_secs(secs);
        }
    }

    if let Some(chart) = raw.chart {
        if let Some(url) = chart.url {
            config.chart.url = url;
        }
        if let Some(width) = chart.width {
            config.chart.width = width;
        }
        if let Some(height) = chart.height {
            config.chart.height = height;
        }
        if let Some(secs) = chart.timeout_secs {
            config.chart.timeout = Duration::from_secs(secs);
        }
    }

    if let Some(classifier) = raw.classifier {
        if let Some(secs) = classifier.timeout_secs {
            config.classifier_timeout = Duration::from_secs(secs);
        }
    }

    Ok(config)
}
