use crate::drawdown::Window;
use crate::results::Columns;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize, Clone)]
pub struct ColumnsConfig {
    pub timestamp: String,
    pub balance: String,
    #[serde(default)]
    pub initial_capital: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartConfig {
    pub output_file: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub title: Option<String>,
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    960
}

/// Reference price overlay, read from a local kline store.
#[derive(Debug, Deserialize, Clone)]
pub struct ReferenceConfig {
    pub db_path: String,
    pub symbol: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub results_dir: String,
    pub columns: ColumnsConfig,
    /// Trailing window for the running peak; absent means unbounded.
    #[serde(default)]
    pub window: Option<usize>,
    pub chart: ChartConfig,
    #[serde(default)]
    pub reference: Option<ReferenceConfig>,
}

impl Config {
    pub fn window(&self) -> Window {
        match self.window {
            Some(n) => Window::Bounded(n),
            None => Window::Unbounded,
        }
    }

    pub fn result_columns(&self) -> Columns {
        Columns {
            timestamp: self.columns.timestamp.clone(),
            balance: self.columns.balance.clone(),
            initial_capital: self.columns.initial_capital.clone(),
        }
    }
}

pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let json = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&json)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let json = r#"{
            "results_dir": "backtest_output",
            "columns": {
                "timestamp": "datetime",
                "balance": "usd_balance",
                "initial_capital": "initial_captial"
            },
            "window": 2000,
            "chart": {
                "output_file": "backtest.png",
                "width": 1600,
                "height": 900,
                "title": "momentum runs"
            },
            "reference": {
                "db_path": "klines.sqlite",
                "symbol": "AVAXUSDT"
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.window(), Window::Bounded(2000));
        assert_eq!(config.chart.width, 1600);
        assert_eq!(config.reference.as_ref().unwrap().symbol, "AVAXUSDT");
        assert_eq!(
            config.result_columns().initial_capital.as_deref(),
            Some("initial_captial")
        );
    }

    #[test]
    fn minimal_config_defaults() {
        let json = r#"{
            "results_dir": "out",
            "columns": { "timestamp": "datetime", "balance": "usd_balance" },
            "chart": { "output_file": "chart.png" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.window(), Window::Unbounded);
        assert_eq!(config.chart.width, 1280);
        assert_eq!(config.chart.height, 960);
        assert!(config.reference.is_none());
        assert!(config.columns.initial_capital.is_none());
    }
}
