// Application configuration
// Loaded from ~/.config/split-ledger/config.json (or $SPLIT_LEDGER_CONFIG)

use crate::balance::SETTLEMENT_TOLERANCE;
use crate::ledger::default_roster;
use crate::report::Payee;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "SPLIT_LEDGER_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file holding every month
    #[serde(rename = "storage.path")]
    pub storage_path: PathBuf,

    /// People a month starts with when no earlier month exists
    #[serde(rename = "ledger.defaultRoster")]
    pub default_roster: Vec<String>,

    /// Balances closer to zero than this are considered settled
    #[serde(rename = "balance.tolerance")]
    pub tolerance: f64,

    /// error | warn | info | debug | trace (RUST_LOG wins when set)
    #[serde(rename = "log.level")]
    pub log_level: String,

    #[serde(rename = "server.addr")]
    pub server_addr: String,

    /// Recipient for generated payment links
    pub payee: Payee,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_path: Self::data_dir().join("ledger.db"),
            default_roster: default_roster(),
            tolerance: SETTLEMENT_TOLERANCE,
            log_level: "info".to_string(),
            server_addr: "127.0.0.1:3000".to_string(),
            payee: Payee::default(),
        }
    }
}

impl AppConfig {
    fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("split-ledger")
    }

    /// Config file path: $SPLIT_LEDGER_CONFIG, else the platform config dir
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("split-ledger")
            .join("config.json")
    }

    /// Load from the default location; a missing file means defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;

        // Strip comments (lines starting with //)
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        let config: AppConfig = serde_json::from_str(&cleaned)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        Ok(config.normalized())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("Failed to write config {}", path.display()))
    }

    /// Trim roster names, drop blanks and repeats, and reset a tolerance
    /// that is not a positive number
    fn normalized(mut self) -> Self {
        let mut roster: Vec<String> = Vec::with_capacity(self.default_roster.len());
        for name in &self.default_roster {
            let name = name.trim();
            if !name.is_empty() && !roster.iter().any(|n| n == name) {
                roster.push(name.to_string());
            }
        }
        self.default_roster = roster;

        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            self.tolerance = SETTLEMENT_TOLERANCE;
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.json")).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.default_roster.len(), 5);
        assert_eq!(config.tolerance, 0.01);
    }

    #[test]
    fn test_partial_file_with_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
    // who is in the flat
    "ledger.defaultRoster": [" Ana ", "Ben", "", "Ana"],
    "balance.tolerance": -1,
    "payee": { "id": "ana@upi", "name": "Ana", "currency": "INR" }
}"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_roster, vec!["Ana".to_string(), "Ben".to_string()]);
        assert_eq!(config.tolerance, SETTLEMENT_TOLERANCE);
        assert_eq!(config.payee.id, "ana@upi");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_zero_tolerance_is_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "balance.tolerance": 0 }"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.tolerance, SETTLEMENT_TOLERANCE);

        let people = vec!["A".to_string(), "B".to_string()];
        let expenses = vec![crate::model::Expense {
            id: "e1".to_string(),
            description: "Lunch".to_string(),
            amount: 10.0,
            paid_by: "A".to_string(),
            split_with: people.clone(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
        }];
        let summary = crate::balance::BalanceEngine::with_tolerance(config.tolerance)
            .compute_summary(&people, &expenses)
            .unwrap();
        assert_eq!(summary.settlements.len(), 1);
        assert_eq!(summary.settlements[0].amount, 5.0);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ nope").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.storage_path = dir.path().join("ledger.db");
        config.log_level = "debug".to_string();
        config.save_to(&path).unwrap();

        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }
}
