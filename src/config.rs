use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::SheetError;

// Constants
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://spreadsheets.google.com/feeds",
    "https://www.googleapis.com/auth/drive",
];
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// When cell value assignments reach the remote service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritePolicy {
    /// Assignments are held in the worksheet's dirty set until
    /// `flush_pending_changes` sends them in one batch.
    #[default]
    Deferred,
    /// Every value assignment is written straight away as a single-cell update.
    ///
    /// Font, fill and alignment changes are still staged and go out with the
    /// next `flush_pending_changes`, so a cell can have a written value and
    /// pending formatting at the same time.
    Immediate,
}

impl FromStr for WritePolicy {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deferred" | "batch" => Ok(WritePolicy::Deferred),
            "immediate" => Ok(WritePolicy::Immediate),
            other => Err(SheetError::Validation(format!("unknown write policy '{}'", other))),
        }
    }
}

/// Settings for talking to the spreadsheet service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Sheets REST API.
    pub api_base: String,
    /// OAuth token endpoint used when the key file doesn't name one.
    pub token_url: String,
    pub scopes: Vec<String>,
    pub timeout_secs: u64,
    /// Policy given to worksheets materialized by a workbook.
    pub write_policy: WritePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            write_policy: WritePolicy::default(),
        }
    }
}

impl Config {
    /// Defaults overridden by `SHEETLINK_API_BASE`, `SHEETLINK_TOKEN_URL`,
    /// `SHEETLINK_SCOPES` (comma separated), `SHEETLINK_TIMEOUT_SECS` and
    /// `SHEETLINK_WRITE_POLICY`.
    pub fn from_env() -> Result<Self, SheetError> {
        let mut config = Config::default();

        if let Ok(base) = env::var("SHEETLINK_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Ok(url) = env::var("SHEETLINK_TOKEN_URL") {
            config.token_url = url;
        }
        if let Ok(scopes) = env::var("SHEETLINK_SCOPES") {
            config.scopes = scopes
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(secs) = env::var("SHEETLINK_TIMEOUT_SECS") {
            config.timeout_secs = secs.trim().parse().map_err(|_| {
                SheetError::Validation(format!("SHEETLINK_TIMEOUT_SECS must be a number, got '{}'", secs))
            })?;
        }
        if let Ok(policy) = env::var("SHEETLINK_WRITE_POLICY") {
            config.write_policy = policy.parse()?;
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_public_service() {
        let config = Config::default();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.scopes.len(), 2);
        assert_eq!(config.write_policy, WritePolicy::Deferred);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn write_policy_parses() {
        assert_eq!("Immediate".parse::<WritePolicy>().unwrap(), WritePolicy::Immediate);
        assert_eq!("batch".parse::<WritePolicy>().unwrap(), WritePolicy::Deferred);
        assert!("eventually".parse::<WritePolicy>().is_err());
    }
}
