//! Configuration loading from environment variables.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::rules::{RuleSet, Variant};

const DEFAULT_ID: &str = "default";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the schedule backend
    pub api_url: String,

    /// Schedule id that unmatched routes redirect to
    pub default_id: String,

    pub variant: Variant,
    pub rules: RuleSet,
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// `CALENDARIO_API_URL` is required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from a specific env file only, leaving the
    /// process environment untouched.
    pub fn from_env_file(path: &Path) -> Result<Self> {
        let vars = dotenvy::from_path_iter(path)
            .with_context(|| format!("Failed to open env file {}", path.display()))?
            .collect::<Result<HashMap<String, String>, _>>()
            .with_context(|| format!("Failed to parse env file {}", path.display()))?;
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = get("CALENDARIO_API_URL")
            .context("CALENDARIO_API_URL environment variable not set")?;

        let default_id = get("CALENDARIO_DEFAULT_ID").unwrap_or_else(|| DEFAULT_ID.to_string());

        let variant = match get("CALENDARIO_RULES") {
            Some(v) => v.parse().context("Invalid CALENDARIO_RULES")?,
            None => Variant::default(),
        };

        let mut rules = RuleSet::from(variant);
        if let Some(v) = get("CALENDARIO_PADDING_DAYS") {
            rules.padding_days = v
                .trim()
                .parse()
                .with_context(|| format!("Invalid CALENDARIO_PADDING_DAYS: {v}"))?;
        }
        if let Some(v) = get("CALENDARIO_EXCLUDE_WEEKENDS") {
            rules.exclude_weekends = parse_bool("CALENDARIO_EXCLUDE_WEEKENDS", &v)?;
        }
        if let Some(v) = get("CALENDARIO_RESTRICT_TO_VIEW_MONTH") {
            rules.restrict_to_view_month =
                parse_bool("CALENDARIO_RESTRICT_TO_VIEW_MONTH", &v)?;
        }
        if let Some(v) = get("CALENDARIO_EXCLUDE_USED") {
            rules.exclude_used = parse_bool("CALENDARIO_EXCLUDE_USED", &v)?;
        }
        if let Some(v) = get("CALENDARIO_CONFIRM_PARTIAL") {
            rules.confirm_partial = parse_bool("CALENDARIO_CONFIRM_PARTIAL", &v)?;
        }

        let timeout_secs = match get("CALENDARIO_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("Invalid CALENDARIO_TIMEOUT_SECS: {v}"))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url,
            default_id,
            variant,
            rules,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("Invalid {key}: expected a boolean, got '{other}'"),
    }
}
