use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use portfolioviz_core::constants::INITIAL_VALUE;
use portfolioviz_core::utils::time_utils::parse_optional_date;
use rust_decimal::Decimal;

/// Runtime configuration, read from `PV_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub prices_csv: PathBuf,
    pub weights_csv: PathBuf,
    pub initial_value: Decimal,
    pub strict_weights: bool,
    pub sequential: bool,
    /// Where to write the JSON export, if anywhere
    pub output: Option<PathBuf>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<PathBuf> {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("{} must be set", key))
        };

        let initial_value = match lookup("PV_INITIAL_VALUE") {
            Some(raw) => Decimal::from_str(raw.trim())
                .with_context(|| format!("PV_INITIAL_VALUE is not a number: '{}'", raw))?,
            None => INITIAL_VALUE,
        };
        if initial_value <= Decimal::ZERO {
            return Err(anyhow!("PV_INITIAL_VALUE must be positive, got {}", initial_value));
        }

        let from = parse_optional_date(lookup("PV_FROM").as_deref()).context("PV_FROM")?;
        let to = parse_optional_date(lookup("PV_TO").as_deref()).context("PV_TO")?;

        Ok(Self {
            prices_csv: required("PV_PRICES_CSV")?,
            weights_csv: required("PV_WEIGHTS_CSV")?,
            initial_value,
            strict_weights: flag(lookup("PV_STRICT_WEIGHTS")),
            sequential: flag(lookup("PV_SEQUENTIAL")),
            output: lookup("PV_OUTPUT")
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            from,
            to,
        })
    }
}

fn flag(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
