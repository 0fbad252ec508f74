use aligner_domain::{AllocationSettings, MAX_CURRENCY_SCALE, Money};
use std::env;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const SCALE_VAR: &str = "ALIGNER_CURRENCY_SCALE";
const TOLERANCE_VAR: &str = "ALIGNER_TOLERANCE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be an integer between 0 and {max} (got '{value}')", max = MAX_CURRENCY_SCALE)]
    InvalidScale { key: &'static str, value: String },
    #[error("{key} must be a non-negative decimal (got '{value}')")]
    InvalidTolerance { key: &'static str, value: String },
}

/// Interpreter configuration, read from the environment and `.env`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppConfig {
    pub settings: AllocationSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AllocationSettings::default();

        let scale = match lookup(SCALE_VAR) {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(scale) if scale <= MAX_CURRENCY_SCALE => scale,
                _ => {
                    return Err(ConfigError::InvalidScale {
                        key: SCALE_VAR,
                        value,
                    });
                }
            },
            None => defaults.scale,
        };

        let tolerance = match lookup(TOLERANCE_VAR) {
            Some(value) => match value.parse::<Money>() {
                Ok(tolerance) if !tolerance.is_negative() => tolerance,
                _ => {
                    return Err(ConfigError::InvalidTolerance {
                        key: TOLERANCE_VAR,
                        value,
                    });
                }
            },
            None => defaults.tolerance,
        };

        Ok(Self {
            settings: AllocationSettings { scale, tolerance },
        })
    }
}

/// Initialize logging; `RUST_LOG` overrides the default `warn` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_cents() {
        let config = config_from(&[]).expect("defaults should load");
        assert_eq!(config.settings, AllocationSettings::cents());
    }

    #[test]
    fn reads_scale_and_tolerance() {
        let config = config_from(&[(SCALE_VAR, "0"), (TOLERANCE_VAR, "1")])
            .expect("config should load");
        assert_eq!(config.settings.scale, 0);
        assert_eq!(config.settings.tolerance, Money::from_i64(1));
    }

    #[test]
    fn accepts_the_largest_supported_scale() {
        let config = config_from(&[(SCALE_VAR, "22")]).expect("config should load");
        assert_eq!(config.settings.scale, MAX_CURRENCY_SCALE);
    }

    #[test]
    fn oversized_scale_names_the_variable() {
        assert_eq!(
            config_from(&[(SCALE_VAR, "40")]),
            Err(ConfigError::InvalidScale {
                key: SCALE_VAR,
                value: "40".to_string(),
            })
        );
    }

    #[rstest]
    #[case::scale_not_a_number(SCALE_VAR, "two")]
    #[case::negative_scale(SCALE_VAR, "-1")]
    #[case::scale_beyond_decimal_precision(SCALE_VAR, "23")]
    #[case::tolerance_not_a_number(TOLERANCE_VAR, "abc")]
    #[case::negative_tolerance(TOLERANCE_VAR, "-0.01")]
    fn rejects_malformed_values(#[case] key: &str, #[case] value: &str) {
        assert!(config_from(&[(key, value)]).is_err());
    }
}
