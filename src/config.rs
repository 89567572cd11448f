//! # config — Environment Variables
//!
//! Each component owns its own `from_env()` (see [`AlpacaConfig`],
//! [`WorkerTiming`], [`PaperBroker`]); this module holds the shared readers.
//! Unlike a silent fallback, a variable that is *set* but unparsable is a
//! startup error.
//!
//! [`AlpacaConfig`]: crate::broker::alpaca::AlpacaConfig
//! [`WorkerTiming`]: crate::engine::worker::WorkerTiming
//! [`PaperBroker`]: crate::broker::paper::PaperBroker

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// `BASE_URL` value that swaps the live broker for the in-memory paper book.
pub const MOCK_BASE_URL: &str = "mock";

/// Value of `key`, or `default` when unset or blank.
pub fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Value of `key`; blank counts as missing.
pub fn env_required(key: &'static str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingEnv(key)),
    }
}

/// Parse `key` as `T`, falling back to `default` when unset or blank.
pub fn env_parse<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { key, value: v }),
        _ => Ok(default),
    }
}

/// Whole seconds read from `key`.  Zero is rejected: every wait in the
/// trader must actually yield.
pub fn env_secs(key: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = env_parse(key, default_secs)?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnv { key, value: "0".into() });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Every test uses its own variable names: the test harness is multi-threaded.

    #[test]
    fn test_env_or_falls_back_on_blank() {
        std::env::set_var("AUTOTRADE_TEST_BLANK", "   ");
        assert_eq!(env_or("AUTOTRADE_TEST_BLANK", "x"), "x");
        assert_eq!(env_or("AUTOTRADE_TEST_UNSET_1", "y"), "y");
    }

    #[test]
    fn test_env_required_reports_key() {
        let err = env_required("AUTOTRADE_TEST_UNSET_2").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("AUTOTRADE_TEST_UNSET_2")));
        assert_eq!(
            err.to_string(),
            "AUTOTRADE_TEST_UNSET_2 must be set in .env file or environment"
        );
    }

    #[test]
    fn test_env_parse_invalid_is_an_error() {
        std::env::set_var("AUTOTRADE_TEST_BAD_NUM", "ten");
        let err = env_parse::<u64>("AUTOTRADE_TEST_BAD_NUM", 1).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "AUTOTRADE_TEST_BAD_NUM", .. }));
    }

    #[test]
    fn test_env_secs() {
        std::env::set_var("AUTOTRADE_TEST_SECS", "15");
        assert_eq!(env_secs("AUTOTRADE_TEST_SECS", 60).unwrap(), Duration::from_secs(15));
        assert_eq!(env_secs("AUTOTRADE_TEST_UNSET_3", 60).unwrap(), Duration::from_secs(60));

        std::env::set_var("AUTOTRADE_TEST_ZERO_SECS", "0");
        assert!(env_secs("AUTOTRADE_TEST_ZERO_SECS", 60).is_err());
    }
}
