//! Bot-wide tunables.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::pricing::{MissingBand, MissingSerial, ValuationPolicy};
use crate::{ValueError, HIGH_SERIAL, LOW_SERIAL_THRESHOLD, SUGGESTION_LIMIT};

/// Configuration shared by trades, lookups, investments and giveaways.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Serial assumed when a trader omits one (> 0).
    pub high_serial: u64,
    /// Maximum autocomplete suggestions (> 0).
    pub suggestion_limit: usize,
    /// Serials below this get a low-serial note.
    pub low_serial_threshold: u64,
    /// Investments one user may record per UTC day (> 0).
    pub daily_investment_limit: usize,
    /// Seed for giveaway draws; OS entropy when absent.
    pub rng_seed: Option<u64>,
    /// Out-of-range policy used when settling trades and investments.
    pub missing_band: MissingBand,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            high_serial: HIGH_SERIAL,
            suggestion_limit: SUGGESTION_LIMIT,
            low_serial_threshold: LOW_SERIAL_THRESHOLD,
            daily_investment_limit: 3,
            rng_seed: None,
            missing_band: MissingBand::LastBand,
        }
    }
}

impl BotConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ValueError> {
        let cfg: Self =
            serde_yaml::from_str(text).map_err(|e| ValueError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ValueError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ValueError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ValueError> {
        if self.high_serial == 0 {
            return Err(ValueError::InvalidConfig("high_serial must be > 0".into()));
        }
        if self.suggestion_limit == 0 {
            return Err(ValueError::InvalidConfig("suggestion_limit must be > 0".into()));
        }
        if self.daily_investment_limit == 0 {
            return Err(ValueError::InvalidConfig(
                "daily_investment_limit must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Policy for trades and investments: serial required, configured
    /// out-of-range handling.
    pub fn settlement_policy(&self) -> ValuationPolicy {
        ValuationPolicy {
            missing_serial: MissingSerial::Require,
            missing_band: self.missing_band,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = BotConfig::from_yaml_str("{}").unwrap();
        assert_eq!(cfg, BotConfig::default());
        assert_eq!(cfg.high_serial, 75_000);
        assert_eq!(cfg.settlement_policy(), ValuationPolicy::SETTLEMENT);
    }

    #[test]
    fn partial_document_overrides() {
        let cfg = BotConfig::from_yaml_str("missing_band: fail\nrng_seed: 7\n").unwrap();
        assert_eq!(cfg.missing_band, MissingBand::Fail);
        assert_eq!(cfg.rng_seed, Some(7));
        assert_eq!(cfg.suggestion_limit, 25);
    }

    #[test]
    fn rejects_zero_limits() {
        assert!(matches!(
            BotConfig::from_yaml_str("suggestion_limit: 0"),
            Err(ValueError::InvalidConfig(_))
        ));
        assert!(BotConfig::from_yaml_str("missing_band: sometimes").is_err());
    }

    #[test]
    fn bundled_config_loads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/config.yaml");
        let cfg = BotConfig::load(path).unwrap();
        assert_eq!(cfg.high_serial, 75_000);
    }
}
