use crate::error::{MatchError, MatchResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lowe's ratio used when nothing else is configured
pub const DEFAULT_RATIO: f32 = 0.7;

/// Locality-sensitive hashing index layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LshParams {
    /// Number of independent hash tables
    pub table_number: usize,
    /// Bits sampled from a descriptor to form one bucket key
    pub key_size: usize,
    /// Hamming radius of neighbouring buckets also probed (0-2)
    pub multi_probe_level: usize,
}

impl Default for LshParams {
    fn default() -> Self {
        Self {
            table_number: 6,
            key_size: 12,
            multi_probe_level: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchParams {
    /// Upper bound on train descriptors scored per query
    pub checks: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self { checks: 50 }
    }
}

/// Index and search parameters plus the ratio-test threshold.
///
/// A pipeline builds one on its first match call and keeps it unchanged
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatcherConfig {
    pub index: LshParams,
    pub search: SearchParams,
    pub ratio: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            index: LshParams::default(),
            search: SearchParams::default(),
            ratio: DEFAULT_RATIO,
        }
    }
}

impl MatcherConfig {
    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_index(mut self, index: LshParams) -> Self {
        self.index = index;
        self
    }

    pub fn with_checks(mut self, checks: usize) -> Self {
        self.search.checks = checks;
        self
    }

    pub fn summary(&self) -> String {
        format!(
            "LSH(tables={}, key={} bits, probe={}), checks={}, ratio={}",
            self.index.table_number, self.index.key_size, self.index.multi_probe_level, self.search.checks, self.ratio
        )
    }

    pub fn validate(&self) -> MatchResult<()> {
        let invalid = |msg: String| Err(MatchError::InvalidConfig(msg));
        if self.index.table_number == 0 {
            return invalid("table_number must be at least 1".to_string());
        }
        if self.index.key_size == 0 || self.index.key_size > 32 {
            return invalid(format!("key_size {} outside 1-32", self.index.key_size));
        }
        if self.index.multi_probe_level > 2 {
            return invalid(format!("multi_probe_level {} above 2", self.index.multi_probe_level));
        }
        if self.search.checks == 0 {
            return invalid("checks must be at least 1".to_string());
        }
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return invalid(format!("ratio {} outside (0, 1]", self.ratio));
        }
        Ok(())
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> MatchResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| MatchError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> MatchResult<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| MatchError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatcherConfig::default();
        assert_eq!(config.index.table_number, 6);
        assert_eq!(config.index.key_size, 12);
        assert_eq!(config.index.multi_probe_level, 1);
        assert_eq!(config.search.checks, 50);
        assert_eq!(config.ratio, 0.7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let base = MatcherConfig::default();
        let bad = [
            base.with_ratio(0.0),
            base.with_ratio(1.5),
            base.with_ratio(f32::NAN),
            base.with_checks(0),
            base.with_index(LshParams { key_size: 33, ..LshParams::default() }),
            base.with_index(LshParams { table_number: 0, ..LshParams::default() }),
            base.with_index(LshParams { multi_probe_level: 3, ..LshParams::default() }),
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(MatchError::InvalidConfig(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            MatcherConfig::default().summary(),
            "LSH(tables=6, key=12 bits, probe=1), checks=50, ratio=0.7"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_toml_and_json() {
        let config = MatcherConfig::default().with_ratio(0.8).with_checks(64);
        let parsed = MatcherConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
        let parsed = MatcherConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_parsed_config_is_validated() {
        let out_of_range = MatcherConfig::default().with_ratio(2.0);
        let json = out_of_range.to_json().unwrap();
        match MatcherConfig::from_json(&json) {
            Err(MatchError::InvalidConfig(msg)) => assert!(msg.starts_with("ratio 2"), "{}", msg),
            other => panic!("expected ratio rejection, got {:?}", other),
        }
        let toml = out_of_range.to_toml().unwrap();
        assert!(matches!(MatcherConfig::from_toml(&toml), Err(MatchError::InvalidConfig(msg)) if msg.starts_with("ratio")));
    }
}
