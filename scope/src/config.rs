use crate::error::ConfigError;
use serde::Deserialize;

pub const DEFAULT_DIGEST_TTL: usize = 10;

fn default_digest_ttl() -> usize {
  DEFAULT_DIGEST_TTL
}

/// Tunables for a scope hierarchy.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
  /// Extra dirty passes a digest may take before it fails with
  /// [`DigestError::Runaway`](crate::DigestError::Runaway).
  #[serde(default = "default_digest_ttl")]
  pub digest_ttl: usize,
}

impl Default for ScopeConfig {
  fn default() -> Self {
    Self {
      digest_ttl: DEFAULT_DIGEST_TTL,
    }
  }
}

impl ScopeConfig {
  /// Parses and validates a YAML document such as `digest_ttl: 20`.
  pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
    let config: ScopeConfig = serde_yaml::from_str(source)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.digest_ttl == 0 {
      return Err(ConfigError::InvalidValue {
        field: "digest_ttl".to_string(),
        message: "must be at least 1".to_string(),
      });
    }
    Ok(())
  }
}
