//! Engine configuration
//!
//! Plain data with defaults; loadable from TOML:
//!
//! ```toml
//! default_page_limit = 10
//! max_page_limit = 100
//! notify_student_on_verify = true
//!
//! [sweep]
//! grace_period_secs = 900
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Workflow engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Page size used when a caller asks for limit 0
    pub default_page_limit: usize,
    /// Upper bound on any page size
    pub max_page_limit: usize,
    /// Tell the advisor when one of their students submits
    pub notify_advisor_on_submit: bool,
    /// Tell the student when a reviewer rejects
    pub notify_student_on_reject: bool,
    /// Tell the student when a reviewer verifies
    pub notify_student_on_verify: bool,
    /// Reconciliation sweep settings
    pub sweep: SweepConfig,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With page limits
    #[inline]
    #[must_use]
    pub fn with_page_limits(mut self, default_limit: usize, max_limit: usize) -> Self {
        self.default_page_limit = default_limit;
        self.max_page_limit = max_limit;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_notify_advisor_on_submit(mut self, enabled: bool) -> Self {
        self.notify_advisor_on_submit = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_notify_student_on_reject(mut self, enabled: bool) -> Self {
        self.notify_student_on_reject = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_notify_student_on_verify(mut self, enabled: bool) -> Self {
        self.notify_student_on_verify = enabled;
        self
    }

    /// With sweep settings
    #[inline]
    #[must_use]
    pub fn with_sweep(mut self, sweep: SweepConfig) -> Self {
        self.sweep = sweep;
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_limit == 0 || self.max_page_limit == 0 {
            return Err(ConfigError::Invalid("page limits must be positive".into()));
        }
        if self.default_page_limit > self.max_page_limit {
            return Err(ConfigError::Invalid(format!(
                "default_page_limit {} exceeds max_page_limit {}",
                self.default_page_limit, self.max_page_limit
            )));
        }
        if self.sweep.batch_size == 0 {
            return Err(ConfigError::Invalid("sweep.batch_size must be positive".into()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_page_limit: 10,
            max_page_limit: 100,
            notify_advisor_on_submit: true,
            notify_student_on_reject: true,
            notify_student_on_verify: false,
            sweep: SweepConfig::default(),
        }
    }
}

/// Reconciliation sweep settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Documents younger than this may still be mid-creation and are skipped
    pub grace_period_secs: u64,
    /// Documents fetched per page
    pub batch_size: usize,
}

impl SweepConfig {
    #[inline]
    #[must_use]
    pub fn with_grace_period_secs(mut self, secs: u64) -> Self {
        self.grace_period_secs = secs;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Grace period as a chrono duration, saturating on overflow
    #[must_use]
    pub fn grace_period(&self) -> chrono::Duration {
        i64::try_from(self.grace_period_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 3600,
            batch_size: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_page_limit, 10);
        assert_eq!(config.sweep.grace_period_secs, 3600);
        assert!(!config.notify_student_on_verify);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            notify_student_on_verify = true

            [sweep]
            batch_size = 50
            "#,
        )
        .unwrap();
        assert!(config.notify_student_on_verify);
        assert_eq!(config.sweep.batch_size, 50);
        assert_eq!(config.sweep.grace_period_secs, 3600);
        assert_eq!(config.max_page_limit, 100);
    }

    #[test]
    fn invalid_limits_are_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("default_page_limit = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::new().with_page_limits(50, 20).validate(),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("max_page_limit = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_page_limit = 25").unwrap();
        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_page_limit, 25);

        assert!(matches!(
            EngineConfig::from_file("/nonexistent/ach.toml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn grace_period_conversion() {
        let sweep = SweepConfig::default().with_grace_period_secs(90);
        assert_eq!(sweep.grace_period(), chrono::Duration::seconds(90));
        assert_eq!(
            SweepConfig::default()
                .with_grace_period_secs(u64::MAX)
                .grace_period(),
            chrono::Duration::MAX
        );
    }
}
