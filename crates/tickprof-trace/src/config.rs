use crate::error::{Error, Result};
use crate::history::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};

/// Engine options, applied by `Profiler::init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfilerConfig {
    /// When false every entry point is a no-op and queries come back empty.
    pub enabled: bool,
    /// Number of ticks kept in the history ring.
    pub max_history: usize,
    /// Write the serialized history to the sink under this key after every tick.
    pub auto_save_key: Option<String>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        ProfilerConfig {
            enabled: true,
            max_history: DEFAULT_CAPACITY,
            auto_save_key: None,
        }
    }
}

impl ProfilerConfig {
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn with_auto_save_key(mut self, key: impl Into<String>) -> Self {
        self.auto_save_key = Some(key.into());
        self
    }

    pub fn disabled() -> Self {
        ProfilerConfig {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: ProfilerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_history == 0 {
            return Err(Error::InvalidConfig(
                "maxHistory must be at least 1".to_string(),
            ));
        }
        if let Some(key) = &self.auto_save_key
            && key.is_empty()
        {
            return Err(Error::InvalidConfig(
                "autoSaveKey must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = ProfilerConfig::from_json(r#"{"autoSaveKey":"profiler"}"#).unwrap();
        assert!(config.enabled);
        assert_eq!(config.max_history, DEFAULT_CAPACITY);
        assert_eq!(config.auto_save_key.as_deref(), Some("profiler"));
    }

    #[test]
    fn zero_history_is_rejected() {
        let err = ProfilerConfig::from_json(r#"{"maxHistory":0}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn empty_save_key_is_rejected() {
        let config = ProfilerConfig::default().with_auto_save_key("");
        assert!(config.validate().is_err());
    }
}
