use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub level: String,
    pub keep_days: u64,
    /// Mirror stderr output into `<state_root>/logs/<component>.log`.
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            keep_days: 14,
            file_logging: true,
        }
    }
}

impl LoggingConfig {
    /// Filter directive to install. A `--debug` style override wins over
    /// both `level` and `enabled`.
    pub fn directive(&self, force_debug: bool) -> String {
        if force_debug {
            return "debug".to_string();
        }
        if !self.enabled {
            return "off".to_string();
        }
        self.level.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_respects_disabled_and_debug() {
        let mut cfg = LoggingConfig::default();
        assert_eq!(cfg.directive(false), "info");
        assert_eq!(cfg.directive(true), "debug");

        cfg.enabled = false;
        assert_eq!(cfg.directive(false), "off");
        assert_eq!(cfg.directive(true), "debug");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let cfg: LoggingConfig = serde_json::from_str(r#"{"level":"warn"}"#).unwrap();
        assert_eq!(cfg.level, "warn");
        assert!(cfg.enabled);
        assert_eq!(cfg.keep_days, 14);
    }
}
