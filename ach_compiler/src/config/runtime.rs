// RUNTIME PREFERENCES (User Experience)

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProcessorPreferences {
    /// Whether to require the .rascript extension
    pub require_script_extension: bool,

    /// Whether to log per-file timing information
    pub enable_performance_logging: bool,

    /// Whether to log debug information for files with other extensions
    pub log_non_script_processing: bool,
}

impl Default for FileProcessorPreferences {
    fn default() -> Self {
        Self {
            require_script_extension: env::var("ACH_REQUIRE_SCRIPT_EXTENSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            enable_performance_logging: env::var("ACH_ENABLE_PERFORMANCE_LOGGING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            log_non_script_processing: env::var("ACH_LOG_NON_SCRIPT_PROCESSING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalPreferences {
    /// Whether to collect detailed token metrics
    pub collect_detailed_metrics: bool,

    /// Whether to show position information in error messages
    pub include_position_in_errors: bool,
}

impl Default for LexicalPreferences {
    fn default() -> Self {
        Self {
            collect_detailed_metrics: env::var("ACH_LEXICAL_DETAILED_METRICS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            include_position_in_errors: env::var("ACH_LEXICAL_INCLUDE_POSITIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationPreferences {
    /// Hex digits written for addresses
    pub address_width: usize,

    /// Minimum runtime version targeted, as "major.minor". Empty means the
    /// version is computed from the features actually used.
    pub target_version: String,
}

impl Default for SerializationPreferences {
    fn default() -> Self {
        Self {
            address_width: env::var("ACH_SERIALIZATION_ADDRESS_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|w| {
                    (1..=super::constants::compile_time::serialization::MAX_ADDRESS_WIDTH)
                        .contains(w)
                })
                .unwrap_or(super::compile_time::serialization::DEFAULT_ADDRESS_WIDTH),
            target_version: env::var("ACH_SERIALIZATION_TARGET_VERSION").unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IncrementalPreferences {
    /// Re-evaluate every group after any edit instead of propagating
    /// dependencies
    pub always_full_evaluation: bool,

    /// Whether to log group invalidation details
    pub log_invalidation_details: bool,
}

impl Default for IncrementalPreferences {
    fn default() -> Self {
        Self {
            always_full_evaluation: env::var("ACH_INCREMENTAL_ALWAYS_FULL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_invalidation_details: env::var("ACH_INCREMENTAL_LOG_INVALIDATION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging
    pub use_structured_logging: bool,

    /// Whether to enable console output
    pub enable_console_logging: bool,

    /// Preferred minimum log level
    pub min_log_level: LogLevel,

    /// Whether to enable cargo-style error reporting
    pub enable_cargo_style_output: bool,

    /// Whether to include file context in log messages
    pub include_file_context: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env::var("ACH_LOGGING_USE_STRUCTURED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            enable_console_logging: env::var("ACH_LOGGING_ENABLE_CONSOLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            min_log_level: env::var("ACH_LOGGING_MIN_LEVEL")
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Info),
            enable_cargo_style_output: env::var("ACH_LOGGING_CARGO_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            include_file_context: env::var("ACH_LOGGING_INCLUDE_FILE_CONTEXT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Convert to events::LogLevel
    pub fn to_events_log_level(&self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }

    /// Convert from events::LogLevel
    pub fn from_events_log_level(level: crate::logging::events::LogLevel) -> Self {
        match level {
            crate::logging::events::LogLevel::Error => LogLevel::Error,
            crate::logging::events::LogLevel::Warning => LogLevel::Warning,
            crate::logging::events::LogLevel::Info => LogLevel::Info,
            crate::logging::events::LogLevel::Debug => LogLevel::Debug,
        }
    }
}

/// Parse log level from string (used for environment variables)
pub fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub file_processor: FileProcessorPreferences,
    pub lexical: LexicalPreferences,
    pub serialization: SerializationPreferences,
    pub incremental: IncrementalPreferences,
    pub logging: LoggingPreferences,
}

impl RuntimeConfig {
    /// Load preferences from a TOML file. Sections or keys missing from the
    /// file fall back to their environment-derived defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content)
            .map_err(|e| format!("Invalid preferences in {}: {}", path.display(), e))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Environment variable names for configuration
pub mod env_vars {
    // File Processor
    pub const REQUIRE_SCRIPT_EXTENSION: &str = "ACH_REQUIRE_SCRIPT_EXTENSION";
    pub const ENABLE_PERFORMANCE_LOGGING: &str = "ACH_ENABLE_PERFORMANCE_LOGGING";
    pub const LOG_NON_SCRIPT_PROCESSING: &str = "ACH_LOG_NON_SCRIPT_PROCESSING";

    // Lexical
    pub const LEXICAL_DETAILED_METRICS: &str = "ACH_LEXICAL_DETAILED_METRICS";
    pub const LEXICAL_INCLUDE_POSITIONS: &str = "ACH_LEXICAL_INCLUDE_POSITIONS";

    // Serialization
    pub const SERIALIZATION_ADDRESS_WIDTH: &str = "ACH_SERIALIZATION_ADDRESS_WIDTH";
    pub const SERIALIZATION_TARGET_VERSION: &str = "ACH_SERIALIZATION_TARGET_VERSION";

    // Incremental
    pub const INCREMENTAL_ALWAYS_FULL: &str = "ACH_INCREMENTAL_ALWAYS_FULL";
    pub const INCREMENTAL_LOG_INVALIDATION: &str = "ACH_INCREMENTAL_LOG_INVALIDATION";

    // Logging
    pub const LOGGING_USE_STRUCTURED: &str = "ACH_LOGGING_USE_STRUCTURED";
    pub const LOGGING_ENABLE_CONSOLE: &str = "ACH_LOGGING_ENABLE_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "ACH_LOGGING_MIN_LEVEL";
    pub const LOGGING_CARGO_STYLE: &str = "ACH_LOGGING_CARGO_STYLE";
    pub const LOGGING_INCLUDE_FILE_CONTEXT: &str = "ACH_LOGGING_INCLUDE_FILE_CONTEXT";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("error"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("ERROR"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("0"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("warn"), Some(LogLevel::Warning));
        assert_eq!(parse_log_level("warning"), Some(LogLevel::Warning));
        assert_eq!(parse_log_level("info"), Some(LogLevel::Info));
        assert_eq!(parse_log_level("3"), Some(LogLevel::Debug));
        assert_eq!(parse_log_level("invalid"), None);
    }

    #[test]
    fn test_preferences_from_toml_fill_missing_sections() {
        let config = RuntimeConfig::from_toml_str(
            "[serialization]\naddress_width = 4\ntarget_version = \"0.78\"\n",
        )
        .unwrap();
        assert_eq!(config.serialization.address_width, 4);
        assert_eq!(config.serialization.target_version, "0.78");
    }

    #[test]
    fn test_preferences_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.toml");
        std::fs::write(&path, "[incremental]\nalways_full_evaluation = true\n").unwrap();
        let config = RuntimeConfig::from_toml_file(&path).unwrap();
        assert!(config.incremental.always_full_evaluation);
    }

    #[test]
    fn test_missing_preferences_file_is_error() {
        let result = RuntimeConfig::from_toml_file(Path::new("/nonexistent/prefs.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_var_names_exist() {
        assert!(env_vars::LOGGING_MIN_LEVEL.starts_with("ACH_"));
        assert!(env_vars::SERIALIZATION_ADDRESS_WIDTH.starts_with("ACH_"));
    }
}
