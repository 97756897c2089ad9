//! Logging configuration: compile-time limits plus runtime preferences
//!
//! Buffer sizes and the level floor come from the build profile and cannot be
//! changed at runtime. Everything else is a user preference.

use crate::config::compile_time::logging::*;
use crate::config::runtime::LoggingPreferences;
use std::sync::OnceLock;

type EventsLogLevel = crate::logging::events::LogLevel;
type RuntimeLogLevel = crate::config::runtime::LogLevel;

// ============================================================================
// RUNTIME PREFERENCES STORAGE
// ============================================================================

static RUNTIME_PREFERENCES: OnceLock<LoggingPreferences> = OnceLock::new();

/// Initialize runtime preferences. Must run before `init_global_logging`
/// for the preferences to affect the global logger.
pub fn init_runtime_preferences(preferences: LoggingPreferences) -> Result<(), String> {
    validate_preferences(&preferences)?;

    RUNTIME_PREFERENCES
        .set(preferences)
        .map_err(|_| "Runtime preferences already initialized")?;

    Ok(())
}

/// Get runtime preferences (with fallback to defaults)
fn get_runtime_preferences() -> LoggingPreferences {
    RUNTIME_PREFERENCES.get().cloned().unwrap_or_default()
}

fn validate_preferences(preferences: &LoggingPreferences) -> Result<(), String> {
    if preferences.use_structured_logging && preferences.enable_cargo_style_output {
        return Err("Structured logging cannot be combined with cargo-style output".to_string());
    }
    Ok(())
}

// ============================================================================
// CONFIGURATION ACCESS FUNCTIONS
// ============================================================================

/// Minimum log level: the user preference, raised to the compile-time floor
pub fn get_min_log_level() -> EventsLogLevel {
    let user_level = get_runtime_preferences().min_log_level.to_events_log_level();
    let floor = level_from_u8(MIN_LOG_LEVEL_FLOOR);

    if user_level < floor {
        floor
    } else {
        user_level
    }
}

fn level_from_u8(level: u8) -> EventsLogLevel {
    match level {
        0 => EventsLogLevel::Error,
        1 => EventsLogLevel::Warning,
        2 => EventsLogLevel::Info,
        _ => EventsLogLevel::Debug,
    }
}

/// Check if structured logging is enabled
pub fn use_structured_logging() -> bool {
    get_runtime_preferences().use_structured_logging
}

/// Check if console logging is enabled
pub fn use_console_logging() -> bool {
    get_runtime_preferences().enable_console_logging
}

/// Check if cargo-style output is enabled
pub fn use_cargo_style_output() -> bool {
    get_runtime_preferences().enable_cargo_style_output
}

/// Check if file context should be included
pub fn include_file_context() -> bool {
    get_runtime_preferences().include_file_context
}

/// Memory logger capacity
pub fn get_error_buffer_size() -> usize {
    LOG_BUFFER_SIZE
}

/// Maximum log events recorded per file
pub fn get_max_log_events_per_file() -> usize {
    MAX_LOG_EVENTS_PER_FILE
}

/// Maximum log message length
pub fn get_max_log_message_length() -> usize {
    MAX_LOG_MESSAGE_LENGTH
}

// ============================================================================
// CONFIGURATION VALIDATION
// ============================================================================

/// Validate current configuration settings
pub fn validate_config() -> Result<(), String> {
    if LOG_BUFFER_SIZE > 100_000 {
        return Err(format!("Log buffer size too large: {}", LOG_BUFFER_SIZE));
    }

    if LOG_BUFFER_SIZE < 100 {
        return Err(format!("Log buffer size too small: {}", LOG_BUFFER_SIZE));
    }

    if MAX_LOG_EVENTS_PER_FILE > LOG_BUFFER_SIZE {
        return Err("Max log events per file exceeds total buffer size".to_string());
    }

    if let Some(preferences) = RUNTIME_PREFERENCES.get() {
        validate_preferences(preferences)?;
    }

    Ok(())
}

/// Get configuration summary for diagnostics
pub fn get_config_summary() -> String {
    let preferences = get_runtime_preferences();

    format!(
        "Logging Configuration:\n\
         === Compile-time Limits ===\n\
         - Log buffer size: {}\n\
         - Max events per file: {}\n\
         - Max message length: {}\n\
         - Level floor: {}\n\
         === User Preferences (Runtime) ===\n\
         - Min log level: {:?}\n\
         - Effective level: {}\n\
         - Structured logging: {}\n\
         - Console logging: {}\n\
         - Cargo-style output: {}\n\
         - Include file context: {}",
        LOG_BUFFER_SIZE,
        MAX_LOG_EVENTS_PER_FILE,
        MAX_LOG_MESSAGE_LENGTH,
        MIN_LOG_LEVEL_FLOOR,
        preferences.min_log_level,
        get_min_log_level().as_str(),
        preferences.use_structured_logging,
        preferences.enable_console_logging,
        preferences.enable_cargo_style_output,
        preferences.include_file_context,
    )
}

/// Recommended preferences for interactive development
pub fn get_development_preferences() -> LoggingPreferences {
    LoggingPreferences {
        use_structured_logging: false,
        enable_console_logging: true,
        min_log_level: RuntimeLogLevel::Debug,
        enable_cargo_style_output: true,
        include_file_context: true,
    }
}

/// Recommended preferences for CI pipelines
pub fn get_production_preferences() -> LoggingPreferences {
    LoggingPreferences {
        use_structured_logging: true,
        enable_console_logging: false,
        min_log_level: RuntimeLogLevel::Info,
        enable_cargo_style_output: false,
        include_file_context: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(validate_config().is_ok());
    }

    #[test]
    fn test_level_floor_is_applied() {
        assert!(get_min_log_level() >= level_from_u8(MIN_LOG_LEVEL_FLOOR));
    }

    #[test]
    fn test_preference_validation() {
        assert!(validate_preferences(&get_development_preferences()).is_ok());
        assert!(validate_preferences(&get_production_preferences()).is_ok());

        let conflicting = LoggingPreferences {
            use_structured_logging: true,
            enable_cargo_style_output: true,
            ..get_development_preferences()
        };
        assert!(validate_preferences(&conflicting).is_err());
    }

    #[test]
    fn test_summary_mentions_limits() {
        let summary = get_config_summary();
        assert!(summary.contains("Log buffer size"));
        assert!(summary.contains("Level floor"));
    }
}
