//! Global logging for the compiler
//!
//! One process-wide [`LoggingService`] writes events as they happen, and an
//! [`ErrorCollector`] keeps errors and warnings per script for the summary
//! printed at the end of a run. The script being compiled is tracked per
//! thread so batch workers attribute their events correctly.

pub mod codes;
pub mod collector;
pub mod config;
pub mod events;
pub mod macros;
pub mod service;

use crate::utils::Span;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use codes::Code;
pub use collector::{ErrorCollector, FileProcessingContext, ProcessingSummary};
pub use events::{LogEvent, LogLevel};
pub use service::{ConsoleLogger, Logger, LoggingService, MemoryLogger, StructuredLogger};

static GLOBAL_LOGGER: OnceLock<LoggingService> = OnceLock::new();
static GLOBAL_ERROR_COLLECTOR: OnceLock<ErrorCollector> = OnceLock::new();

thread_local! {
    static FILE_CONTEXT: RefCell<Option<FileProcessingContext>> = const { RefCell::new(None) };
}

/// Codes every stage reports with; their registry entries must exist
const REQUIRED_CODES: [Code; 7] = [
    codes::system::INTERNAL_ERROR,
    codes::file_processing::FILE_NOT_FOUND,
    codes::lexical::INVALID_CHARACTER,
    codes::evaluation::TYPE_ERROR,
    codes::serialization::INVALID_FORMAT,
    codes::incremental::PROPAGATION_LIMIT,
    codes::pipeline::PIPELINE_FAILURE,
];

/// Set up the global logger and error collector
///
/// Fails when called a second time; callers that may race (tests, library
/// users) can ignore the error.
pub fn init_global_logging() -> Result<(), String> {
    config::validate_config().map_err(|e| format!("Configuration validation failed: {}", e))?;

    for code in REQUIRED_CODES {
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!("Missing metadata for error code: {}", code.as_str()));
        }
    }

    GLOBAL_LOGGER
        .set(service::create_configured_service())
        .map_err(|_| "Global logger already initialized")?;
    GLOBAL_ERROR_COLLECTOR
        .set(ErrorCollector::new())
        .map_err(|_| "Global error collector already initialized")?;

    log_success_with_context(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Global logging system initialized",
        vec![("min_level", get_global_min_level().as_str())],
    );
    Ok(())
}

pub fn is_initialized() -> bool {
    GLOBAL_LOGGER.get().is_some()
}

pub fn try_get_global_logger() -> Option<&'static LoggingService> {
    GLOBAL_LOGGER.get()
}

pub fn try_get_global_error_collector() -> Option<&'static ErrorCollector> {
    GLOBAL_ERROR_COLLECTOR.get()
}

fn get_global_min_level() -> LogLevel {
    try_get_global_logger()
        .map(LoggingService::min_level)
        .unwrap_or_else(config::get_min_log_level)
}

/// Run `f` with `file_path` as this thread's current script
pub fn with_file_context<F, R>(file_path: PathBuf, file_id: usize, f: F) -> R
where
    F: FnOnce() -> R,
{
    let context = FileProcessingContext::new(file_path, file_id);
    if let Some(collector) = try_get_global_error_collector() {
        collector.record_file_context(context.clone());
    }

    let previous = FILE_CONTEXT.with(|ctx| ctx.borrow_mut().replace(context));
    let result = f();
    FILE_CONTEXT.with(|ctx| *ctx.borrow_mut() = previous);
    result
}

pub fn get_current_file_context() -> Option<FileProcessingContext> {
    FILE_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Attach context pairs and the current script, then dispatch
fn dispatch(mut event: LogEvent, context: Vec<(&str, &str)>) {
    for (key, value) in context {
        event = event.with_context(key, value);
    }

    let file_context = get_current_file_context();
    if let Some(file) = &file_context {
        event = event.with_context("file", &file.file_path.display().to_string());
    }

    if let (Some(file), Some(collector)) = (&file_context, try_get_global_error_collector()) {
        collector.record_event(&file.file_path, event.clone());
    }

    if let Some(logger) = try_get_global_logger() {
        logger.log_event(event);
    }
}

pub fn log_error_with_context(
    code: Code,
    message: &str,
    span: Option<Span>,
    context: Vec<(&str, &str)>,
) {
    let mut event = LogEvent::error(code, message);
    if let Some(span) = span {
        event = event.with_span(span);
    }
    dispatch(event, context);
}

pub fn log_success_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    dispatch(LogEvent::success(code, message), context);
}

pub fn log_info_with_context(message: &str, context: Vec<(&str, &str)>) {
    dispatch(LogEvent::info(message), context);
}

pub fn log_warning_with_context(message: &str, context: Vec<(&str, &str)>) {
    dispatch(LogEvent::warning(message), context);
}

/// Debug events are dropped before any formatting when filtered out
pub fn log_debug_with_context(message: &str, context: Vec<(&str, &str)>) {
    if get_global_min_level() >= LogLevel::Debug {
        dispatch(LogEvent::debug(message), context);
    }
}

pub fn debug_enabled() -> bool {
    get_global_min_level() >= LogLevel::Debug
}

pub fn get_processing_summary() -> ProcessingSummary {
    try_get_global_error_collector()
        .map(ErrorCollector::summary)
        .unwrap_or_default()
}

pub fn get_file_errors(file_path: &Path) -> Vec<LogEvent> {
    try_get_global_error_collector()
        .map(|collector| collector.file_errors(file_path))
        .unwrap_or_default()
}

/// Print collected diagnostics to stderr when cargo-style output is enabled
pub fn print_cargo_style_summary() {
    if !config::use_cargo_style_output() {
        return;
    }
    if let Some(collector) = try_get_global_error_collector() {
        eprint!("{}", collector::format_cargo_style_errors(collector));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialization_is_idempotent_for_callers() {
        let _ = init_global_logging();
        assert!(is_initialized());
        assert!(init_global_logging().is_err());
    }

    #[test]
    fn test_with_file_context_restores_previous() {
        let outer = PathBuf::from("outer.rascript");
        let inner = PathBuf::from("inner.rascript");

        assert!(get_current_file_context().is_none());
        let value = with_file_context(outer.clone(), 1, || {
            with_file_context(inner.clone(), 2, || {
                assert_eq!(get_current_file_context().unwrap().file_path, inner);
            });
            assert_eq!(get_current_file_context().unwrap().file_id, 1);
            42
        });

        assert_eq!(value, 42);
        assert!(get_current_file_context().is_none());
    }

    #[test]
    fn test_errors_are_collected_per_file() {
        let _ = init_global_logging();
        let path = PathBuf::from("collected_errors_test.rascript");

        with_file_context(path.clone(), 7, || {
            log_error_with_context(
                codes::evaluation::UNKNOWN_IDENTIFIER,
                "Unknown variable: lives",
                None,
                vec![("name", "lives")],
            );
            log_info_with_context("not collected", vec![]);
        });

        let errors = get_file_errors(&path);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].context_value("name"), Some("lives"));
        assert_eq!(
            errors[0].context_value("file"),
            Some("collected_errors_test.rascript")
        );
        assert!(get_processing_summary().total_errors >= 1);
    }

    #[test]
    fn test_logging_without_context_does_not_panic() {
        log_warning_with_context("outside any script", vec![("k", "v")]);
        log_debug_with_context("debug", vec![]);
    }
}
