//! Per-file collection of errors and warnings for cargo-style reporting

use super::events::LogEvent;
use crate::config::compile_time::logging::{MAX_ERROR_COLLECTION, MAX_LOG_EVENTS_PER_FILE};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// The script a thread is currently compiling
#[derive(Debug, Clone)]
pub struct FileProcessingContext {
    pub file_path: PathBuf,
    pub file_id: usize,
    pub start_time: Instant,
}

impl FileProcessingContext {
    pub fn new(file_path: PathBuf, file_id: usize) -> Self {
        Self {
            file_path,
            file_id,
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    pub total_files: usize,
    pub files_with_errors: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl ProcessingSummary {
    pub fn clean_files(&self) -> usize {
        self.total_files - self.files_with_errors
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }
}

#[derive(Debug, Default)]
struct CollectorState {
    events: BTreeMap<PathBuf, Vec<LogEvent>>,
    files: BTreeMap<PathBuf, FileProcessingContext>,
    total_events: usize,
}

/// Thread-safe store of warnings and errors keyed by script path
#[derive(Debug, Default)]
pub struct ErrorCollector {
    state: Mutex<CollectorState>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CollectorState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record an event; only errors and warnings are kept
    pub fn record_event(&self, file_path: &Path, event: LogEvent) {
        if !event.is_error() && !event.is_warning() {
            return;
        }

        let mut state = self.lock();
        if state.total_events >= MAX_ERROR_COLLECTION {
            return;
        }

        let file_events = state.events.entry(file_path.to_path_buf()).or_default();
        if file_events.len() < MAX_LOG_EVENTS_PER_FILE {
            file_events.push(event);
        } else if file_events.len() == MAX_LOG_EVENTS_PER_FILE {
            file_events.push(LogEvent::warning(&format!(
                "Further events suppressed (limit: {})",
                MAX_LOG_EVENTS_PER_FILE
            )));
        } else {
            return;
        }
        state.total_events += 1;
    }

    pub fn record_file_context(&self, context: FileProcessingContext) {
        self.lock().files.insert(context.file_path.clone(), context);
    }

    pub fn file_events(&self, file_path: &Path) -> Vec<LogEvent> {
        self.lock()
            .events
            .get(file_path)
            .cloned()
            .unwrap_or_default()
    }

    pub fn file_errors(&self, file_path: &Path) -> Vec<LogEvent> {
        self.file_events(file_path)
            .into_iter()
            .filter(|e| e.is_error())
            .collect()
    }

    pub fn all_file_events(&self) -> BTreeMap<PathBuf, Vec<LogEvent>> {
        self.lock().events.clone()
    }

    pub fn summary(&self) -> ProcessingSummary {
        let state = self.lock();
        let mut summary = ProcessingSummary {
            total_files: state.files.len(),
            ..ProcessingSummary::default()
        };

        for events in state.events.values() {
            let errors = events.iter().filter(|e| e.is_error()).count();
            summary.total_errors += errors;
            summary.total_warnings += events.iter().filter(|e| e.is_warning()).count();
            if errors > 0 {
                summary.files_with_errors += 1;
            }
        }
        // Files can log errors before a context is recorded for them
        summary.total_files = summary.total_files.max(summary.files_with_errors);
        summary
    }

    pub fn clear(&self) {
        *self.lock() = CollectorState::default();
    }
}

fn format_event(output: &mut String, file_path: &Path, event: &LogEvent) {
    let label = if event.is_error() { "error" } else { "warning" };
    output.push_str(&format!("{}[{}]: {}\n", label, event.code.as_str(), event.message));

    if let Some(span) = &event.span {
        output.push_str(&format!(
            "  --> {}:{}:{}\n",
            file_path.display(),
            span.start.line,
            span.start.column
        ));
    }

    for (key, value) in &event.context {
        if key != "file" && key != "file_id" {
            output.push_str(&format!("  = {}: {}\n", key, value));
        }
    }

    if event.is_error() {
        let action = event.recommended_action();
        if action != "No specific action available" {
            output.push_str(&format!("  = help: {}\n", action));
        }
    }
}

/// Render every collected event grouped by file, followed by totals
pub fn format_cargo_style_errors(collector: &ErrorCollector) -> String {
    let mut output = String::new();

    for (file_path, events) in collector.all_file_events() {
        if events.is_empty() {
            continue;
        }
        for event in events.iter().filter(|e| e.is_error()) {
            format_event(&mut output, &file_path, event);
        }
        for event in events.iter().filter(|e| e.is_warning()) {
            format_event(&mut output, &file_path, event);
        }
        output.push('\n');
    }

    let summary = collector.summary();
    if summary.has_errors() {
        output.push_str(&format!(
            "error: {} error(s) in {} of {} file(s)\n",
            summary.total_errors, summary.files_with_errors, summary.total_files
        ));
    } else {
        output.push_str(&format!("Finished: {} file(s) without errors\n", summary.total_files));
    }
    if summary.total_warnings > 0 {
        output.push_str(&format!("warning: {} warning(s) emitted\n", summary.total_warnings));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::codes;
    use crate::utils::{Position, Span};

    fn script(name: &str) -> PathBuf {
        PathBuf::from(name)
    }

    #[test]
    fn test_records_only_errors_and_warnings() {
        let collector = ErrorCollector::new();
        let path = script("set.rascript");
        collector.record_file_context(FileProcessingContext::new(path.clone(), 0));
        collector.record_event(&path, LogEvent::info("ignored"));
        collector.record_event(&path, LogEvent::warning("suspicious"));
        collector.record_event(
            &path,
            LogEvent::error(codes::evaluation::UNKNOWN_IDENTIFIER, "Unknown variable: hp"),
        );

        assert_eq!(collector.file_events(&path).len(), 2);
        assert_eq!(collector.file_errors(&path).len(), 1);

        let summary = collector.summary();
        assert_eq!(summary.total_files, 1);
        assert_eq!(summary.files_with_errors, 1);
        assert_eq!(summary.total_warnings, 1);
        assert_eq!(summary.clean_files(), 0);
    }

    #[test]
    fn test_per_file_limit_adds_suppression_marker() {
        let collector = ErrorCollector::new();
        let path = script("noisy.rascript");
        for i in 0..MAX_LOG_EVENTS_PER_FILE + 5 {
            collector.record_event(&path, LogEvent::warning(&format!("warning {}", i)));
        }

        let events = collector.file_events(&path);
        assert_eq!(events.len(), MAX_LOG_EVENTS_PER_FILE + 1);
        assert!(events.last().unwrap().message.starts_with("Further events suppressed"));
    }

    #[test]
    fn test_cargo_style_output() {
        let collector = ErrorCollector::new();
        let path = script("game.rascript");
        let span = Span::single(Position::new(40, 3, 12));
        collector.record_event(
            &path,
            LogEvent::error(codes::evaluation::UNKNOWN_IDENTIFIER, "Unknown variable: hp")
                .with_span(span)
                .with_context("file", "game.rascript")
                .with_context("name", "hp"),
        );

        let output = format_cargo_style_errors(&collector);
        assert!(output.contains("error[E061]: Unknown variable: hp"));
        assert!(output.contains("  --> game.rascript:3:12"));
        assert!(output.contains("  = name: hp"));
        assert!(!output.contains("  = file:"));
        assert!(output.contains("error: 1 error(s) in 1 of 1 file(s)"));
    }

    #[test]
    fn test_clear_resets_state() {
        let collector = ErrorCollector::new();
        let path = script("a.rascript");
        collector.record_event(&path, LogEvent::warning("w"));
        collector.clear();
        assert_eq!(collector.summary(), ProcessingSummary::default());
        assert!(format_cargo_style_errors(&collector).contains("Finished: 0 file(s)"));
    }
}
