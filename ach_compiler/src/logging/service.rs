//! Logging service and its backends
//!
//! All backends write to stderr so that compiled output on stdout stays
//! machine readable.

use super::config;
use super::events::{LogEvent, LogLevel};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub trait Logger: Send + Sync {
    fn log(&self, event: &LogEvent);
}

/// Level filter in front of a single backend
pub struct LoggingService {
    logger: Arc<dyn Logger>,
    min_level: LogLevel,
}

impl LoggingService {
    pub fn new(logger: Arc<dyn Logger>, min_level: LogLevel) -> Self {
        Self { logger, min_level }
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn should_log(&self, level: LogLevel) -> bool {
        level <= self.min_level
    }

    pub fn log_event(&self, event: LogEvent) {
        if self.should_log(event.level) {
            self.logger.log(&event);
        }
    }
}

/// Human readable lines, silent unless console logging is enabled
pub struct ConsoleLogger {
    enabled: bool,
}

impl ConsoleLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, event: &LogEvent) {
        if !self.enabled {
            return;
        }
        if config::include_file_context() {
            eprintln!("{}", event.format_detailed());
        } else {
            eprintln!("{}", event.format());
        }
    }
}

/// One JSON object per line
pub struct StructuredLogger;

impl Logger for StructuredLogger {
    fn log(&self, event: &LogEvent) {
        match event.format_json() {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("{}", event.format()),
        }
    }
}

/// Keeps the most recent events in a bounded ring
pub struct MemoryLogger {
    events: Mutex<VecDeque<LogEvent>>,
    capacity: usize,
}

impl MemoryLogger {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LogEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.lock().iter().cloned().collect()
    }

    pub fn errors(&self) -> Vec<LogEvent> {
        self.lock().iter().filter(|e| e.is_error()).cloned().collect()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.lock().iter().any(|e| e.code.as_str() == code)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Logger for MemoryLogger {
    fn log(&self, event: &LogEvent) {
        let mut events = self.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Service built from the runtime logging preferences
pub fn create_configured_service() -> LoggingService {
    let logger: Arc<dyn Logger> = if config::use_structured_logging() {
        Arc::new(StructuredLogger)
    } else {
        Arc::new(ConsoleLogger::new(config::use_console_logging()))
    };
    LoggingService::new(logger, config::get_min_log_level())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::codes;

    #[test]
    fn test_service_filters_by_level() {
        let memory = Arc::new(MemoryLogger::new(16));
        let service = LoggingService::new(memory.clone(), LogLevel::Warning);

        service.log_event(LogEvent::error(codes::evaluation::TYPE_ERROR, "bad operand"));
        service.log_event(LogEvent::warning("group skipped"));
        service.log_event(LogEvent::debug("noise"));

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.errors().len(), 1);
        assert!(memory.has_code("E060"));
    }

    #[test]
    fn test_memory_logger_drops_oldest() {
        let memory = MemoryLogger::new(2);
        memory.log(&LogEvent::info("first"));
        memory.log(&LogEvent::info("second"));
        memory.log(&LogEvent::info("third"));

        let messages: Vec<_> = memory.events().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["second", "third"]);

        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn test_configured_service_respects_floor() {
        let service = create_configured_service();
        assert!(service.should_log(LogLevel::Error));
        assert_eq!(service.min_level(), config::get_min_log_level());
    }
}
