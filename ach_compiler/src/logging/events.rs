//! Log events emitted by every compiler stage

use super::codes::{self, Code};
use crate::config::constants::compile_time::logging::MAX_LOG_MESSAGE_LENGTH;
use crate::utils::Span;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
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
}

/// Placeholder codes for events that carry no registered code
const WARNING_CODE: Code = Code::new("W000");
const INFO_CODE: Code = Code::new("I000");
const DEBUG_CODE: Code = Code::new("D000");

#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub code: Code,
    pub message: String,
    /// Script location, for diagnostics raised while compiling
    pub span: Option<Span>,
    /// Key/value pairs in insertion order
    pub context: Vec<(String, String)>,
}

impl LogEvent {
    pub fn new(level: LogLevel, code: Code, message: &str) -> Self {
        let message = if message.len() > MAX_LOG_MESSAGE_LENGTH {
            let mut end = MAX_LOG_MESSAGE_LENGTH;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &message[..end])
        } else {
            message.to_string()
        };
        Self {
            timestamp: Utc::now(),
            level,
            code,
            message,
            span: None,
            context: Vec::new(),
        }
    }

    pub fn error(code: Code, message: &str) -> Self {
        Self::new(LogLevel::Error, code, message)
    }

    pub fn warning(message: &str) -> Self {
        Self::new(LogLevel::Warning, WARNING_CODE, message)
    }

    pub fn info(message: &str) -> Self {
        Self::new(LogLevel::Info, INFO_CODE, message)
    }

    /// Info event carrying a success code
    pub fn success(code: Code, message: &str) -> Self {
        Self::new(LogLevel::Info, code, message)
    }

    pub fn debug(message: &str) -> Self {
        Self::new(LogLevel::Debug, DEBUG_CODE, message)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Add a context pair, replacing an earlier value for the same key
    pub fn with_context(mut self, key: &str, value: &str) -> Self {
        match self.context.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.context.push((key.to_string(), value.to_string())),
        }
        self
    }

    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }

    pub fn is_warning(&self) -> bool {
        self.level == LogLevel::Warning
    }

    pub fn requires_halt(&self) -> bool {
        codes::requires_halt(self.code.as_str())
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.code.as_str()).as_str()
    }

    pub fn category(&self) -> &'static str {
        codes::get_category(self.code.as_str())
    }

    pub fn description(&self) -> &'static str {
        codes::get_description(self.code.as_str())
    }

    pub fn recommended_action(&self) -> &'static str {
        codes::get_action(self.code.as_str())
    }

    /// `[LEVEL] CODE - message at line:column`
    pub fn format(&self) -> String {
        let location = self
            .span
            .map(|s| format!(" at {}:{}", s.start.line, s.start.column))
            .unwrap_or_default();
        format!(
            "[{}] {} - {}{}",
            self.level.as_str(),
            self.code.as_str(),
            self.message,
            location
        )
    }

    /// [`format`](Self::format) plus registry metadata and context
    pub fn format_detailed(&self) -> String {
        let mut output = self.format();
        output.push_str(&format!(
            "\n  Category: {}\n  Severity: {}",
            self.category(),
            self.severity()
        ));

        let description = self.description();
        if description != "Unknown error" {
            output.push_str(&format!("\n  Description: {}", description));
        }
        if self.is_error() {
            output.push_str(&format!("\n  Recommended action: {}", self.recommended_action()));
        }
        for (key, value) in &self.context {
            output.push_str(&format!("\n  {}: {}", key, value));
        }
        output
    }

    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339(),
            "level": self.level.as_str(),
            "code": self.code.as_str(),
            "message": self.message,
            "category": self.category(),
        });

        if let Some(span) = &self.span {
            json["span"] = serde_json::json!({
                "line": span.start.line,
                "column": span.start.column,
                "end_line": span.end.line,
                "end_column": span.end.column,
            });
        }

        if !self.context.is_empty() {
            json["context"] = serde_json::Value::Object(
                self.context
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect(),
            );
        }

        serde_json::to_string(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Position;

    #[test]
    fn test_error_event_metadata() {
        let event = LogEvent::error(codes::evaluation::UNKNOWN_IDENTIFIER, "Unknown variable: x");
        assert!(event.is_error());
        assert_eq!(event.code.as_str(), "E061");
        assert_eq!(event.category(), "Evaluation");
    }

    #[test]
    fn test_context_keeps_order_and_replaces() {
        let event = LogEvent::info("Compiled")
            .with_context("file", "a.rascript")
            .with_context("groups", "3")
            .with_context("file", "b.rascript");
        assert_eq!(event.context.len(), 2);
        assert_eq!(event.context[0].0, "file");
        assert_eq!(event.context_value("file"), Some("b.rascript"));
    }

    #[test]
    fn test_format_includes_location() {
        let span = Span::single(Position::new(0, 4, 9));
        let event = LogEvent::error(codes::evaluation::TYPE_ERROR, "Cannot compare").with_span(span);
        let formatted = event.format();
        assert!(formatted.starts_with("[ERROR] E060 - Cannot compare"));
        assert!(formatted.ends_with("at 4:9"));
    }

    #[test]
    fn test_long_messages_are_truncated() {
        let message = "x".repeat(MAX_LOG_MESSAGE_LENGTH + 10);
        let event = LogEvent::warning(&message);
        assert_eq!(event.message.len(), MAX_LOG_MESSAGE_LENGTH + 3);
        assert_eq!(event.code.as_str(), "W000");
    }

    #[test]
    fn test_json_formatting() {
        let event = LogEvent::error(codes::file_processing::PERMISSION_DENIED, "Access denied")
            .with_context("file", "set.rascript");
        let json: serde_json::Value = serde_json::from_str(&event.format_json().unwrap()).unwrap();
        assert_eq!(json["level"], "ERROR");
        assert_eq!(json["code"], "E009");
        assert_eq!(json["context"]["file"], "set.rascript");
    }
}
