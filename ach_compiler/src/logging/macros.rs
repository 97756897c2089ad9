//! Logging macros
//!
//! Context values may be any `Display` type; they are formatted once and
//! passed to the matching `log_*_with_context` function.

/// Format `key => value` pairs into owned strings
#[doc(hidden)]
#[macro_export]
macro_rules! __log_context {
    ($($key:expr => $value:expr),*) => {
        vec![$(($key, format!("{}", $value))),*]
    };
}

/// Borrow the owned pairs built by `__log_context!`
#[doc(hidden)]
pub fn context_refs<'a>(pairs: &'a [(&'a str, String)]) -> Vec<(&'a str, &'a str)> {
    pairs.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

#[macro_export]
macro_rules! log_error {
    ($code:expr, $message:expr) => {
        $crate::logging::log_error_with_context($code, $message, None, vec![])
    };
    ($code:expr, $message:expr, span = $span:expr $(, $key:expr => $value:expr)*) => {{
        let pairs: Vec<(&str, String)> = $crate::__log_context!($($key => $value),*);
        $crate::logging::log_error_with_context(
            $code,
            $message,
            Some($span),
            $crate::logging::macros::context_refs(&pairs),
        )
    }};
    ($code:expr, $message:expr, $($key:expr => $value:expr),+) => {{
        let pairs: Vec<(&str, String)> = $crate::__log_context!($($key => $value),+);
        $crate::logging::log_error_with_context(
            $code,
            $message,
            None,
            $crate::logging::macros::context_refs(&pairs),
        )
    }};
}

#[macro_export]
macro_rules! log_success {
    ($code:expr, $message:expr $(, $key:expr => $value:expr)*) => {{
        let pairs: Vec<(&str, String)> = $crate::__log_context!($($key => $value),*);
        $crate::logging::log_success_with_context(
            $code,
            $message,
            $crate::logging::macros::context_refs(&pairs),
        )
    }};
}

#[macro_export]
macro_rules! log_info {
    ($message:expr $(, $key:expr => $value:expr)*) => {{
        let pairs: Vec<(&str, String)> = $crate::__log_context!($($key => $value),*);
        $crate::logging::log_info_with_context(
            $message,
            $crate::logging::macros::context_refs(&pairs),
        )
    }};
}

#[macro_export]
macro_rules! log_warning {
    ($message:expr $(, $key:expr => $value:expr)*) => {{
        let pairs: Vec<(&str, String)> = $crate::__log_context!($($key => $value),*);
        $crate::logging::log_warning_with_context(
            $message,
            $crate::logging::macros::context_refs(&pairs),
        )
    }};
}

/// Context values are not formatted unless debug output is enabled
#[macro_export]
macro_rules! log_debug {
    ($message:expr $(, $key:expr => $value:expr)*) => {{
        if $crate::logging::debug_enabled() {
            let pairs: Vec<(&str, String)> = $crate::__log_context!($($key => $value),*);
            $crate::logging::log_debug_with_context(
                $message,
                $crate::logging::macros::context_refs(&pairs),
            )
        }
    }};
}

/// Success event with the elapsed time in milliseconds
#[macro_export]
macro_rules! log_performance {
    ($code:expr, $message:expr, duration = $duration:expr $(, $key:expr => $value:expr)*) => {
        $crate::log_success!($code, $message,
            "duration_ms" => format!("{:.3}", $duration.as_secs_f64() * 1000.0)
            $(, $key => $value)*
        )
    };
}

#[cfg(test)]
mod tests {
    use crate::logging::codes;
    use crate::utils::{Position, Span};

    #[test]
    fn test_macros_accept_display_context() {
        let _ = crate::logging::init_global_logging();
        let address: u32 = 0x1234;
        let duration = std::time::Duration::from_millis(12);
        let span = Span::single(Position::new(0, 1, 1));

        log_error!(codes::evaluation::UNKNOWN_IDENTIFIER, "Unknown identifier");
        log_error!(codes::evaluation::UNKNOWN_IDENTIFIER, "Unknown identifier",
            "name" => "score",
            "line" => 3
        );
        log_error!(codes::evaluation::TYPE_ERROR, "Bad operand", span = span);
        log_error!(codes::evaluation::TYPE_ERROR, "Bad operand", span = span, "op" => "+");
        log_success!(codes::success::EVALUATION_COMPLETE, "Evaluated");
        log_success!(codes::success::EVALUATION_COMPLETE, "Evaluated", "groups" => 4);
        log_info!("Lowering trigger", "address" => format!("0x{:06x}", address));
        log_warning!("Group skipped");
        log_warning!("Group skipped", "line" => 7);
        log_debug!("Debug detail", "flag" => true);
        log_performance!(codes::success::PIPELINE_COMPLETE, "Compiled", duration = duration);
        log_performance!(codes::success::PIPELINE_COMPLETE, "Compiled",
            duration = duration,
            "achievements" => 2
        );
    }

    #[test]
    fn test_context_refs_borrows_pairs() {
        let pairs: Vec<(&str, String)> = crate::__log_context!("a" => 1, "b" => "two");
        let refs = super::context_refs(&pairs);
        assert_eq!(refs, vec![("a", "1"), ("b", "two")]);
    }
}
