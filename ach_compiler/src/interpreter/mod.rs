//! Tree-walking interpreter
//!
//! Statements run against an [`InterpreterScope`]. Expressions reduce to
//! fully expanded nodes; calls to the output builtins lower their
//! conditions and append the compiled objects to the scope's collector.

mod builtins;
mod error;
mod evaluator;
mod functions;
mod scope;

pub use builtins::{find_builtin, is_builtin, Builtin};
pub use error::{ErrorExpression, ErrorKind, EvaluationResult};
pub use evaluator::{call_function, evaluate, execute, execute_block};
pub use functions::{bind_arguments, call_reference, BoundArguments, CallArguments};
pub use scope::{Completion, FrameKind, InterpreterScope};

use crate::logging::codes;

/// Initialize interpreter logging and validate error codes
pub fn init_interpreter_logging() -> Result<(), String> {
    let test_codes = [
        codes::evaluation::TYPE_ERROR,
        codes::evaluation::UNKNOWN_IDENTIFIER,
        codes::evaluation::SEMANTIC_ERROR,
        codes::evaluation::RECURSION_LIMIT,
        codes::evaluation::RUNTIME_INCOMPATIBILITY,
        codes::evaluation::SYNTAX_ERROR,
    ];

    for code in &test_codes {
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "Evaluation error code {} not registered",
                code.as_str()
            ));
        }
    }

    crate::log_success!(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Interpreter logging validation completed",
        "error_codes_validated" => test_codes.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_interpreter_logging() {
        let _ = crate::logging::init_global_logging();
        assert!(init_interpreter_logging().is_ok());
    }
}
