//! Algebraic normalization and requirement lowering
//!
//! Evaluation funnels every operator through this module:
//!
//! - [`combine_mathematic`] folds constants, prunes identities and
//!   rebalances operator chains
//! - [`normalize_comparison`] rewrites comparisons into canonical
//!   requirement form, including BCD and float lowering
//! - [`combine_logical`] and [`invert`] simplify boolean structure
//! - [`build_trigger`] and [`build_value`] lower the result into the
//!   requirement IR

mod comparison;
mod logical;
mod lowering;
mod mathematic;

pub use comparison::normalize_comparison;
pub use logical::{combine_logical, invert, is_condition};
pub use lowering::{build_trigger, build_value};
pub use mathematic::{combine_mathematic, Number};

use crate::interpreter::ErrorExpression;
use crate::logging::{codes, Code};
use crate::log_error;
use crate::utils::Span;

/// Semantic error with a normalization code attached to the log record
pub(crate) fn normalization_error(code: Code, message: impl Into<String>, span: Span) -> ErrorExpression {
    let message = message.into();
    log_error!(code, "Normalization failed", span = span, "message" => message.as_str());
    ErrorExpression::semantic(message, span)
}

/// Initialize normalization logging and validate error codes
pub fn init_normalization_logging() -> Result<(), String> {
    let test_codes = [
        codes::normalization::DIVISION_BY_ZERO,
        codes::normalization::BCD_OVERFLOW,
        codes::normalization::UNSATISFIABLE_TRIGGER,
        codes::normalization::UNSUPPORTED_EXPRESSION,
        codes::normalization::TOO_MANY_REQUIREMENTS,
    ];

    for code in &test_codes {
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "Normalization error code {} not registered",
                code.as_str()
            ));
        }
    }

    crate::log_success!(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Normalization logging validation completed",
        "error_codes_validated" => test_codes.len()
    );
    Ok(())
}
