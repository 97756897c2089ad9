//! Consolidated error codes and classification system
//!
//! Single source of truth for all error codes, their metadata, and classification functions.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Critical" => Some(Severity::Critical),
            "High" => Some(Severity::High),
            "Medium" => Some(Severity::Medium),
            "Low" => Some(Severity::Low),
            _ => None,
        }
    }
}

/// Complete metadata for an error code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

/// File processing error codes
pub mod file_processing {
    use super::Code;

    pub const FILE_NOT_FOUND: Code = Code::new("E005");
    pub const INVALID_EXTENSION: Code = Code::new("E006");
    pub const FILE_TOO_LARGE: Code = Code::new("E007");
    pub const EMPTY_FILE: Code = Code::new("E008");
    pub const PERMISSION_DENIED: Code = Code::new("E009");
    pub const INVALID_ENCODING: Code = Code::new("E010");
    pub const IO_ERROR: Code = Code::new("E011");
    pub const INVALID_PATH: Code = Code::new("E012");
    pub const TOO_MANY_LINES: Code = Code::new("E013");
}

/// Lexical analysis error codes
pub mod lexical {
    use super::Code;

    pub const INVALID_CHARACTER: Code = Code::new("E020");
    pub const UNTERMINATED_STRING: Code = Code::new("E021");
    pub const INVALID_NUMBER: Code = Code::new("E022");
    pub const IDENTIFIER_TOO_LONG: Code = Code::new("E023");
    pub const STRING_TOO_LARGE: Code = Code::new("E024");
    pub const UNTERMINATED_COMMENT: Code = Code::new("E025");
    pub const COMMENT_TOO_LONG: Code = Code::new("E026");
    pub const TOO_MANY_TOKENS: Code = Code::new("E027");
    pub const INVALID_ESCAPE: Code = Code::new("E028");
}

/// Syntax analysis error codes
pub mod syntax {
    use super::Code;

    pub const UNEXPECTED_TOKEN: Code = Code::new("E040");
    pub const UNEXPECTED_END: Code = Code::new("E041");
    pub const UNMATCHED_DELIMITER: Code = Code::new("E042");
    pub const INVALID_STATEMENT: Code = Code::new("E043");
    pub const MAX_RECURSION_DEPTH: Code = Code::new("E044");
    pub const TOO_MANY_PARAMETERS: Code = Code::new("E045");
    pub const EMPTY_TOKEN_STREAM: Code = Code::new("E046");
}

/// Evaluation error codes, one per script error kind
pub mod evaluation {
    use super::Code;

    pub const TYPE_ERROR: Code = Code::new("E060");
    pub const UNKNOWN_IDENTIFIER: Code = Code::new("E061");
    pub const SEMANTIC_ERROR: Code = Code::new("E062");
    pub const RECURSION_LIMIT: Code = Code::new("E063");
    pub const RUNTIME_INCOMPATIBILITY: Code = Code::new("E064");
    pub const SYNTAX_ERROR: Code = Code::new("E065");
}

/// Normalization and requirement lowering error codes
pub mod normalization {
    use super::Code;

    pub const DIVISION_BY_ZERO: Code = Code::new("E080");
    pub const BCD_OVERFLOW: Code = Code::new("E081");
    pub const UNSATISFIABLE_TRIGGER: Code = Code::new("E082");
    pub const UNSUPPORTED_EXPRESSION: Code = Code::new("E083");
    pub const TOO_MANY_REQUIREMENTS: Code = Code::new("E084");
}

/// Requirement serialization error codes
pub mod serialization {
    use super::Code;

    pub const INVALID_FORMAT: Code = Code::new("E100");
    pub const UNSUPPORTED_VERSION: Code = Code::new("E101");
    pub const INVALID_ADDRESS: Code = Code::new("E102");
    pub const INVALID_FIELD: Code = Code::new("E103");
    pub const MISSING_TERMINAL: Code = Code::new("E104");
}

/// Incremental engine error codes
pub mod incremental {
    use super::Code;

    pub const GROUP_LIMIT_EXCEEDED: Code = Code::new("E120");
    pub const PROPAGATION_LIMIT: Code = Code::new("E121");
}

/// Pipeline error codes
pub mod pipeline {
    use super::Code;

    pub const PIPELINE_FAILURE: Code = Code::new("E140");
    pub const BATCH_FAILURE: Code = Code::new("E141");
    pub const OUTPUT_FAILURE: Code = Code::new("E142");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

/// Success codes
pub mod success {
    use super::Code;

    pub const OPERATION_COMPLETED_SUCCESSFULLY: Code = Code::new("I001");
    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");

    pub const FILE_PROCESSING_SUCCESS: Code = Code::new("I006");
    pub const FILE_VALIDATION_PASSED: Code = Code::new("I007");

    pub const TOKENIZATION_COMPLETE: Code = Code::new("I020");
    pub const PARSE_COMPLETE: Code = Code::new("I040");
    pub const EVALUATION_COMPLETE: Code = Code::new("I060");
    pub const NORMALIZATION_COMPLETE: Code = Code::new("I080");
    pub const SERIALIZATION_COMPLETE: Code = Code::new("I100");
    pub const INCREMENTAL_UPDATE_COMPLETE: Code = Code::new("I120");

    pub const PIPELINE_COMPLETE: Code = Code::new("I140");
    pub const BATCH_COMPLETE: Code = Code::new("I141");
}

// ============================================================================
// ERROR REGISTRY
// ============================================================================

static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        let mut registry = HashMap::new();

        registry.insert(
            "ERR001",
            ErrorMetadata::new(
                "ERR001",
                "System",
                Severity::Critical,
                false,
                true,
                "Internal compiler error",
                "Report the failure together with the script that triggered it",
            ),
        );

        registry.insert(
            "ERR002",
            ErrorMetadata::new(
                "ERR002",
                "System",
                Severity::Critical,
                false,
                true,
                "Compiler subsystem failed to initialize",
                "Check the build profile and runtime preferences",
            ),
        );

        registry.insert(
            "E005",
            ErrorMetadata::new(
                "E005",
                "FileProcessing",
                Severity::High,
                false,
                false,
                "Script file not found",
                "Check the path passed to the compiler",
            ),
        );

        registry.insert(
            "E006",
            ErrorMetadata::new(
                "E006",
                "FileProcessing",
                Severity::Medium,
                true,
                false,
                "File does not have the .rascript extension",
                "Rename the file or disable the extension requirement",
            ),
        );

        registry.insert(
            "E007",
            ErrorMetadata::new(
                "E007",
                "FileProcessing",
                Severity::High,
                false,
                false,
                "Script file exceeds the maximum allowed size",
                "Split the script or raise the profile limit",
            ),
        );

        registry.insert(
            "E008",
            ErrorMetadata::new(
                "E008",
                "FileProcessing",
                Severity::Low,
                true,
                false,
                "Script file is empty",
                "Add at least one statement",
            ),
        );

        registry.insert(
            "E009",
            ErrorMetadata::new(
                "E009",
                "FileProcessing",
                Severity::High,
                false,
                false,
                "Permission denied reading script file",
                "Check file permissions",
            ),
        );

        registry.insert(
            "E010",
            ErrorMetadata::new(
                "E010",
                "FileProcessing",
                Severity::High,
                false,
                false,
                "Script file is not valid UTF-8",
                "Re-save the script as UTF-8",
            ),
        );

        registry.insert(
            "E011",
            ErrorMetadata::new(
                "E011",
                "FileProcessing",
                Severity::High,
                false,
                false,
                "I/O error while reading script file",
                "Retry the operation",
            ),
        );

        registry.insert(
            "E012",
            ErrorMetadata::new(
                "E012",
                "FileProcessing",
                Severity::Medium,
                false,
                false,
                "Invalid script path",
                "Pass a regular file or a directory",
            ),
        );

        registry.insert(
            "E013",
            ErrorMetadata::new(
                "E013",
                "FileProcessing",
                Severity::Medium,
                false,
                false,
                "Script exceeds the maximum line count",
                "Split the script into smaller files",
            ),
        );

        registry.insert(
            "E020",
            ErrorMetadata::new(
                "E020",
                "Lexical",
                Severity::High,
                true,
                false,
                "Invalid character in script",
                "Remove the unexpected character",
            ),
        );

        registry.insert(
            "E021",
            ErrorMetadata::new(
                "E021",
                "Lexical",
                Severity::High,
                true,
                false,
                "Unterminated string literal",
                "Close the string with a double quote",
            ),
        );

        registry.insert(
            "E022",
            ErrorMetadata::new(
                "E022",
                "Lexical",
                Severity::High,
                true,
                false,
                "Invalid numeric literal",
                "Check the digits of the number",
            ),
        );

        registry.insert(
            "E023",
            ErrorMetadata::new(
                "E023",
                "Lexical",
                Severity::Medium,
                true,
                false,
                "Identifier exceeds the maximum length",
                "Use a shorter name",
            ),
        );

        registry.insert(
            "E024",
            ErrorMetadata::new(
                "E024",
                "Lexical",
                Severity::Medium,
                true,
                false,
                "String literal exceeds the maximum size",
                "Shorten the string",
            ),
        );

        registry.insert(
            "E025",
            ErrorMetadata::new(
                "E025",
                "Lexical",
                Severity::High,
                true,
                false,
                "Unterminated block comment",
                "Close the comment with */",
            ),
        );

        registry.insert(
            "E026",
            ErrorMetadata::new(
                "E026",
                "Lexical",
                Severity::Low,
                true,
                false,
                "Comment exceeds the maximum length",
                "Shorten the comment",
            ),
        );

        registry.insert(
            "E027",
            ErrorMetadata::new(
                "E027",
                "Lexical",
                Severity::High,
                false,
                true,
                "Script exceeds the maximum token count",
                "Split the script into smaller files",
            ),
        );

        registry.insert(
            "E028",
            ErrorMetadata::new(
                "E028",
                "Lexical",
                Severity::Medium,
                true,
                false,
                "Unknown escape sequence in string literal",
                "Use a supported escape sequence",
            ),
        );

        registry.insert(
            "E040",
            ErrorMetadata::new(
                "E040",
                "Syntax",
                Severity::High,
                true,
                false,
                "Unexpected token",
                "Check the statement near the reported position",
            ),
        );

        registry.insert(
            "E041",
            ErrorMetadata::new(
                "E041",
                "Syntax",
                Severity::High,
                true,
                false,
                "Unexpected end of input",
                "Complete the final statement",
            ),
        );

        registry.insert(
            "E042",
            ErrorMetadata::new(
                "E042",
                "Syntax",
                Severity::High,
                true,
                false,
                "Unmatched delimiter",
                "Balance the parentheses, brackets and braces",
            ),
        );

        registry.insert(
            "E043",
            ErrorMetadata::new(
                "E043",
                "Syntax",
                Severity::Medium,
                true,
                false,
                "Expression is not a valid statement",
                "Assign the value or pass it to a function",
            ),
        );

        registry.insert(
            "E044",
            ErrorMetadata::new(
                "E044",
                "Syntax",
                Severity::High,
                false,
                true,
                "Maximum parse depth exceeded",
                "Reduce expression nesting",
            ),
        );

        registry.insert(
            "E045",
            ErrorMetadata::new(
                "E045",
                "Syntax",
                Severity::Medium,
                true,
                false,
                "Too many parameters in function definition",
                "Reduce the parameter count",
            ),
        );

        registry.insert(
            "E046",
            ErrorMetadata::new(
                "E046",
                "Syntax",
                Severity::Low,
                true,
                false,
                "Token stream is empty",
                "Add at least one statement",
            ),
        );

        registry.insert(
            "E060",
            ErrorMetadata::new(
                "E060",
                "Evaluation",
                Severity::High,
                true,
                false,
                "Operands are not compatible with the operator",
                "Check the operand types",
            ),
        );

        registry.insert(
            "E061",
            ErrorMetadata::new(
                "E061",
                "Evaluation",
                Severity::High,
                true,
                false,
                "Unknown variable or function",
                "Define the name before using it",
            ),
        );

        registry.insert(
            "E062",
            ErrorMetadata::new(
                "E062",
                "Evaluation",
                Severity::High,
                true,
                false,
                "Semantic error in expression",
                "Review the reported expression",
            ),
        );

        registry.insert(
            "E063",
            ErrorMetadata::new(
                "E063",
                "Evaluation",
                Severity::Critical,
                false,
                true,
                "Function call nesting exceeds the recursion limit",
                "Remove the unbounded recursion",
            ),
        );

        registry.insert(
            "E064",
            ErrorMetadata::new(
                "E064",
                "Evaluation",
                Severity::High,
                true,
                false,
                "Expression depends on runtime memory where a constant is required",
                "Use a constant condition",
            ),
        );

        registry.insert(
            "E065",
            ErrorMetadata::new(
                "E065",
                "Evaluation",
                Severity::High,
                true,
                false,
                "Syntax error encountered during evaluation",
                "Fix the syntax error first",
            ),
        );

        registry.insert(
            "E080",
            ErrorMetadata::new(
                "E080",
                "Normalization",
                Severity::High,
                true,
                false,
                "Division or modulus by zero",
                "Remove the zero divisor",
            ),
        );

        registry.insert(
            "E081",
            ErrorMetadata::new(
                "E081",
                "Normalization",
                Severity::Medium,
                true,
                false,
                "Constant exceeds the range of a BCD value",
                "Compare against a smaller value",
            ),
        );

        registry.insert(
            "E082",
            ErrorMetadata::new(
                "E082",
                "Normalization",
                Severity::High,
                true,
                false,
                "Trigger can never be true",
                "Review the conditions of the trigger",
            ),
        );

        registry.insert(
            "E083",
            ErrorMetadata::new(
                "E083",
                "Normalization",
                Severity::High,
                true,
                false,
                "Expression cannot be converted to requirements",
                "Rewrite the expression using memory comparisons",
            ),
        );

        registry.insert(
            "E084",
            ErrorMetadata::new(
                "E084",
                "Normalization",
                Severity::Medium,
                true,
                false,
                "Requirement limit exceeded",
                "Simplify the trigger",
            ),
        );

        registry.insert(
            "E100",
            ErrorMetadata::new(
                "E100",
                "Serialization",
                Severity::High,
                false,
                false,
                "Malformed serialized requirement text",
                "Check the serialized definition",
            ),
        );

        registry.insert(
            "E101",
            ErrorMetadata::new(
                "E101",
                "Serialization",
                Severity::Medium,
                false,
                false,
                "Construct is not supported by the target runtime version",
                "Raise the target version or avoid the construct",
            ),
        );

        registry.insert(
            "E102",
            ErrorMetadata::new(
                "E102",
                "Serialization",
                Severity::High,
                false,
                false,
                "Invalid memory address",
                "Check the address",
            ),
        );

        registry.insert(
            "E103",
            ErrorMetadata::new(
                "E103",
                "Serialization",
                Severity::High,
                false,
                false,
                "Invalid field definition",
                "Check the field size and type",
            ),
        );

        registry.insert(
            "E104",
            ErrorMetadata::new(
                "E104",
                "Serialization",
                Severity::High,
                false,
                false,
                "Combining requirement without a terminal requirement",
                "End the chain with a comparison",
            ),
        );

        registry.insert(
            "E120",
            ErrorMetadata::new(
                "E120",
                "Incremental",
                Severity::Medium,
                true,
                false,
                "Expression group limit exceeded",
                "Split the script into smaller files",
            ),
        );

        registry.insert(
            "E121",
            ErrorMetadata::new(
                "E121",
                "Incremental",
                Severity::Medium,
                true,
                false,
                "Dependency propagation did not converge",
                "Trigger a full re-evaluation",
            ),
        );

        registry.insert(
            "E140",
            ErrorMetadata::new(
                "E140",
                "Pipeline",
                Severity::High,
                true,
                false,
                "Compilation pipeline failed",
                "Review the stage errors",
            ),
        );

        registry.insert(
            "E141",
            ErrorMetadata::new(
                "E141",
                "Pipeline",
                Severity::Medium,
                true,
                false,
                "Batch processing failed",
                "Review the individual file errors",
            ),
        );

        registry.insert(
            "E142",
            ErrorMetadata::new(
                "E142",
                "Pipeline",
                Severity::Medium,
                true,
                false,
                "Failed to produce compiler output",
                "Check the output options",
            ),
        );

        // Success codes

        registry.insert(
            "I001",
            ErrorMetadata::new("I001", "General", Severity::Low, true, false, "Operation completed successfully", "No action required"),
        );

        registry.insert(
            "I004",
            ErrorMetadata::new("I004", "System", Severity::Low, true, false, "System initialization completed", "Continue with processing"),
        );

        registry.insert(
            "I006",
            ErrorMetadata::new("I006", "FileProcessing", Severity::Low, true, false, "Script file processed successfully", "Continue to lexical analysis"),
        );

        registry.insert(
            "I007",
            ErrorMetadata::new("I007", "FileProcessing", Severity::Low, true, false, "Script file validation passed", "Continue with processing"),
        );

        registry.insert(
            "I020",
            ErrorMetadata::new("I020", "Lexical", Severity::Low, true, false, "Tokenization completed successfully", "Continue to parsing"),
        );

        registry.insert(
            "I040",
            ErrorMetadata::new("I040", "Syntax", Severity::Low, true, false, "Parsing completed successfully", "Continue to evaluation"),
        );

        registry.insert(
            "I060",
            ErrorMetadata::new("I060", "Evaluation", Severity::Low, true, false, "Evaluation completed successfully", "Continue to requirement generation"),
        );

        registry.insert(
            "I080",
            ErrorMetadata::new("I080", "Normalization", Severity::Low, true, false, "Requirement lowering completed successfully", "Continue to serialization"),
        );

        registry.insert(
            "I100",
            ErrorMetadata::new("I100", "Serialization", Severity::Low, true, false, "Serialization completed successfully", "No action required"),
        );

        registry.insert(
            "I120",
            ErrorMetadata::new("I120", "Incremental", Severity::Low, true, false, "Incremental update completed", "Evaluate the flagged groups"),
        );

        registry.insert(
            "I140",
            ErrorMetadata::new("I140", "Pipeline", Severity::Low, true, false, "Compilation pipeline completed", "No action required"),
        );

        registry.insert(
            "I141",
            ErrorMetadata::new("I141", "Pipeline", Severity::Low, true, false, "Batch processing completed", "No action required"),
        );

        registry
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

/// Get error metadata for a specific error code
pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

/// Get error severity from error code
pub fn get_severity(code: &str) -> Severity {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

/// Check if error is recoverable
pub fn is_recoverable(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

/// Check if error requires immediate halt
pub fn requires_halt(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

/// Get human-readable description for error code
pub fn get_description(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

/// Get recommended action for error code
pub fn get_action(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

/// Get error category from error code
pub fn get_category(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}
