// build.rs - TOML-driven compile-time constant generation
use std::env;
use std::fs;
use std::path::Path;

#[derive(serde::Deserialize)]
struct CompileTimeConfig {
    file_processing: FileProcessingLimits,
    lexical: LexicalLimits,
    syntax: SyntaxLimits,
    interpreter: InterpreterLimits,
    normalization: NormalizationLimits,
    serialization: SerializationLimits,
    incremental: IncrementalLimits,
    batch_processing: BatchProcessingLimits,
    logging: LoggingLimits,
}

#[derive(serde::Deserialize)]
struct FileProcessingLimits {
    max_file_size: u64,
    large_file_threshold: u64,
    max_line_count: usize,
}

#[derive(serde::Deserialize)]
struct LexicalLimits {
    max_string_size: usize,
    max_identifier_length: usize,
    max_comment_length: usize,
    max_token_count: usize,
}

#[derive(serde::Deserialize)]
struct SyntaxLimits {
    max_parse_depth: usize,
    max_error_history: usize,
    max_function_parameters: usize,
    max_lookahead_tokens: usize,
}

#[derive(serde::Deserialize)]
struct InterpreterLimits {
    max_call_depth: usize,
    max_loop_iterations: usize,
    max_collected_errors: usize,
}

#[derive(serde::Deserialize)]
struct NormalizationLimits {
    max_bcd_digits: u32,
    max_requirements_per_group: usize,
    max_alt_groups: usize,
}

#[derive(serde::Deserialize)]
struct SerializationLimits {
    default_address_width: usize,
    max_hit_count: u32,
}

#[derive(serde::Deserialize)]
struct IncrementalLimits {
    max_propagation_iterations: usize,
    max_groups: usize,
}

#[derive(serde::Deserialize)]
struct BatchProcessingLimits {
    max_worker_threads: usize,
    max_files_per_batch: usize,
}

#[derive(serde::Deserialize)]
struct LoggingLimits {
    max_error_collection: usize,
    log_buffer_size: usize,
    max_log_message_length: usize,
    max_log_events_per_file: usize,
    min_log_level_floor: u8,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=ACH_BUILD_PROFILE");
    println!("cargo:rerun-if-env-changed=ACH_CONFIG_DIR");

    let profile = env::var("ACH_BUILD_PROFILE").unwrap_or_else(|_| "development".to_string());
    let config_dir = env::var("ACH_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

    // Workspace root is the parent of the ach_compiler directory
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = Path::new(&manifest_dir)
        .parent()
        .expect("Could not find workspace root (parent directory)");

    let config_path = workspace_root
        .join(&config_dir)
        .join(format!("{}.toml", profile));

    println!("cargo:rerun-if-changed={}", config_path.display());

    if !config_path.exists() {
        panic!(
            "Configuration file not found: {}\nWorkspace root: {}\nLooking for: {}/{}/{}.toml",
            config_path.display(),
            workspace_root.display(),
            workspace_root.display(),
            config_dir,
            profile
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path.display(), e));

    let config: CompileTimeConfig = toml::from_str(&config_content)
        .unwrap_or_else(|e| panic!("Invalid TOML in {}: {}", config_path.display(), e));

    validate_constraints(&config, &profile);
    generate_constants(&config, &profile);
}

fn validate_constraints(config: &CompileTimeConfig, profile: &str) {
    const ABSOLUTE_MAX_FILE_SIZE: u64 = 1_000_000_000;

    if config.file_processing.max_file_size > ABSOLUTE_MAX_FILE_SIZE {
        panic!("LIMIT: max_file_size exceeds absolute maximum");
    }

    // The runtime contract fixes the call depth ceiling
    if config.interpreter.max_call_depth != 100 {
        panic!(
            "LIMIT: max_call_depth must be 100 (found {})",
            config.interpreter.max_call_depth
        );
    }

    if config.serialization.default_address_width == 0
        || config.serialization.default_address_width > 8
    {
        panic!("LIMIT: default_address_width must be between 1 and 8");
    }

    if config.normalization.max_bcd_digits == 0 || config.normalization.max_bcd_digits > 8 {
        panic!("LIMIT: max_bcd_digits must be between 1 and 8");
    }

    if config.logging.min_log_level_floor > 2 {
        panic!("LIMIT: min_log_level_floor too high (max: 2)");
    }

    if profile == "production" && config.file_processing.max_file_size > 50_000_000 {
        panic!("PRODUCTION: max_file_size too high for production");
    }
}

fn generate_constants(config: &CompileTimeConfig, profile: &str) {
    let out_dir = env::var("OUT_DIR").unwrap();
    let output_path = Path::new(&out_dir).join("constants.rs");

    let constants_code = format!(
        r#"
// Generated compile-time constants from TOML configuration
// Profile: {}
// DO NOT EDIT - Generated by build.rs

pub mod compile_time {{
    pub mod file_processing {{
        pub const MAX_FILE_SIZE: u64 = {};
        pub const LARGE_FILE_THRESHOLD: u64 = {};
        pub const MAX_LINE_COUNT: usize = {};
    }}

    pub mod lexical {{
        pub const MAX_STRING_SIZE: usize = {};
        pub const MAX_IDENTIFIER_LENGTH: usize = {};
        pub const MAX_COMMENT_LENGTH: usize = {};
        pub const MAX_TOKEN_COUNT: usize = {};
    }}

    pub mod syntax {{
        pub const MAX_PARSE_DEPTH: usize = {};
        pub const MAX_ERROR_HISTORY: usize = {};
        pub const MAX_FUNCTION_PARAMETERS: usize = {};
        pub const MAX_LOOKAHEAD_TOKENS: usize = {};
    }}

    pub mod interpreter {{
        pub const MAX_CALL_DEPTH: usize = {};
        pub const MAX_LOOP_ITERATIONS: usize = {};
        pub const MAX_COLLECTED_ERRORS: usize = {};
    }}

    pub mod normalization {{
        pub const MAX_BCD_DIGITS: u32 = {};
        pub const MAX_REQUIREMENTS_PER_GROUP: usize = {};
        pub const MAX_ALT_GROUPS: usize = {};
    }}

    pub mod serialization {{
        pub const DEFAULT_ADDRESS_WIDTH: usize = {};
        pub const MAX_HIT_COUNT: u32 = {};
    }}

    pub mod incremental {{
        pub const MAX_PROPAGATION_ITERATIONS: usize = {};
        pub const MAX_GROUPS: usize = {};
    }}

    pub mod batch_processing {{
        pub const MAX_WORKER_THREADS: usize = {};
        pub const MAX_FILES_PER_BATCH: usize = {};
    }}

    pub mod logging {{
        pub const MAX_ERROR_COLLECTION: usize = {};
        pub const LOG_BUFFER_SIZE: usize = {};
        pub const MAX_LOG_MESSAGE_LENGTH: usize = {};
        pub const MAX_LOG_EVENTS_PER_FILE: usize = {};
        pub const MIN_LOG_LEVEL_FLOOR: u8 = {};
    }}
}}
"#,
        profile,
        // File Processing
        config.file_processing.max_file_size,
        config.file_processing.large_file_threshold,
        config.file_processing.max_line_count,
        // Lexical
        config.lexical.max_string_size,
        config.lexical.max_identifier_length,
        config.lexical.max_comment_length,
        config.lexical.max_token_count,
        // Syntax
        config.syntax.max_parse_depth,
        config.syntax.max_error_history,
        config.syntax.max_function_parameters,
        config.syntax.max_lookahead_tokens,
        // Interpreter
        config.interpreter.max_call_depth,
        config.interpreter.max_loop_iterations,
        config.interpreter.max_collected_errors,
        // Normalization
        config.normalization.max_bcd_digits,
        config.normalization.max_requirements_per_group,
        config.normalization.max_alt_groups,
        // Serialization
        config.serialization.default_address_width,
        config.serialization.max_hit_count,
        // Incremental
        config.incremental.max_propagation_iterations,
        config.incremental.max_groups,
        // Batch Processing
        config.batch_processing.max_worker_threads,
        config.batch_processing.max_files_per_batch,
        // Logging
        config.logging.max_error_collection,
        config.logging.log_buffer_size,
        config.logging.max_log_message_length,
        config.logging.max_log_events_per_file,
        config.logging.min_log_level_floor,
    );

    fs::write(output_path, constants_code).unwrap();
}
