//! Documented constant facade over the generated limits plus the fixed
//! constants of the requirement wire format, which are not tunable.

pub mod compile_time {
    pub mod file_processing {
        /// Maximum script size accepted by the file processor
        pub const MAX_FILE_SIZE: u64 = crate::config::compile_time::file_processing::MAX_FILE_SIZE;

        /// Files above this size are logged as large
        pub const LARGE_FILE_THRESHOLD: u64 =
            crate::config::compile_time::file_processing::LARGE_FILE_THRESHOLD;

        /// Maximum number of source lines in one script
        pub const MAX_LINE_COUNT: usize =
            crate::config::compile_time::file_processing::MAX_LINE_COUNT;

        /// Extension recognised as an achievement script
        pub const SCRIPT_EXTENSION: &str = "rascript";
    }

    pub mod lexical {
        /// Maximum string literal size in bytes
        pub const MAX_STRING_SIZE: usize = crate::config::compile_time::lexical::MAX_STRING_SIZE;

        /// Maximum identifier length
        pub const MAX_IDENTIFIER_LENGTH: usize =
            crate::config::compile_time::lexical::MAX_IDENTIFIER_LENGTH;

        /// Maximum length of a single comment
        pub const MAX_COMMENT_LENGTH: usize =
            crate::config::compile_time::lexical::MAX_COMMENT_LENGTH;

        /// Maximum number of tokens in one script
        pub const MAX_TOKEN_COUNT: usize = crate::config::compile_time::lexical::MAX_TOKEN_COUNT;
    }

    pub mod syntax {
        /// Maximum parser recursion depth
        pub const MAX_PARSE_DEPTH: usize = crate::config::compile_time::syntax::MAX_PARSE_DEPTH;

        /// Parser error history ring size
        pub const MAX_ERROR_HISTORY: usize = crate::config::compile_time::syntax::MAX_ERROR_HISTORY;

        /// Maximum parameters accepted in a function definition
        pub const MAX_FUNCTION_PARAMETERS: usize =
            crate::config::compile_time::syntax::MAX_FUNCTION_PARAMETERS;

        /// Lookahead window for anonymous function detection
        pub const MAX_LOOKAHEAD_TOKENS: usize =
            crate::config::compile_time::syntax::MAX_LOOKAHEAD_TOKENS;
    }

    pub mod interpreter {
        /// Function call nesting ceiling. Exceeding it is fatal for the
        /// current top-level evaluation.
        pub const MAX_CALL_DEPTH: usize = crate::config::compile_time::interpreter::MAX_CALL_DEPTH;

        /// Iteration ceiling for a single `for` loop
        pub const MAX_LOOP_ITERATIONS: usize =
            crate::config::compile_time::interpreter::MAX_LOOP_ITERATIONS;

        /// Maximum evaluation errors retained per collection
        pub const MAX_COLLECTED_ERRORS: usize =
            crate::config::compile_time::interpreter::MAX_COLLECTED_ERRORS;
    }

    pub mod normalization {
        /// Largest number of decimal digits a BCD view can hold
        pub const MAX_BCD_DIGITS: u32 = crate::config::compile_time::normalization::MAX_BCD_DIGITS;

        /// Maximum requirements produced for one group
        pub const MAX_REQUIREMENTS_PER_GROUP: usize =
            crate::config::compile_time::normalization::MAX_REQUIREMENTS_PER_GROUP;

        /// Maximum alternative groups in one trigger
        pub const MAX_ALT_GROUPS: usize = crate::config::compile_time::normalization::MAX_ALT_GROUPS;
    }

    pub mod serialization {
        /// Hex digits written for memory addresses unless overridden
        pub const DEFAULT_ADDRESS_WIDTH: usize =
            crate::config::compile_time::serialization::DEFAULT_ADDRESS_WIDTH;

        /// Largest hit count target
        pub const MAX_HIT_COUNT: u32 = crate::config::compile_time::serialization::MAX_HIT_COUNT;

        /// Widest address accepted by the runtime
        pub const MAX_ADDRESS_WIDTH: usize = 8;

        pub const REQUIREMENT_SEPARATOR: char = '_';
        pub const GROUP_SEPARATOR: char = 'S';
        pub const VALUE_SEPARATOR: char = '$';
        pub const LEADERBOARD_SEPARATOR: &str = "::";
    }

    pub mod incremental {
        /// Upper bound on dependency propagation rounds
        pub const MAX_PROPAGATION_ITERATIONS: usize =
            crate::config::compile_time::incremental::MAX_PROPAGATION_ITERATIONS;

        pub const MAX_GROUPS: usize = crate::config::compile_time::incremental::MAX_GROUPS;
    }

    pub mod batch_processing {
        pub const MAX_WORKER_THREADS: usize =
            crate::config::compile_time::batch_processing::MAX_WORKER_THREADS;

        pub const MAX_FILES_PER_BATCH: usize =
            crate::config::compile_time::batch_processing::MAX_FILES_PER_BATCH;
    }

    pub mod logging {
        /// Maximum errors to collect before stopping
        pub const MAX_ERROR_COLLECTION: usize =
            crate::config::compile_time::logging::MAX_ERROR_COLLECTION;

        /// Log buffer size for the memory logger
        pub const LOG_BUFFER_SIZE: usize = crate::config::compile_time::logging::LOG_BUFFER_SIZE;

        /// Messages longer than this are truncated
        pub const MAX_LOG_MESSAGE_LENGTH: usize =
            crate::config::compile_time::logging::MAX_LOG_MESSAGE_LENGTH;

        /// Maximum log events kept per file in the collector
        pub const MAX_LOG_EVENTS_PER_FILE: usize =
            crate::config::compile_time::logging::MAX_LOG_EVENTS_PER_FILE;

        /// Runtime preferences cannot lower the level below this floor
        pub const MIN_LOG_LEVEL_FLOOR: u8 = crate::config::compile_time::logging::MIN_LOG_LEVEL_FLOOR;
    }
}
