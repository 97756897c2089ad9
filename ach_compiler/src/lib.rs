// Internal modules
pub mod batch;
pub mod config;
pub mod file_processor;
pub mod grammar;
pub mod incremental;
pub mod interpreter;
pub mod lexical;
#[macro_use]
pub mod logging;
pub mod normalization;
pub mod output;
pub mod pipeline;
pub mod requirements;
pub mod syntax;
pub mod tokens;
pub mod utils;

// Re-export key types for library consumers
pub use batch::{BatchConfig, BatchError, BatchResults};
pub use incremental::{EvaluationSummary, ExpressionGroupCollection};
pub use pipeline::{compile_source, CompiledScript, PipelineError, PipelineResult};

// Re-export pipeline output for JSON consumers
pub use pipeline::output::PipelineOutput;
