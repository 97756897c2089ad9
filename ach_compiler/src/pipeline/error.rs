use crate::file_processor::FileProcessorError;
use crate::lexical::LexerError;
use crate::logging::{codes, Code};
use crate::requirements::SerializationError;

/// Pipeline processing errors
///
/// Script diagnostics (type errors, unknown names, ...) are not pipeline
/// errors; they travel in [`PipelineResult::diagnostics`](super::PipelineResult).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("File processing failed: {0}")]
    FileProcessing(#[from] FileProcessorError),

    #[error("Lexical analysis failed: {0}")]
    LexicalAnalysis(#[from] LexerError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Output generation failed: {message}")]
    Output { message: String },

    #[error("Pipeline error: {message}")]
    Pipeline { message: String },
}

impl PipelineError {
    pub fn pipeline_error(message: &str) -> Self {
        Self::Pipeline {
            message: message.to_string(),
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::FileProcessing(e) => e.error_code(),
            Self::LexicalAnalysis(e) => e.error_code(),
            Self::Serialization(e) => e.error_code(),
            Self::Configuration { .. } | Self::Pipeline { .. } => {
                codes::pipeline::PIPELINE_FAILURE
            }
            Self::Output { .. } => codes::pipeline::OUTPUT_FAILURE,
        }
    }
}
