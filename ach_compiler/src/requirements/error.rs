//! Requirement codec errors
use super::version::SoftwareVersion;
use crate::logging::{codes, Code};

pub type SerializationResult<T> = Result<T, SerializationError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SerializationError {
    #[error("Invalid requirement text at offset {position}: {message}")]
    InvalidFormat { message: String, position: usize },

    #[error("Requires runtime version {required}, but {target} was targeted")]
    UnsupportedVersion {
        required: SoftwareVersion,
        target: SoftwareVersion,
    },

    #[error("Invalid address '{text}'")]
    InvalidAddress { text: String },

    #[error("Invalid field '{text}'")]
    InvalidField { text: String },

    #[error("Group {group} ends with a combining requirement")]
    MissingTerminal { group: usize },
}

impl SerializationError {
    pub fn invalid_format(message: &str, position: usize) -> Self {
        Self::InvalidFormat {
            message: message.to_string(),
            position,
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::InvalidFormat { .. } => codes::serialization::INVALID_FORMAT,
            Self::UnsupportedVersion { .. } => codes::serialization::UNSUPPORTED_VERSION,
            Self::InvalidAddress { .. } => codes::serialization::INVALID_ADDRESS,
            Self::InvalidField { .. } => codes::serialization::INVALID_FIELD,
            Self::MissingTerminal { .. } => codes::serialization::MISSING_TERMINAL,
        }
    }
}
