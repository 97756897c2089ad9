//! Requirement model and its versioned text codec
//!
//! Fields and requirements are plain `Copy` values. Groups, triggers and
//! values own their requirements and are what the normalization stage
//! produces and the serializer writes.

pub mod deserializer;
pub mod error;
pub mod field;
pub mod group;
pub mod render;
pub mod requirement;
pub mod serializer;
pub mod version;

pub use deserializer::{
    parse_field, parse_leaderboard, parse_requirement, parse_trigger, parse_value,
};
pub use error::{SerializationError, SerializationResult};
pub use field::{Field, FieldSize, FieldType};
pub use group::{RequirementEx, RequirementGroup, Trigger, Value};
pub use render::{render_chain, render_field, render_trigger, render_value};
pub use requirement::{Requirement, RequirementOperator, RequirementType};
pub use serializer::{
    serialize_leaderboard, serialize_trigger, serialize_value, SerializationContext,
};
pub use version::SoftwareVersion;

/// Validate that serialization error codes are registered
pub fn init_requirements_logging() -> Result<(), String> {
    let test_codes = [
        crate::logging::codes::serialization::INVALID_FORMAT,
        crate::logging::codes::serialization::UNSUPPORTED_VERSION,
        crate::logging::codes::serialization::INVALID_ADDRESS,
        crate::logging::codes::serialization::INVALID_FIELD,
        crate::logging::codes::serialization::MISSING_TERMINAL,
    ];

    for code in &test_codes {
        if crate::logging::codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "Serialization error code {} not found in metadata registry",
                code.as_str()
            ));
        }
    }

    crate::log_debug!("Requirement codec initialized",
        "known_versions" => SoftwareVersion::KNOWN.len(),
        "memory_sizes" => FieldSize::ALL_MEMORY.len(),
        "flags" => RequirementType::ALL.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging() {
        let _ = crate::logging::init_global_logging();
        assert!(init_requirements_logging().is_ok());
    }
}
