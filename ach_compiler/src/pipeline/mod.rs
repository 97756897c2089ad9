//! Compilation pipeline: file -> tokens -> expression groups -> evaluation
//! -> serialized achievements, leaderboards and rich presence

mod error;
pub mod output;
mod result;
mod validation;

pub use error::PipelineError;
pub use output::PipelineOutput;
pub use result::{CompiledObject, CompiledScript, Diagnostic, ObjectKind, PipelineResult};
pub use validation::validate_pipeline;

use crate::config::runtime::{RuntimeConfig, SerializationPreferences};
use crate::incremental::ExpressionGroupCollection;
use crate::logging;
use crate::requirements::{SerializationContext, SoftwareVersion};
use std::path::PathBuf;
use std::time::Instant;

/// Process a single file with preferences taken from the environment
pub fn process_file(file_path: &str) -> Result<PipelineResult, PipelineError> {
    process_file_with_config(file_path, &RuntimeConfig::default())
}

/// Process a single file with explicit runtime preferences
pub fn process_file_with_config(
    file_path: &str,
    config: &RuntimeConfig,
) -> Result<PipelineResult, PipelineError> {
    let start_time = Instant::now();

    logging::with_file_context(PathBuf::from(file_path), 0, || {
        crate::log_info!("Starting script compilation",
            "file" => file_path,
            "target_version" => config.serialization.target_version.as_str(),
            "address_width" => config.serialization.address_width
        );

        // Stage 1: file loading
        let processor =
            crate::file_processor::create_processor_from_preferences(&config.file_processor);
        let file_result = processor.process_file(file_path)?;

        // Stage 2: lexical analysis, which rejects malformed input up front
        let mut analyzer =
            crate::lexical::create_analyzer_with_preferences(config.lexical.clone());
        let tokens = analyzer.tokenize_file_result(&file_result)?;
        let lexical_metrics = analyzer.metrics().clone();

        // Stages 3-5: grouping, evaluation, serialization
        let script = compile_source(&file_result.source, config)?;

        let result = PipelineResult::new(
            file_result.metadata,
            lexical_metrics,
            tokens.len(),
            script,
            start_time.elapsed(),
        );
        result.log_success(file_path);
        Ok(result)
    })
}

/// Compile script text without touching the file system
pub fn compile_source(
    source: &str,
    config: &RuntimeConfig,
) -> Result<CompiledScript, PipelineError> {
    let context = serialization_context(&config.serialization)?;

    let mut collection = ExpressionGroupCollection::with_preferences(config.incremental.clone());
    collection.parse(source);
    let evaluation = collection.evaluate();

    let mut objects = Vec::new();
    for achievement in collection.achievements() {
        objects.push(CompiledObject {
            kind: ObjectKind::Achievement,
            id: achievement.id,
            title: achievement.title.clone(),
            description: achievement.description.clone(),
            points: Some(achievement.points),
            line: achievement.line,
            definition: achievement.serialize(&context)?,
            min_version: achievement.min_version().to_string(),
        });
    }
    for leaderboard in collection.leaderboards() {
        objects.push(CompiledObject {
            kind: ObjectKind::Leaderboard,
            id: leaderboard.id,
            title: leaderboard.title.clone(),
            description: leaderboard.description.clone(),
            points: None,
            line: leaderboard.line,
            definition: leaderboard.serialize(&context)?,
            min_version: leaderboard.min_version().to_string(),
        });
    }
    objects.sort_by_key(|o| o.line);

    let rich_presence = collection.rich_presence();
    let rich_presence = if rich_presence.is_empty() {
        None
    } else {
        Some(rich_presence.serialize(&context)?)
    };

    let diagnostics = collection.errors().into_iter().map(Into::into).collect();

    crate::log_debug!("Script compiled from source",
        "groups" => collection.groups().len(),
        "objects" => objects.len(),
        "has_rich_presence" => rich_presence.is_some()
    );

    Ok(CompiledScript {
        evaluation,
        group_count: collection.groups().len(),
        objects,
        rich_presence,
        diagnostics,
    })
}

/// Serialization context for the configured address width and target
fn serialization_context(
    preferences: &SerializationPreferences,
) -> Result<SerializationContext, PipelineError> {
    let target = preferences.target_version.trim();
    if !target.is_empty() {
        match SoftwareVersion::parse(target) {
            Some(version) if version.is_known() => {}
            _ => {
                return Err(PipelineError::Configuration {
                    message: format!("Unknown target runtime version '{}'", target),
                })
            }
        }
    }
    Ok(SerializationContext::from_preferences(preferences))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    const SCRIPT: &str = "\
// Demo set
function stage() => byte(0x10)

achievement(\"First\", \"Reach stage 2\", 5, stage() == 2)
leaderboard(\"Score\", \"Best\", byte(0x1) == 1, byte(0x1) == 2, byte(0x1) == 3, word(0x2))
rich_presence_display(\"Playing\")
";

    fn config_for(target_version: &str) -> RuntimeConfig {
        let mut config = RuntimeConfig::default();
        config.serialization.target_version = target_version.to_string();
        config.serialization.address_width = 6;
        config
    }

    #[test]
    fn test_validate_pipeline() {
        let _ = crate::logging::init_global_logging();
        assert!(validate_pipeline().is_ok());
    }

    #[test]
    fn test_compile_source_produces_all_objects() {
        let _ = crate::logging::init_global_logging();
        let script = compile_source(SCRIPT, &config_for("")).unwrap();
        assert!(!script.has_errors(), "{:?}", script.diagnostics);

        let achievement = script.achievements().next().unwrap();
        assert_eq!(achievement.title, "First");
        assert_eq!(achievement.points, Some(5));
        assert_eq!(achievement.line, 4);
        assert_eq!(achievement.definition, "0xH000010=2");

        let leaderboard = script.leaderboards().next().unwrap();
        assert!(leaderboard.definition.starts_with("STA:0xH000001=1::CAN:0xH000001=2::SUB:"));
        assert!(leaderboard.definition.contains("::VAL:"));

        let rich_presence = script.rich_presence.unwrap();
        assert!(rich_presence.contains("Display:\nPlaying"));
    }

    #[test]
    fn test_diagnostics_do_not_abort_compilation() {
        let _ = crate::logging::init_global_logging();
        let source = "a = unknown_thing + 1\nachievement(\"T\", \"D\", 1, byte(0x20) == 3)\n";
        let script = compile_source(source, &config_for("")).unwrap();
        assert_eq!(script.diagnostics.len(), 1);
        assert_eq!(script.diagnostics[0].line, 1);
        assert_eq!(script.diagnostics[0].code, "E061");
        assert_eq!(script.objects.len(), 1);
    }

    #[test]
    fn test_unknown_target_version_is_configuration_error() {
        let result = compile_source(SCRIPT, &config_for("9.9"));
        assert_matches!(result, Err(PipelineError::Configuration { .. }));
    }

    #[test]
    fn test_old_target_rejects_newer_constructs() {
        let _ = crate::logging::init_global_logging();
        let source = "achievement(\"T\", \"D\", 1, float(0x20) == 3)\n";
        let result = compile_source(source, &config_for("0.30"));
        assert_matches!(result, Err(PipelineError::Serialization(_)));
    }

    #[test]
    fn test_process_file_end_to_end() {
        let _ = crate::logging::init_global_logging();
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.rascript");
        fs::write(&path, SCRIPT).unwrap();

        let result = process_file_with_config(path.to_str().unwrap(), &config_for("")).unwrap();
        assert_eq!(result.file_metadata.line_count, 6);
        assert!(result.token_count > 0);
        assert_eq!(result.lexical_metrics.comment_count, 1);
        assert_eq!(result.script.objects.len(), 2);

        let json = PipelineOutput::new(&result).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["objects"][0]["kind"], "achievement");
        assert_eq!(value["objects"][0]["definition"], "0xH000010=2");
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn test_lexer_failure_is_pipeline_error() {
        let _ = crate::logging::init_global_logging();
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.rascript");
        fs::write(&path, "a = \"unterminated\n").unwrap();

        let result = process_file_with_config(path.to_str().unwrap(), &config_for(""));
        assert_matches!(result, Err(PipelineError::LexicalAnalysis(_)));
    }

    #[test]
    fn test_pipeline_error_codes() {
        let error = PipelineError::pipeline_error("Test error");
        assert_eq!(error.error_code().as_str(), "E140");
        let error = PipelineError::Output {
            message: "x".into(),
        };
        assert_eq!(error.error_code().as_str(), "E142");
    }
}
