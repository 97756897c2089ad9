use super::{CompiledObject, Diagnostic, PipelineError, PipelineResult};
use crate::incremental::EvaluationSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// JSON document written for one compiled file
#[derive(Debug, Serialize)]
pub struct PipelineOutput {
    pub file: String,
    pub generated_at: DateTime<Utc>,
    pub compiler_version: &'static str,
    pub evaluation: EvaluationSummary,
    pub objects: Vec<CompiledObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rich_presence: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub duration_ms: f64,
}

impl PipelineOutput {
    pub fn new(result: &PipelineResult) -> Self {
        Self {
            file: result.file_metadata.path.display().to_string(),
            generated_at: Utc::now(),
            compiler_version: env!("CARGO_PKG_VERSION"),
            evaluation: result.script.evaluation.clone(),
            objects: result.script.objects.clone(),
            rich_presence: result.script.rich_presence.clone(),
            diagnostics: result.script.diagnostics.clone(),
            duration_ms: result.processing_duration.as_secs_f64() * 1000.0,
        }
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        serde_json::to_string_pretty(self).map_err(|e| PipelineError::Output {
            message: e.to_string(),
        })
    }
}
