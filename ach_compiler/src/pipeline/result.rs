use crate::file_processor::FileMetadata;
use crate::incremental::EvaluationSummary;
use crate::interpreter::{ErrorExpression, ErrorKind};
use crate::lexical::LexicalMetrics;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Achievement,
    Leaderboard,
}

/// One achievement or leaderboard with its serialized definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledObject {
    pub kind: ObjectKind,
    pub id: u32,
    pub title: String,
    pub description: String,
    /// Achievements only
    pub points: Option<u32>,
    pub line: u32,
    pub definition: String,
    /// Oldest runtime able to load the definition
    pub min_version: String,
}

/// A script diagnostic detached from the evaluation state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub kind: ErrorKind,
    pub line: u32,
    pub column: u32,
    pub message: String,
    /// Full cause chain, one link per line
    pub detail: String,
}

impl From<&ErrorExpression> for Diagnostic {
    fn from(error: &ErrorExpression) -> Self {
        Self {
            code: error.error_code().as_str(),
            kind: error.kind,
            line: error.span.start.line,
            column: error.span.start.column,
            message: error.message.clone(),
            detail: error.format_detailed(),
        }
    }
}

/// Everything compiled from one script
#[derive(Debug, Clone)]
pub struct CompiledScript {
    pub evaluation: EvaluationSummary,
    pub group_count: usize,
    pub objects: Vec<CompiledObject>,
    /// Rich presence script, when the script declares displays
    pub rich_presence: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledScript {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn achievements(&self) -> impl Iterator<Item = &CompiledObject> {
        self.objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Achievement)
    }

    pub fn leaderboards(&self) -> impl Iterator<Item = &CompiledObject> {
        self.objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Leaderboard)
    }
}

/// Complete pipeline result for one file
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub file_metadata: FileMetadata,
    pub lexical_metrics: LexicalMetrics,
    pub token_count: usize,
    pub script: CompiledScript,
    pub processing_duration: Duration,
}

impl PipelineResult {
    pub fn new(
        file_metadata: FileMetadata,
        lexical_metrics: LexicalMetrics,
        token_count: usize,
        script: CompiledScript,
        processing_duration: Duration,
    ) -> Self {
        Self {
            file_metadata,
            lexical_metrics,
            token_count,
            script,
            processing_duration,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.script.has_errors()
    }

    pub fn log_success(&self, file_path: &str) {
        let seconds = self.processing_duration.as_secs_f64();
        let rate = if seconds > 0.0 {
            format!("{:.0}", self.file_metadata.size as f64 / seconds)
        } else {
            "n/a".to_string()
        };
        crate::log_performance!(
            crate::logging::codes::success::PIPELINE_COMPLETE,
            "Script compiled",
            duration = self.processing_duration,
            "file" => file_path,
            "bytes_per_sec" => rate,
            "tokens" => self.token_count,
            "objects" => self.script.objects.len(),
            "diagnostics" => self.script.diagnostics.len()
        );
    }
}
