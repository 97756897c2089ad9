/// Validate that every stage is registered with the logging system
pub fn validate_pipeline() -> Result<(), String> {
    crate::log_debug!("Validating compiler pipeline configuration");

    crate::file_processor::init_file_processor_logging()?;
    crate::lexical::init_lexical_analysis_logging()?;
    crate::syntax::init_syntax_logging()?;
    crate::interpreter::init_interpreter_logging()?;
    crate::normalization::init_normalization_logging()?;
    crate::requirements::init_requirements_logging()?;
    crate::incremental::init_incremental_logging()?;

    for code in [
        crate::logging::codes::pipeline::PIPELINE_FAILURE,
        crate::logging::codes::pipeline::BATCH_FAILURE,
        crate::logging::codes::pipeline::OUTPUT_FAILURE,
    ] {
        if crate::logging::codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!("Pipeline error code {} not registered", code.as_str()));
        }
    }

    crate::log_success!(
        crate::logging::codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Compiler pipeline validation succeeded",
        "stages_validated" => 7
    );

    Ok(())
}
