//! Script file reading with compile-time limits and global logging integration

mod processor;

use crate::config::constants::compile_time::file_processing::{
    LARGE_FILE_THRESHOLD, MAX_FILE_SIZE, MAX_LINE_COUNT, SCRIPT_EXTENSION,
};
use crate::config::runtime::FileProcessorPreferences;
use crate::log_debug;
use crate::logging::codes;
pub use processor::{FileMetadata, FileProcessingResult, FileProcessor, FileProcessorError};

/// Process a file with default settings
pub fn process_file(file_path: &str) -> Result<FileProcessingResult, FileProcessorError> {
    FileProcessor::new().process_file(file_path)
}

pub fn create_processor() -> FileProcessor {
    FileProcessor::new()
}

pub fn create_processor_from_preferences(prefs: &FileProcessorPreferences) -> FileProcessor {
    FileProcessor::from_preferences(prefs)
}

/// True when `path` names a `.rascript` file, ignoring case
pub fn is_script_path(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION))
        .unwrap_or(false)
}

pub fn get_max_file_size() -> u64 {
    MAX_FILE_SIZE
}

pub fn get_large_file_threshold() -> u64 {
    LARGE_FILE_THRESHOLD
}

/// Initialize file processor logging and validate error codes
pub fn init_file_processor_logging() -> Result<(), String> {
    let test_codes = [
        codes::file_processing::FILE_NOT_FOUND,
        codes::file_processing::INVALID_EXTENSION,
        codes::file_processing::FILE_TOO_LARGE,
        codes::file_processing::EMPTY_FILE,
        codes::file_processing::PERMISSION_DENIED,
        codes::file_processing::INVALID_ENCODING,
        codes::file_processing::IO_ERROR,
        codes::file_processing::INVALID_PATH,
        codes::file_processing::TOO_MANY_LINES,
    ];

    for code in &test_codes {
        if codes::get_description(code.as_str()) == "Unknown error" {
            return Err(format!(
                "File processor error code {} has no description",
                code.as_str()
            ));
        }
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "File processor error code {} not found in metadata registry",
                code.as_str()
            ));
        }
    }

    log_debug!("File processor compile-time configuration loaded",
        "max_file_size" => MAX_FILE_SIZE,
        "large_file_threshold" => LARGE_FILE_THRESHOLD,
        "max_line_count" => MAX_LINE_COUNT,
        "extension" => SCRIPT_EXTENSION);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    #[test]
    fn test_module_api() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("set.rascript");
        fs::write(&file_path, "x = 1\n").unwrap();
        assert!(process_file(file_path.to_str().unwrap()).is_ok());
    }

    #[test]
    fn test_is_script_path() {
        assert!(is_script_path(Path::new("dir/game.rascript")));
        assert!(is_script_path(Path::new("GAME.RASCRIPT")));
        assert!(!is_script_path(Path::new("game.txt")));
        assert!(!is_script_path(Path::new("rascript")));
    }

    #[test]
    fn test_limits_are_consistent() {
        assert!(get_max_file_size() > 0);
        assert!(get_large_file_threshold() <= get_max_file_size());
    }

    #[test]
    fn test_init_logging() {
        let _ = crate::logging::init_global_logging();
        assert!(init_file_processor_logging().is_ok());
    }
}
