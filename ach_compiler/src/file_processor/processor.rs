//! Script file reader with compile-time limits and global logging integration

use crate::config::constants::compile_time::file_processing::{
    LARGE_FILE_THRESHOLD, MAX_FILE_SIZE, MAX_LINE_COUNT, SCRIPT_EXTENSION,
};
use crate::config::runtime::FileProcessorPreferences;
use crate::logging::codes;
use crate::{log_debug, log_error, log_success};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, thiserror::Error)]
pub enum FileProcessorError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file extension: expected .rascript, found {extension:?}")]
    InvalidExtension { extension: Option<String> },

    #[error("File too large: {size} bytes (max: {max_size})")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("File is empty")]
    EmptyFile,

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Invalid UTF-8 encoding in file: {path}")]
    InvalidEncoding { path: String },

    #[error("I/O error reading file: {message}")]
    IoError { message: String },

    #[error("Invalid file path: {path}")]
    InvalidPath { path: String },

    #[error("File exceeds maximum line count: {lines} (max: {max_lines})")]
    TooManyLines { lines: usize, max_lines: usize },
}

impl FileProcessorError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            FileProcessorError::FileNotFound { .. } => codes::file_processing::FILE_NOT_FOUND,
            FileProcessorError::InvalidExtension { .. } => {
                codes::file_processing::INVALID_EXTENSION
            }
            FileProcessorError::FileTooLarge { .. } => codes::file_processing::FILE_TOO_LARGE,
            FileProcessorError::EmptyFile => codes::file_processing::EMPTY_FILE,
            FileProcessorError::PermissionDenied { .. } => {
                codes::file_processing::PERMISSION_DENIED
            }
            FileProcessorError::InvalidEncoding { .. } => codes::file_processing::INVALID_ENCODING,
            FileProcessorError::IoError { .. } => codes::file_processing::IO_ERROR,
            FileProcessorError::InvalidPath { .. } => codes::file_processing::INVALID_PATH,
            FileProcessorError::TooManyLines { .. } => codes::file_processing::TOO_MANY_LINES,
        }
    }

    pub fn requires_halt(&self) -> bool {
        codes::requires_halt(self.error_code().as_str())
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.error_code().as_str()).as_str()
    }

    pub fn category(&self) -> &'static str {
        codes::get_category(self.error_code().as_str())
    }

    pub fn is_recoverable(&self) -> bool {
        codes::is_recoverable(self.error_code().as_str())
    }
}

/// What the processor learned about a script before and after reading it
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Canonical file path
    pub path: PathBuf,
    pub size: u64,
    /// Lowercased extension, if any
    pub extension: Option<String>,
    pub line_count: usize,
    pub is_script_file: bool,
    pub modified: Option<std::time::SystemTime>,
}

impl FileMetadata {
    pub fn human_readable_size(&self) -> String {
        human_readable(self.size)
    }

    pub fn is_large_file(&self) -> bool {
        self.size > LARGE_FILE_THRESHOLD
    }

    /// File name without directories, for summaries
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

fn human_readable(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut scaled = size as f64;
    let mut unit_index = 0;

    while scaled >= 1024.0 && unit_index < UNITS.len() - 1 {
        scaled /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size, UNITS[0])
    } else {
        format!("{:.2} {}", scaled, UNITS[unit_index])
    }
}

/// Script source and metadata
#[derive(Debug, Clone)]
pub struct FileProcessingResult {
    pub source: String,
    pub metadata: FileMetadata,
    pub processing_duration: std::time::Duration,
}

impl FileProcessingResult {
    pub fn char_count(&self) -> usize {
        self.source.chars().count()
    }

    pub fn is_effectively_empty(&self) -> bool {
        self.source.trim().is_empty()
    }

    /// Characters per millisecond
    pub fn processing_rate(&self) -> f64 {
        let duration_ms = self.processing_duration.as_secs_f64() * 1000.0;
        if duration_ms > 0.0 {
            self.char_count() as f64 / duration_ms
        } else {
            0.0
        }
    }
}

/// File processor with compile-time limits and runtime preferences
#[derive(Debug, Clone)]
pub struct FileProcessor {
    pub require_script_extension: bool,
    pub enable_performance_logging: bool,
    pub log_non_script_processing: bool,
}

impl FileProcessor {
    pub fn new() -> Self {
        Self {
            require_script_extension: false,
            enable_performance_logging: true,
            log_non_script_processing: true,
        }
    }

    pub fn from_preferences(prefs: &FileProcessorPreferences) -> Self {
        Self {
            require_script_extension: prefs.require_script_extension,
            enable_performance_logging: prefs.enable_performance_logging,
            log_non_script_processing: prefs.log_non_script_processing,
        }
    }

    pub fn with_script_extension_required(mut self, required: bool) -> Self {
        self.require_script_extension = required;
        self
    }

    pub fn with_performance_logging(mut self, enabled: bool) -> Self {
        self.enable_performance_logging = enabled;
        self
    }

    pub fn with_non_script_logging(mut self, enabled: bool) -> Self {
        self.log_non_script_processing = enabled;
        self
    }

    /// Read a script and collect its metadata
    pub fn process_file(
        &self,
        file_path: &str,
    ) -> Result<FileProcessingResult, FileProcessorError> {
        let start_time = std::time::Instant::now();
        log_debug!("Reading script", "file" => file_path);

        let path = resolve(file_path).map_err(|e| report(e, file_path))?;
        let mut metadata = inspect(&path).map_err(|e| report(e, file_path))?;
        self.check_limits(&metadata).map_err(|e| report(e, file_path))?;

        let source =
            fs::read_to_string(&path).map_err(|e| report(io_failure(&path, e), file_path))?;
        metadata.line_count = source.lines().count();
        if metadata.line_count > MAX_LINE_COUNT {
            return Err(report(
                FileProcessorError::TooManyLines {
                    lines: metadata.line_count,
                    max_lines: MAX_LINE_COUNT,
                },
                file_path,
            ));
        }

        let result = FileProcessingResult {
            source,
            metadata,
            processing_duration: start_time.elapsed(),
        };
        self.log_read(&result, file_path);
        Ok(result)
    }

    fn check_limits(&self, metadata: &FileMetadata) -> Result<(), FileProcessorError> {
        if metadata.size > MAX_FILE_SIZE {
            return Err(FileProcessorError::FileTooLarge {
                size: metadata.size,
                max_size: MAX_FILE_SIZE,
            });
        }
        if metadata.size == 0 {
            return Err(FileProcessorError::EmptyFile);
        }
        if self.require_script_extension && !metadata.is_script_file {
            return Err(FileProcessorError::InvalidExtension {
                extension: metadata.extension.clone(),
            });
        }
        Ok(())
    }

    fn log_read(&self, result: &FileProcessingResult, file_path: &str) {
        let metadata = &result.metadata;
        if self.enable_performance_logging {
            crate::log_performance!(
                codes::success::FILE_PROCESSING_SUCCESS,
                "Script read",
                duration = result.processing_duration,
                "file" => file_path,
                "size" => metadata.human_readable_size(),
                "lines" => metadata.line_count,
                "chars_per_ms" => format!("{:.1}", result.processing_rate()),
                "large" => metadata.is_large_file()
            );
        } else {
            log_success!(codes::success::FILE_PROCESSING_SUCCESS, "Script read",
                "file" => file_path,
                "lines" => metadata.line_count
            );
        }

        if !metadata.is_script_file && self.log_non_script_processing {
            log_debug!("Script read from a file without the script extension",
                "file" => file_path,
                "extension" => metadata.extension.as_deref().unwrap_or("none")
            );
        }
    }
}

/// Log a failure against the script it happened for and hand it back
fn report(error: FileProcessorError, file_path: &str) -> FileProcessorError {
    log_error!(error.error_code(), &error.to_string(), "file" => file_path);
    error
}

fn resolve(file_path: &str) -> Result<PathBuf, FileProcessorError> {
    let path = Path::new(file_path);
    if file_path.is_empty() || (path.exists() && !path.is_file()) {
        return Err(FileProcessorError::InvalidPath {
            path: file_path.to_string(),
        });
    }
    if !path.exists() {
        return Err(FileProcessorError::FileNotFound {
            path: file_path.to_string(),
        });
    }
    path.canonicalize().map_err(|e| io_failure(path, e))
}

fn inspect(path: &Path) -> Result<FileMetadata, FileProcessorError> {
    let metadata = fs::metadata(path).map_err(|e| io_failure(path, e))?;
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase());

    Ok(FileMetadata {
        path: path.to_path_buf(),
        size: metadata.len(),
        is_script_file: extension.as_deref() == Some(SCRIPT_EXTENSION),
        extension,
        line_count: 0,
        modified: metadata.modified().ok(),
    })
}

fn io_failure(path: &Path, error: std::io::Error) -> FileProcessorError {
    let path = path.display().to_string();
    match error.kind() {
        std::io::ErrorKind::PermissionDenied => FileProcessorError::PermissionDenied { path },
        std::io::ErrorKind::InvalidData => FileProcessorError::InvalidEncoding { path },
        _ => FileProcessorError::IoError {
            message: format!("{}: {}", path, error),
        },
    }
}

impl Default for FileProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    const SCRIPT: &str = "// Sample\nachievement(\"T\", \"D\", 5, byte(0x1234) == 6)\n";

    #[test]
    fn test_process_valid_script() {
        let _ = crate::logging::init_global_logging();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("game.rascript");
        fs::write(&file_path, SCRIPT).unwrap();

        let result = FileProcessor::new()
            .process_file(file_path.to_str().unwrap())
            .unwrap();
        assert_eq!(result.metadata.line_count, 2);
        assert!(result.metadata.is_script_file);
        assert_eq!(result.metadata.display_name(), "game.rascript");
        assert_eq!(result.char_count(), SCRIPT.chars().count());
        assert!(!result.is_effectively_empty());
    }

    #[test]
    fn test_file_not_found() {
        let result = FileProcessor::new().process_file("missing.rascript");
        assert_matches!(result, Err(FileProcessorError::FileNotFound { .. }));
    }

    #[test]
    fn test_extension_requirement() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("game.txt");
        fs::write(&file_path, SCRIPT).unwrap();

        let strict = FileProcessor::new().with_script_extension_required(true);
        assert_matches!(
            strict.process_file(file_path.to_str().unwrap()),
            Err(FileProcessorError::InvalidExtension { extension: Some(ref ext) }) if ext == "txt"
        );

        let lenient = FileProcessor::new();
        let result = lenient.process_file(file_path.to_str().unwrap()).unwrap();
        assert!(!result.metadata.is_script_file);
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("GAME.RAScript");
        fs::write(&file_path, SCRIPT).unwrap();

        let processor = FileProcessor::new().with_script_extension_required(true);
        let result = processor.process_file(file_path.to_str().unwrap()).unwrap();
        assert!(result.metadata.is_script_file);
    }

    #[test]
    fn test_empty_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("empty.rascript");
        fs::write(&file_path, "").unwrap();

        let result = FileProcessor::new().process_file(file_path.to_str().unwrap());
        assert_matches!(result, Err(FileProcessorError::EmptyFile));
    }

    #[test]
    fn test_directory_is_invalid_path() {
        let dir = tempdir().unwrap();
        let result = FileProcessor::new().process_file(dir.path().to_str().unwrap());
        assert_matches!(result, Err(FileProcessorError::InvalidPath { .. }));
    }

    #[test]
    fn test_too_many_lines() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("long.rascript");
        fs::write(&file_path, "\n".repeat(MAX_LINE_COUNT + 1)).unwrap();

        let result = FileProcessor::new().process_file(file_path.to_str().unwrap());
        assert_matches!(
            result,
            Err(FileProcessorError::TooManyLines { lines, max_lines })
                if lines > MAX_LINE_COUNT && max_lines == MAX_LINE_COUNT
        );
    }

    #[test]
    fn test_large_file_flag() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("large.rascript");
        let content = format!("//{}\n", "x".repeat(LARGE_FILE_THRESHOLD as usize));
        fs::write(&file_path, &content).unwrap();

        let result = FileProcessor::new()
            .process_file(file_path.to_str().unwrap())
            .unwrap();
        assert!(result.metadata.is_large_file());
        assert!(result.metadata.human_readable_size().ends_with("MB"));
    }

    #[test]
    fn test_error_methods() {
        let error = FileProcessorError::FileNotFound {
            path: "game.rascript".to_string(),
        };
        assert_eq!(error.error_code().as_str(), "E005");
        assert_eq!(error.category(), "FileProcessing");
        // A missing script fails that script only; the batch keeps going
        assert!(!error.requires_halt());

        let lines = FileProcessorError::TooManyLines {
            lines: 10,
            max_lines: 5,
        };
        assert_eq!(lines.error_code().as_str(), "E013");
    }

    #[test]
    fn test_from_preferences() {
        let prefs = FileProcessorPreferences {
            require_script_extension: true,
            enable_performance_logging: false,
            log_non_script_processing: false,
        };

        let processor = FileProcessor::from_preferences(&prefs);
        assert!(processor.require_script_extension);
        assert!(!processor.enable_performance_logging);
        assert!(!processor.log_non_script_processing);
    }
}
