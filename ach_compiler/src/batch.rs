//! Batch compilation of script directories
//!
//! Provides directory-based batch processing with sequential and parallel execution modes.
//! Integrates with the global logging system and error collector for cargo-style output.

use crate::config::constants::compile_time::batch_processing::{
    MAX_FILES_PER_BATCH, MAX_WORKER_THREADS,
};
use crate::config::constants::compile_time::file_processing::MAX_FILE_SIZE;
use crate::config::runtime::RuntimeConfig;
use crate::logging::{self, codes};
use crate::pipeline::{self, PipelineError, PipelineResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// BATCH PROCESSING TYPES
// ============================================================================

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_threads: usize,
    pub recursive: bool,
    pub max_files: Option<usize>,
    pub progress_reporting: bool,
    /// Stop after the first file that fails or reports diagnostics
    pub fail_fast: bool,
    /// Preferences handed to every pipeline run
    pub runtime: RuntimeConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_threads: thread::available_parallelism()
                .map(|n| n.get().min(8))
                .unwrap_or(4),
            recursive: true,
            max_files: None,
            progress_reporting: true,
            fail_fast: false,
            runtime: RuntimeConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Thread count clamped to the compile-time worker ceiling
    pub fn effective_threads(&self) -> usize {
        self.max_threads.clamp(1, MAX_WORKER_THREADS)
    }

    fn file_limit(&self) -> usize {
        self.max_files
            .map(|limit| limit.min(MAX_FILES_PER_BATCH))
            .unwrap_or(MAX_FILES_PER_BATCH)
    }
}

#[derive(Debug, Default)]
pub struct BatchResults {
    pub successful_files: Vec<(PathBuf, PipelineResult)>,
    pub failed_files: Vec<(PathBuf, PipelineError)>,
    pub processing_duration: Duration,
    pub files_processed: usize,
    pub files_discovered: usize,
}

impl BatchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_count(&self) -> usize {
        self.successful_files.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed_files.len()
    }

    /// Files that compiled but reported script diagnostics
    pub fn diagnostic_file_count(&self) -> usize {
        self.successful_files
            .iter()
            .filter(|(_, result)| result.has_errors())
            .count()
    }

    pub fn has_problems(&self) -> bool {
        self.failure_count() > 0 || self.diagnostic_file_count() > 0
    }

    pub fn object_count(&self) -> usize {
        self.successful_files
            .iter()
            .map(|(_, result)| result.script.objects.len())
            .sum()
    }

    pub fn success_rate(&self) -> f64 {
        if self.files_processed == 0 {
            0.0
        } else {
            self.successful_files.len() as f64 / self.files_processed as f64
        }
    }

    pub fn add_success(&mut self, file_path: PathBuf, result: PipelineResult) {
        self.successful_files.push((file_path, result));
        self.files_processed += 1;
    }

    pub fn add_failure(&mut self, file_path: PathBuf, error: PipelineError) {
        self.failed_files.push((file_path, error));
        self.files_processed += 1;
    }

    pub fn merge(&mut self, other: BatchResults) {
        self.successful_files.extend(other.successful_files);
        self.failed_files.extend(other.failed_files);
        self.files_processed += other.files_processed;
    }

    /// Restore discovery order after parallel chunks finish out of order
    fn sort(&mut self) {
        self.successful_files.sort_by(|a, b| a.0.cmp(&b.0));
        self.failed_files.sort_by(|a, b| a.0.cmp(&b.0));
    }

    pub fn summary(&self) -> String {
        format!(
            "Batch compilation completed: {} files processed, {} compiled ({:.1}%), {} with diagnostics, {} failed, {} objects, {:.2}s total",
            self.files_processed,
            self.success_count(),
            self.success_rate() * 100.0,
            self.diagnostic_file_count(),
            self.failure_count(),
            self.object_count(),
            self.processing_duration.as_secs_f64()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("No .rascript files found in directory: {path}")]
    NoFilesFound { path: String },

    #[error("IO error during directory traversal: {error}")]
    IoError { error: String },

    #[error("Thread pool error: {message}")]
    ThreadError { message: String },
}

impl BatchError {
    pub fn error_code(&self) -> logging::Code {
        match self {
            BatchError::DirectoryNotFound { .. } => codes::file_processing::FILE_NOT_FOUND,
            BatchError::IoError { .. } => codes::file_processing::IO_ERROR,
            BatchError::NoFilesFound { .. } | BatchError::ThreadError { .. } => {
                codes::pipeline::BATCH_FAILURE
            }
        }
    }
}

// ============================================================================
// FILE DISCOVERY
// ============================================================================

/// Discover `.rascript` files in a directory, sorted by path
pub fn discover_script_files(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<Vec<PathBuf>, BatchError> {
    crate::log_info!("Starting file discovery",
        "directory" => dir_path.display(),
        "recursive" => config.recursive
    );

    if !dir_path.is_dir() {
        return Err(BatchError::DirectoryNotFound {
            path: dir_path.display().to_string(),
        });
    }

    let mut files = Vec::new();
    visit_directory(dir_path, &mut files, config)?;

    if files.is_empty() {
        return Err(BatchError::NoFilesFound {
            path: dir_path.display().to_string(),
        });
    }

    files.sort();

    crate::log_success!(
        codes::success::FILE_VALIDATION_PASSED,
        "File discovery completed",
        "files_found" => files.len(),
        "directory" => dir_path.display()
    );

    Ok(files)
}

/// Returns `false` once the file limit is reached
fn visit_directory(
    dir_path: &Path,
    files: &mut Vec<PathBuf>,
    config: &BatchConfig,
) -> Result<bool, BatchError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir_path)
        .map_err(|e| BatchError::IoError {
            error: e.to_string(),
        })?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .map_err(|e| BatchError::IoError {
            error: e.to_string(),
        })?;
    entries.sort();

    let limit = config.file_limit();
    for path in entries {
        if path.is_dir() {
            if config.recursive && !visit_directory(&path, files, config)? {
                return Ok(false);
            }
        } else if is_script_file(&path) {
            files.push(path);
            if files.len() >= limit {
                crate::log_warning!(
                    "Reached maximum file limit",
                    "files_found" => files.len(),
                    "limit" => limit
                );
                return Ok(false);
            }
        }
    }

    Ok(true)
}

fn is_script_file(path: &Path) -> bool {
    path.is_file() && crate::file_processor::is_script_path(path)
}

/// Split discovered files into loadable ones and rejects with a reason
fn validate_files(files: &[PathBuf]) -> (Vec<PathBuf>, Vec<(PathBuf, String)>) {
    let mut valid_files = Vec::new();
    let mut invalid_files = Vec::new();

    for file in files {
        match validate_single_file(file) {
            Ok(()) => valid_files.push(file.clone()),
            Err(reason) => invalid_files.push((file.clone(), reason)),
        }
    }

    if !invalid_files.is_empty() {
        crate::log_warning!(
            "Some files failed validation",
            "valid_files" => valid_files.len(),
            "invalid_files" => invalid_files.len()
        );
    }

    (valid_files, invalid_files)
}

fn validate_single_file(file_path: &Path) -> Result<(), String> {
    if !file_path.is_file() {
        return Err("Path is not a file".to_string());
    }

    let metadata =
        fs::metadata(file_path).map_err(|e| format!("Cannot read file metadata: {}", e))?;
    if metadata.len() > MAX_FILE_SIZE {
        return Err(format!(
            "File too large: {} bytes (max: {} bytes)",
            metadata.len(),
            MAX_FILE_SIZE
        ));
    }

    Ok(())
}

/// Discover and validate, logging every rejected file
fn prepare_files(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<(Vec<PathBuf>, usize), BatchError> {
    let discovered_files = discover_script_files(dir_path, config)?;
    let (valid_files, invalid_files) = validate_files(&discovered_files);

    for (file_path, reason) in &invalid_files {
        crate::log_error!(
            codes::file_processing::INVALID_PATH,
            "File validation failed",
            "file" => file_path.display(),
            "reason" => reason
        );
    }

    Ok((valid_files, discovered_files.len()))
}

fn compile_one(
    file_path: &Path,
    file_id: usize,
    runtime: &RuntimeConfig,
) -> Result<PipelineResult, PipelineError> {
    logging::with_file_context(file_path.to_path_buf(), file_id, || {
        let result =
            pipeline::process_file_with_config(&file_path.to_string_lossy(), runtime);
        if let Err(error) = &result {
            crate::log_error!(
                error.error_code(),
                "File compilation failed",
                "file" => file_path.display(),
                "file_id" => file_id,
                "error" => error
            );
        }
        result
    })
}

// ============================================================================
// BATCH PROCESSING
// ============================================================================

/// Compile a directory of scripts on the calling thread
pub fn process_directory_sequential(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let start_time = Instant::now();

    crate::log_info!("Starting sequential batch processing",
        "directory" => dir_path.display()
    );

    let (valid_files, discovered) = prepare_files(dir_path, config)?;
    let mut results = BatchResults::new();
    results.files_discovered = discovered;

    for (file_id, file_path) in valid_files.iter().enumerate() {
        if config.progress_reporting {
            println!(
                "Compiling file {} of {}: {}",
                file_id + 1,
                valid_files.len(),
                file_path.display()
            );
        }

        match compile_one(file_path, file_id, &config.runtime) {
            Ok(result) => results.add_success(file_path.clone(), result),
            Err(error) => results.add_failure(file_path.clone(), error),
        }

        if config.fail_fast && results.has_problems() {
            crate::log_warning!("Fail-fast mode enabled, stopping batch processing");
            break;
        }
    }

    results.processing_duration = start_time.elapsed();
    log_batch_complete(&results, 1);
    Ok(results)
}

/// Compile a directory of scripts on worker threads
pub fn process_directory_parallel(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let start_time = Instant::now();
    let threads = config.effective_threads();

    crate::log_info!("Starting parallel batch processing",
        "directory" => dir_path.display(),
        "max_threads" => threads
    );

    let (valid_files, discovered) = prepare_files(dir_path, config)?;
    let mut results = BatchResults::new();
    results.files_discovered = discovered;

    let chunk_size = calculate_chunk_size(valid_files.len(), threads);

    crate::log_debug!("Parallel processing configuration",
        "total_files" => valid_files.len(),
        "chunk_size" => chunk_size,
        "threads" => threads
    );

    for (chunk_index, chunk) in valid_files.chunks(chunk_size).enumerate() {
        let chunk_results =
            process_chunk_parallel(chunk, chunk_index * chunk_size, threads, config)?;
        results.merge(chunk_results);

        if config.fail_fast && results.has_problems() {
            crate::log_warning!("Fail-fast mode enabled, stopping batch processing");
            break;
        }
    }

    results.sort();
    results.processing_duration = start_time.elapsed();
    log_batch_complete(&results, threads);
    Ok(results)
}

fn process_chunk_parallel(
    files: &[PathBuf],
    first_file_id: usize,
    threads: usize,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let results = Arc::new(Mutex::new(BatchResults::new()));
    let files_per_thread = files.len().div_ceil(threads).max(1);

    let mut handles = Vec::new();
    for (thread_index, thread_files) in files.chunks(files_per_thread).enumerate() {
        let thread_files = thread_files.to_vec();
        let results_clone = Arc::clone(&results);
        let runtime = config.runtime.clone();
        let base_id = first_file_id + thread_index * files_per_thread;

        handles.push(thread::spawn(move || {
            for (offset, file_path) in thread_files.into_iter().enumerate() {
                let outcome = compile_one(&file_path, base_id + offset, &runtime);
                let mut guard = results_clone
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                match outcome {
                    Ok(result) => guard.add_success(file_path, result),
                    Err(error) => guard.add_failure(file_path, error),
                }
            }
        }));
    }

    for handle in handles {
        handle.join().map_err(|_| BatchError::ThreadError {
            message: "Worker thread panicked during compilation".to_string(),
        })?;
    }

    let mutex = Arc::try_unwrap(results).map_err(|_| BatchError::ThreadError {
        message: "Failed to extract results from worker threads".to_string(),
    })?;
    Ok(mutex
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner()))
}

/// Files handed to one round of workers
fn calculate_chunk_size(file_count: usize, threads: usize) -> usize {
    const MIN_CHUNK_SIZE: usize = 1;
    const MAX_CHUNK_SIZE: usize = 50;

    file_count
        .div_ceil(threads.max(1))
        .clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
}

fn log_batch_complete(results: &BatchResults, threads: usize) {
    crate::log_performance!(
        codes::success::BATCH_COMPLETE,
        "Batch compilation completed",
        duration = results.processing_duration,
        "files_processed" => results.files_processed,
        "successful" => results.success_count(),
        "with_diagnostics" => results.diagnostic_file_count(),
        "failed" => results.failure_count(),
        "threads_used" => threads
    );
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Process a directory with default configuration
pub fn process_directory(dir_path: &Path) -> Result<BatchResults, BatchError> {
    process_directory_with_config(dir_path, &BatchConfig::default())
}

/// Process a directory, choosing sequential mode for a single thread
pub fn process_directory_with_config(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    if config.effective_threads() == 1 {
        process_directory_sequential(dir_path, config)
    } else {
        process_directory_parallel(dir_path, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    fn quiet_config(threads: usize) -> BatchConfig {
        let mut config = BatchConfig {
            max_threads: threads,
            progress_reporting: false,
            ..BatchConfig::default()
        };
        config.runtime.serialization.target_version = String::new();
        config
    }

    fn write_set(dir: &Path) {
        fs::write(
            dir.join("a.rascript"),
            "achievement(\"A\", \"D\", 1, byte(0x10) == 1)\n",
        )
        .unwrap();
        fs::write(
            dir.join("b.rascript"),
            "achievement(\"B\", \"D\", 2, byte(0x11) == 2)\n",
        )
        .unwrap();
        fs::write(dir.join("notes.txt"), "not a script").unwrap();
        fs::create_dir(dir.join("nested")).unwrap();
        fs::write(
            dir.join("nested").join("c.rascript"),
            "x = missing_name\n",
        )
        .unwrap();
    }

    #[test]
    fn test_file_discovery() {
        let temp_dir = tempdir().unwrap();
        write_set(temp_dir.path());

        let files = discover_script_files(temp_dir.path(), &quiet_config(1)).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| f.extension().unwrap() == "rascript"));

        let flat = BatchConfig {
            recursive: false,
            ..quiet_config(1)
        };
        assert_eq!(discover_script_files(temp_dir.path(), &flat).unwrap().len(), 2);
    }

    #[test]
    fn test_file_limit() {
        let temp_dir = tempdir().unwrap();
        write_set(temp_dir.path());
        let limited = BatchConfig {
            max_files: Some(1),
            ..quiet_config(1)
        };
        assert_eq!(discover_script_files(temp_dir.path(), &limited).unwrap().len(), 1);
    }

    #[test]
    fn test_discovery_errors() {
        let temp_dir = tempdir().unwrap();
        assert_matches!(
            discover_script_files(temp_dir.path(), &quiet_config(1)),
            Err(BatchError::NoFilesFound { .. })
        );
        assert_matches!(
            discover_script_files(&temp_dir.path().join("missing"), &quiet_config(1)),
            Err(BatchError::DirectoryNotFound { .. })
        );
    }

    #[test]
    fn test_file_validation() {
        let temp_dir = tempdir().unwrap();
        let valid_file = temp_dir.path().join("valid.rascript");
        fs::write(&valid_file, "x = 1\n").unwrap();

        let files = vec![valid_file, temp_dir.path().join("nonexistent.rascript")];
        let (valid, invalid) = validate_files(&files);
        assert_eq!(valid.len(), 1);
        assert_eq!(invalid.len(), 1);
    }

    #[test]
    fn test_sequential_batch() {
        let _ = crate::logging::init_global_logging();
        let temp_dir = tempdir().unwrap();
        write_set(temp_dir.path());

        let results = process_directory_sequential(temp_dir.path(), &quiet_config(1)).unwrap();
        assert_eq!(results.files_discovered, 3);
        assert_eq!(results.success_count(), 3);
        assert_eq!(results.failure_count(), 0);
        assert_eq!(results.diagnostic_file_count(), 1);
        assert_eq!(results.object_count(), 2);
    }

    #[test]
    fn test_parallel_batch_matches_sequential_order() {
        let _ = crate::logging::init_global_logging();
        let temp_dir = tempdir().unwrap();
        write_set(temp_dir.path());

        let results = process_directory_with_config(temp_dir.path(), &quiet_config(3)).unwrap();
        assert_eq!(results.files_processed, 3);
        let names: Vec<_> = results
            .successful_files
            .iter()
            .map(|(path, _)| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.rascript", "b.rascript", "c.rascript"]);
    }

    #[test]
    fn test_fail_fast_stops_after_problem() {
        let _ = crate::logging::init_global_logging();
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("a.rascript"), "x = nope\n").unwrap();
        fs::write(temp_dir.path().join("b.rascript"), "y = 1\n").unwrap();

        let config = BatchConfig {
            fail_fast: true,
            ..quiet_config(1)
        };
        let results = process_directory_sequential(temp_dir.path(), &config).unwrap();
        assert_eq!(results.files_processed, 1);
        assert!(results.has_problems());
    }

    #[test]
    fn test_unreadable_file_does_not_stop_batch() {
        let _ = crate::logging::init_global_logging();
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("a.rascript"), [0xff, 0xfe, 0x00]).unwrap();
        fs::write(temp_dir.path().join("b.rascript"), "y = 1\n").unwrap();

        let results = process_directory_sequential(temp_dir.path(), &quiet_config(1)).unwrap();
        assert_eq!(results.files_processed, 2);
        assert_eq!(results.failure_count(), 1);
        assert_eq!(results.success_count(), 1);
        assert!(!codes::requires_halt(
            results.failed_files[0].1.error_code().as_str()
        ));
    }

    #[test]
    fn test_chunk_size_calculation() {
        assert_eq!(calculate_chunk_size(100, 4), 25);
        assert_eq!(calculate_chunk_size(10, 4), 3);
        assert_eq!(calculate_chunk_size(1, 4), 1);
        assert_eq!(calculate_chunk_size(200, 4), 50);
        assert_eq!(calculate_chunk_size(0, 4), 1);
    }

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert!(config.effective_threads() >= 1);
        assert!(config.effective_threads() <= MAX_WORKER_THREADS);
        assert!(config.recursive);
        assert!(!config.fail_fast);
        assert!(config.max_files.is_none());
    }
}
