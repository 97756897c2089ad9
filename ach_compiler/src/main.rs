use ach_compiler::config::runtime::RuntimeConfig;
use ach_compiler::pipeline::{ObjectKind, PipelineOutput, PipelineResult};
use ach_compiler::{batch, logging, pipeline};
use std::env;
use std::path::Path;

/// Command line options beyond the input path
#[derive(Debug, Clone)]
struct CliOptions {
    batch: batch::BatchConfig,
    json: bool,
    quiet: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <file.rascript|directory> [options]", args[0]);
        eprintln!("       {} --help", args[0]);
        std::process::exit(1);
    }

    if args[1] == "--help" {
        print_help(&args[0]);
        return Ok(());
    }

    let input_path = Path::new(&args[1]);
    let options = parse_options(&args[2..]);

    // Logging preferences from --config must be in place before the logger exists
    logging::config::init_runtime_preferences(options.batch.runtime.logging.clone())?;
    logging::init_global_logging()?;
    pipeline::validate_pipeline()?;

    let succeeded = if input_path.is_file() {
        process_single_file(&args[1], &options)?
    } else if input_path.is_dir() {
        process_directory_batch(input_path, &options)?
    } else {
        eprintln!("Error: Input must be a .rascript file or a directory");
        eprintln!("  Path: {}", input_path.display());
        false
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn print_help(program_name: &str) {
    println!("Achievement Script Compiler v{}", env!("CARGO_PKG_VERSION"));
    println!("Compiles achievement scripts into runtime requirement strings");
    println!();
    println!("USAGE:");
    println!("    {} <file.rascript> [options]       # Compile one script", program_name);
    println!("    {} <directory> [options]           # Compile every script", program_name);
    println!();
    println!("OPTIONS:");
    println!("    --help                  Show this help message");
    println!("    --target-version X.Y    Oldest runtime the output must load in");
    println!("    --address-width N       Hex digits written for addresses (default: 6)");
    println!("    --config FILE           Load runtime preferences from a TOML file");
    println!("    --json                  Print compiled output as JSON");
    println!("    --threads N             Worker threads for directories (default: auto)");
    println!("    --sequential            Compile directories on one thread");
    println!("    --no-recursive          Don't search subdirectories");
    println!("    --max-files N           Limit the number of scripts compiled");
    println!("    --fail-fast             Stop at the first script with problems");
    println!("    --quiet                 Only print the summary");
    println!();
    println!("EXAMPLES:");
    println!("    {} game.rascript", program_name);
    println!("    {} game.rascript --target-version 0.78 --json", program_name);
    println!("    {} sets/ --threads 4 --fail-fast", program_name);
}

fn parse_options(args: &[String]) -> CliOptions {
    let mut options = CliOptions {
        batch: batch::BatchConfig::default(),
        json: false,
        quiet: false,
    };

    let mut i = 0;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--json" => options.json = true,
            "--quiet" => {
                options.quiet = true;
                options.batch.progress_reporting = false;
            }
            "--sequential" => options.batch.max_threads = 1,
            "--no-recursive" => options.batch.recursive = false,
            "--fail-fast" => options.batch.fail_fast = true,
            "--target-version" => {
                match value {
                    Some(version) => {
                        options.batch.runtime.serialization.target_version = version.clone()
                    }
                    None => eprintln!("Warning: --target-version requires a version"),
                }
                i += 1;
            }
            "--address-width" => {
                match value.and_then(|v| v.parse::<usize>().ok()) {
                    Some(width) => options.batch.runtime.serialization.address_width = width,
                    None => eprintln!("Warning: --address-width requires a number, using default"),
                }
                i += 1;
            }
            "--threads" => {
                match value.and_then(|v| v.parse::<usize>().ok()) {
                    Some(threads) => options.batch.max_threads = threads.max(1),
                    None => eprintln!("Warning: --threads requires a number, using default"),
                }
                i += 1;
            }
            "--max-files" => {
                match value.and_then(|v| v.parse::<usize>().ok()) {
                    Some(max_files) => options.batch.max_files = Some(max_files),
                    None => eprintln!("Warning: --max-files requires a number, ignoring"),
                }
                i += 1;
            }
            "--config" => {
                match value.map(|path| RuntimeConfig::from_toml_file(Path::new(path))) {
                    Some(Ok(runtime)) => options.batch.runtime = runtime,
                    Some(Err(error)) => eprintln!("Warning: {}", error),
                    None => eprintln!("Warning: --config requires a file"),
                }
                i += 1;
            }
            other => eprintln!("Warning: Unknown option '{}'", other),
        }
        i += 1;
    }

    options
}

fn process_single_file(
    file_path: &str,
    options: &CliOptions,
) -> Result<bool, Box<dyn std::error::Error>> {
    if !options.quiet && !options.json {
        println!("Compiling: {}", file_path);
    }

    match pipeline::process_file_with_config(file_path, &options.batch.runtime) {
        Ok(result) => {
            if options.json {
                println!("{}", PipelineOutput::new(&result).to_json()?);
            } else {
                print_compiled(&result, options.quiet);
            }
            logging::print_cargo_style_summary();
            Ok(!result.has_errors())
        }
        Err(error) => {
            eprintln!("\nFAILED [{}]: {}", error.error_code(), error);
            logging::print_cargo_style_summary();
            Ok(false)
        }
    }
}

fn process_directory_batch(
    dir_path: &Path,
    options: &CliOptions,
) -> Result<bool, Box<dyn std::error::Error>> {
    let config = &options.batch;
    if !options.quiet && !options.json {
        println!("Starting batch compilation: {}", dir_path.display());
        println!(
            "Configuration: {} threads, recursive={}, fail_fast={}",
            config.effective_threads(),
            config.recursive,
            config.fail_fast
        );
    }

    match batch::process_directory_with_config(dir_path, config) {
        Ok(results) => {
            if options.json {
                let outputs: Vec<PipelineOutput> = results
                    .successful_files
                    .iter()
                    .map(|(_, result)| PipelineOutput::new(result))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&outputs)?);
            } else {
                if !options.quiet {
                    for (_, result) in &results.successful_files {
                        print_compiled(result, false);
                    }
                }
                print_batch_results(&results);
            }
            logging::print_cargo_style_summary();
            Ok(!results.has_problems())
        }
        Err(error) => {
            eprintln!("Batch compilation failed [{}]: {}", error.error_code(), error);
            logging::print_cargo_style_summary();
            Ok(false)
        }
    }
}

fn print_compiled(result: &PipelineResult, quiet: bool) {
    let script = &result.script;
    println!("\n{}", result.file_metadata.display_name());

    if !quiet {
        for object in &script.objects {
            let kind = match object.kind {
                ObjectKind::Achievement => "achievement",
                ObjectKind::Leaderboard => "leaderboard",
            };
            match object.points {
                Some(points) => println!(
                    "  [{}] line {}: \"{}\" ({} points, runtime {})",
                    kind, object.line, object.title, points, object.min_version
                ),
                None => println!(
                    "  [{}] line {}: \"{}\" (runtime {})",
                    kind, object.line, object.title, object.min_version
                ),
            }
            println!("    {}", object.definition);
        }
        if let Some(rich_presence) = &script.rich_presence {
            println!("  [rich presence]");
            for line in rich_presence.lines() {
                println!("    {}", line);
            }
        }
    }

    for diagnostic in &script.diagnostics {
        eprintln!("  error[{}]: {}", diagnostic.code, diagnostic.detail);
    }

    println!(
        "  {} achievements, {} leaderboards, {} diagnostics in {:.2}ms",
        script.achievements().count(),
        script.leaderboards().count(),
        script.diagnostics.len(),
        result.processing_duration.as_secs_f64() * 1000.0
    );
}

fn print_batch_results(results: &batch::BatchResults) {
    println!("\nBatch Compilation Summary:");
    println!("  Files discovered: {}", results.files_discovered);
    println!("  Files processed: {}", results.files_processed);
    println!(
        "  Compiled: {} ({:.1}%)",
        results.success_count(),
        results.success_rate() * 100.0
    );
    println!("  With diagnostics: {}", results.diagnostic_file_count());
    println!("  Failed: {}", results.failure_count());
    println!("  Objects: {}", results.object_count());
    println!(
        "  Total time: {:.2}s",
        results.processing_duration.as_secs_f64()
    );

    if results.failure_count() > 0 {
        println!("\nFailed Files:");
        for (file_path, error) in &results.failed_files {
            println!("  {}: [{}] {}", file_path.display(), error.error_code(), error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_options() {
        let options = parse_options(&strings(&[
            "--threads",
            "4",
            "--fail-fast",
            "--no-recursive",
            "--target-version",
            "0.78",
            "--address-width",
            "4",
            "--json",
        ]));
        assert_eq!(options.batch.max_threads, 4);
        assert!(options.batch.fail_fast);
        assert!(!options.batch.recursive);
        assert_eq!(options.batch.runtime.serialization.target_version, "0.78");
        assert_eq!(options.batch.runtime.serialization.address_width, 4);
        assert!(options.json);
    }

    #[test]
    fn test_parse_options_invalid() {
        let options = parse_options(&strings(&["--threads", "invalid", "--unknown-option"]));
        assert_ne!(options.batch.max_threads, 0);
        assert!(!options.json);
    }

    #[test]
    fn test_quiet_disables_progress() {
        let options = parse_options(&strings(&["--quiet"]));
        assert!(options.quiet);
        assert!(!options.batch.progress_reporting);
    }
}
