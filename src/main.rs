use clap::Parser;
use previewgen::{
    config, Cli, JobRunner, OutputFormatter, OutputMode, PreviewError, PreviewGen,
    UserFriendlyError,
};
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    // Create PreviewGen instance (loads or interactively collects config)
    let app = match PreviewGen::from_cli(&cli) {
        Ok(app) => app,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    let charts_root = match resolve_charts_dir(&cli) {
        Ok(path) => path,
        Err(e) => {
            app.handle_error(&e);
            return 1;
        }
    };

    // Handle dry run mode
    if cli.dry_run {
        return handle_dry_run(&app, &charts_root);
    }

    // Execute main extraction workflow
    match app.run_batch(&charts_root) {
        Ok(report) => {
            app.output_formatter().print_batch_report(&report);

            // Jobs that errored don't abort the batch, but they do flag the run
            if report.summary.has_errors() {
                2
            } else {
                0
            }
        }
        Err(e) => {
            app.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &PreviewError) -> i32 {
    match error {
        PreviewError::Cancelled => 130, // Interrupted (SIGINT)
        PreviewError::ChartsDirNotFound { .. } => 3,
        PreviewError::ToolMissing { .. } => 4,
        _ => 1, // General error
    }
}

fn resolve_charts_dir(cli: &Cli) -> previewgen::Result<PathBuf> {
    if let Some(ref charts_dir) = cli.charts_dir {
        return Ok(charts_dir.clone());
    }

    if cli.is_interactive() {
        return config::prompt_path("Enter path to BMS charts folder: ");
    }

    Err(PreviewError::Config {
        message: "No charts directory given (pass it as the first argument)".to_string(),
    })
}

fn handle_generate_config(cli: &Cli) -> i32 {
    match PreviewGen::generate_sample_config(&cli.config) {
        Ok(()) => {
            println!(
                "Generated sample configuration file: {}",
                cli.config.display()
            );
            println!("\nEdit it to point at your IIDX sound directories, then run:");
            println!("  previewgen <charts-dir> --config {}", cli.config.display());
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(app: &PreviewGen, charts_root: &Path) -> i32 {
    let formatter = app.output_formatter();

    formatter.print_header("Dry run");

    let discovery = match app.discover_jobs(charts_root) {
        Ok(discovery) => discovery,
        Err(e) => {
            app.handle_error(&e);
            return exit_code_for(&e);
        }
    };

    for job in &discovery.jobs {
        let source = JobRunner::probe_source(job);
        formatter.print_dry_run_entry(job, source);
    }

    formatter.print_separator();
    formatter.success(&format!(
        "{} song(s) discovered, {} excluded; run without --dry-run to extract",
        discovery.jobs.len(),
        discovery.excluded
    ));

    0
}

fn print_startup_error(error: &PreviewError) {
    // Create a basic formatter for startup errors
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use previewgen::OutputFormat;
    use tempfile::TempDir;

    fn test_cli(charts_dir: Option<PathBuf>, config: PathBuf) -> Cli {
        Cli {
            charts_dir,
            sound_path: None,
            omnimix_sound_path: None,
            output: None,
            dx_tool: None,
            ifs_tool: None,
            jobs: None,
            exclude: None,
            config,
            output_format: OutputFormat::Plain,
            verbose: 0,
            quiet: true,
            dry_run: false,
            generate_config: false,
        }
    }

    #[test]
    fn test_generate_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("paths.json");

        let mut cli = test_cli(None, config_path.clone());
        cli.generate_config = true;

        let exit_code = handle_generate_config(&cli);
        assert_eq!(exit_code, 0);
        assert!(config_path.exists());

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("sound_path"));
    }

    #[test]
    fn test_resolve_charts_dir_from_argument() {
        let cli = test_cli(Some(PathBuf::from("./charts")), PathBuf::from("paths.json"));
        assert_eq!(
            resolve_charts_dir(&cli).unwrap(),
            PathBuf::from("./charts")
        );
    }

    #[test]
    fn test_resolve_charts_dir_errors_when_not_interactive() {
        let cli = test_cli(None, PathBuf::from("paths.json"));
        let result = resolve_charts_dir(&cli);
        assert!(matches!(result, Err(PreviewError::Config { .. })));
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(exit_code_for(&PreviewError::Cancelled), 130);
        assert_eq!(
            exit_code_for(&PreviewError::ChartsDirNotFound {
                path: PathBuf::from("/x")
            }),
            3
        );
        assert_eq!(
            exit_code_for(&PreviewError::ToolMissing {
                path: PathBuf::from("/x")
            }),
            4
        );
        assert_eq!(
            exit_code_for(&PreviewError::Config {
                message: "bad".to_string()
            }),
            1
        );
    }
}
