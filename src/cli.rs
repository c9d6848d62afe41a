use crate::config::{CliOverrides, Config, DEFAULT_CONFIG_FILE};
use crate::error::Result;
use crate::BatchOptions;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "previewgen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batch-extract song preview audio for BMS charts")]
#[command(
    long_about = "previewgen scans a folder of BMS chart directories, locates the matching \
                       IIDX sound assets (pre-extracted 2dx containers or .ifs archives), runs \
                       the external 2dx_extract/ifs_extract tools over them in parallel, and \
                       drops one preview WAV per song under the output directory."
)]
#[command(after_help = "EXAMPLES:\n  \
    previewgen ./charts\n  \
    previewgen ./charts --output previews --jobs 4\n  \
    previewgen ./charts --sound-path /iidx/data/sound --omnimix-sound-path /iidx/data_mods/omnimix/sound\n  \
    previewgen ./charts --exclude '^WIP','^_' --dry-run\n\n\
    For more information, visit: https://github.com/user/previewgen")]
pub struct Cli {
    /// Folder containing one subdirectory per BMS chart
    pub charts_dir: Option<PathBuf>,

    /// Primary sound asset directory (contents/data/sound)
    #[arg(long, help = "Overrides sound_path from the config file")]
    pub sound_path: Option<PathBuf>,

    /// Omnimix sound asset directory (contents/data_mods/omnimix/sound)
    #[arg(long, help = "Overrides omnimix_sound_path from the config file")]
    pub omnimix_sound_path: Option<PathBuf>,

    /// Output directory for extracted previews
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to the 2dx_extract executable
    #[arg(long, help = "Defaults to 2dx_extract/2dx_extract next to previewgen")]
    pub dx_tool: Option<PathBuf>,

    /// Path to the ifs_extract executable
    #[arg(long, help = "Defaults to ifs_extract/ifs_extract next to previewgen")]
    pub ifs_tool: Option<PathBuf>,

    /// Number of parallel extraction workers
    #[arg(short, long, help = "Defaults to the logical CPU count")]
    pub jobs: Option<usize>,

    /// Chart folder names to skip (regular expressions)
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Configuration file path
    #[arg(short, long, help = "Path to the JSON config file", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// List the discovered jobs and their sources without running any tool
    #[arg(long, help = "Show what would be extracted without actually doing it")]
    pub dry_run: bool,

    /// Generate a sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let overrides = self.create_cli_overrides();

        // Both paths on the command line make the config file irrelevant.
        let mut config = if overrides.is_complete() {
            Config::default()
        } else {
            Config::load_or_prompt(&self.config, self.is_interactive())?
        };

        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_sound_path(self.sound_path.clone())
            .with_omnimix_sound_path(self.omnimix_sound_path.clone())
    }

    pub fn batch_options(&self) -> BatchOptions {
        let mut options = BatchOptions::default();

        if let Some(ref output) = self.output {
            options.output_root = output.clone();
        }
        if let Some(ref dx_tool) = self.dx_tool {
            options.dx_tool = dx_tool.clone();
        }
        if let Some(ref ifs_tool) = self.ifs_tool {
            options.ifs_tool = ifs_tool.clone();
        }
        if let Some(jobs) = self.jobs {
            options.threads = jobs.max(1);
        }
        if let Some(ref exclude) = self.exclude {
            options.exclude = exclude.clone();
        }

        options
    }

    /// Prompting is only acceptable in Human mode on a real terminal;
    /// scripted runs must never block on stdin.
    pub fn is_interactive(&self) -> bool {
        matches!(self.output_format, OutputFormat::Human)
            && !self.quiet
            && console::user_attended()
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

/// Conventional tool location: a directory named after the tool, next to
/// the previewgen executable, holding the tool binary itself.
pub fn default_tool_path(tool_name: &str) -> PathBuf {
    let base = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join(tool_name)
        .join(format!("{}{}", tool_name, std::env::consts::EXE_SUFFIX))
}
