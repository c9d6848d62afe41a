use crate::error::{PreviewError, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "paths.json";

/// Persisted asset locations, stored as pretty-printed JSON in `paths.json`.
///
/// Collected interactively on first run and reused on every run after that.
/// CLI flags override the loaded values without rewriting the file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub sound_path: PathBuf,
    pub omnimix_sound_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sound_path: PathBuf::new(),
            omnimix_sound_path: PathBuf::new(),
        }
    }
}

impl Config {
    pub fn new(sound_path: PathBuf, omnimix_sound_path: PathBuf) -> Self {
        Self {
            sound_path,
            omnimix_sound_path,
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PreviewError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| PreviewError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = serde_json::from_str(&content).map_err(|e| PreviewError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    /// Load the config file if it exists, otherwise collect the two asset
    /// paths on stdin and persist them for the next run.
    pub fn load_or_prompt<P: AsRef<Path>>(path: P, interactive: bool) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            return Self::load_from_file(path);
        }

        if !interactive {
            return Err(PreviewError::Config {
                message: format!(
                    "Configuration file not found: {} (pass --sound-path and --omnimix-sound-path, or run interactively once to create it)",
                    path.display()
                ),
            });
        }

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let config = Self::prompt_for_paths(&mut stdin.lock(), &mut stdout.lock())?;
        config.save_to_file(path)?;

        Ok(config)
    }

    /// Read both asset paths from `input`, echoing prompts to `output`.
    /// Split out from [`load_or_prompt`](Self::load_or_prompt) so tests can
    /// drive it with a cursor instead of a live terminal.
    pub fn prompt_for_paths<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Self> {
        let sound_path = prompt_line(input, output, "Enter path to contents/data/sound: ")?;
        let omnimix_sound_path = prompt_line(
            input,
            output,
            "Enter path to contents/data_mods/omnimix/sound: ",
        )?;

        Ok(Self::new(
            PathBuf::from(sound_path),
            PathBuf::from(omnimix_sound_path),
        ))
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref sound_path) = cli_args.sound_path {
            self.sound_path = sound_path.clone();
        }

        if let Some(ref omnimix_sound_path) = cli_args.omnimix_sound_path {
            self.omnimix_sound_path = omnimix_sound_path.clone();
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).map_err(|e| PreviewError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| PreviewError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sound_path.as_os_str().is_empty() {
            return Err(PreviewError::Config {
                message: "Primary sound path must not be empty".to_string(),
            });
        }

        if self.omnimix_sound_path.as_os_str().is_empty() {
            return Err(PreviewError::Config {
                message: "Omnimix sound path must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn create_sample_config() -> String {
        let sample = Self::new(
            PathBuf::from("C:/games/iidx/contents/data/sound"),
            PathBuf::from("C:/games/iidx/contents/data_mods/omnimix/sound"),
        );
        serde_json::to_string_pretty(&sample).unwrap_or_else(|_| String::new())
    }
}

/// Prompt for a single path on the live terminal.
pub fn prompt_path(prompt: &str) -> Result<PathBuf> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let line = prompt_line(&mut stdin.lock(), &mut stdout.lock(), prompt)?;
    Ok(PathBuf::from(line))
}

fn prompt_line<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<String> {
    write!(output, "{}", prompt)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(PreviewError::Config {
            message: "Empty path entered".to_string(),
        });
    }

    Ok(trimmed.to_string())
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub sound_path: Option<PathBuf>,
    pub omnimix_sound_path: Option<PathBuf>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sound_path(mut self, sound_path: Option<PathBuf>) -> Self {
        self.sound_path = sound_path;
        self
    }

    pub fn with_omnimix_sound_path(mut self, omnimix_sound_path: Option<PathBuf>) -> Self {
        self.omnimix_sound_path = omnimix_sound_path;
        self
    }

    /// True when both paths are supplied, meaning the config file is not
    /// needed at all for this run.
    pub fn is_complete(&self) -> bool {
        self.sound_path.is_some() && self.omnimix_sound_path.is_some()
    }
}
