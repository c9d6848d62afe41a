use crate::error::{PreviewError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Everything a job needs beyond its own chart folder: the two candidate
/// asset roots, the two extraction tools, and the shared output root.
#[derive(Debug, Clone)]
pub struct JobEnv {
    pub sound_path: PathBuf,
    pub omnimix_sound_path: PathBuf,
    pub dx_tool: PathBuf,
    pub ifs_tool: PathBuf,
    pub output_root: PathBuf,
}

/// One unit of work. Immutable once constructed; moved into the worker
/// pool and consumed exactly once.
#[derive(Debug, Clone)]
pub struct Job {
    /// Leading whitespace-delimited token of the chart folder name, used to
    /// key into the asset roots (`<root>/<prefix>/<prefix>_pre.2dx`).
    pub prefix: String,
    /// Full chart folder name; also the output subdirectory name.
    pub song_name: String,
    pub sound_path: PathBuf,
    pub omnimix_sound_path: PathBuf,
    pub dx_tool: PathBuf,
    pub ifs_tool: PathBuf,
    pub output_root: PathBuf,
}

impl Job {
    pub fn new(env: &JobEnv, song_name: String) -> Self {
        let prefix = song_name
            .split_whitespace()
            .next()
            .unwrap_or(song_name.as_str())
            .to_string();

        Self {
            prefix,
            song_name,
            sound_path: env.sound_path.clone(),
            omnimix_sound_path: env.omnimix_sound_path.clone(),
            dx_tool: env.dx_tool.clone(),
            ifs_tool: env.ifs_tool.clone(),
            output_root: env.output_root.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Discovery {
    pub jobs: Vec<Job>,
    /// Chart folders dropped by an exclude pattern.
    pub excluded: usize,
}

pub struct JobDiscovery {
    env: JobEnv,
    exclude: Vec<Regex>,
}

impl JobDiscovery {
    pub fn new(env: JobEnv) -> Self {
        Self {
            env,
            exclude: Vec::new(),
        }
    }

    pub fn with_exclude_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(self)
    }

    /// Enumerate the immediate subdirectories of `charts_root` in stable
    /// name order and turn each into a [`Job`]. Non-directory entries are
    /// ignored. A missing charts root is a fatal configuration error.
    pub fn discover(&self, charts_root: &Path) -> Result<Discovery> {
        if !charts_root.is_dir() {
            return Err(PreviewError::ChartsDirNotFound {
                path: charts_root.to_path_buf(),
            });
        }

        let mut jobs = Vec::new();
        let mut excluded = 0;

        for entry in WalkDir::new(charts_root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_dir() {
                continue;
            }

            let song_name = entry.file_name().to_string_lossy().to_string();

            if self.is_excluded(&song_name) {
                excluded += 1;
                continue;
            }

            jobs.push(Job::new(&self.env, song_name));
        }

        Ok(Discovery { jobs, excluded })
    }

    fn is_excluded(&self, song_name: &str) -> bool {
        self.exclude.iter().any(|re| re.is_match(song_name))
    }
}
