use crate::error::{PreviewError, UserFriendlyError};
use crate::jobs::{Job, JobResult, JobStatus, SourceKind};
use crate::{BatchReport, BatchSummary};
use console::{style, Emoji, Term};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl OutputMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        }
    }
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");

pub struct OutputFormatter {
    #[allow(dead_code)]
    term: Term,
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let term = Term::stdout();
        let use_colors = match mode {
            OutputMode::Human => term.features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            term,
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    // Core messaging methods
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(2) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("  {}", style(message).dim());
                    } else {
                        println!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => println!("DEBUG: {}", message),
            }
        }
    }

    /// Opening banner: tool name plus the batch dimensions.
    pub fn print_banner(&self, threads: usize, total_jobs: usize) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                self.print_header("2dx preview extractor");
                if self.use_colors {
                    println!("{}", style(format!("Threads: {}", threads)).dim());
                    println!("{}", style(format!("Songs:   {}", total_jobs)).dim());
                } else {
                    println!("Threads: {}", threads);
                    println!("Songs:   {}", total_jobs);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "batch_start",
                    "threads": threads,
                    "songs": total_jobs,
                    "timestamp": chrono::Utc::now().to_rfc3339()
                }));
            }
            OutputMode::Plain => {
                println!("STARTING: batch extraction (threads={}, songs={})", threads, total_jobs);
            }
        }
    }

    /// One line block per finished job, in completion order.
    pub fn print_job_result(&self, result: &JobResult) {
        match self.mode {
            OutputMode::Human => self.print_human_job_result(result),
            OutputMode::Json => {
                let mut obj = serde_json::to_value(result)
                    .unwrap_or_else(|_| serde_json::json!({}));
                if let Some(map) = obj.as_object_mut() {
                    map.insert("type".to_string(), serde_json::json!("result"));
                    map.insert(
                        "timestamp".to_string(),
                        serde_json::json!(chrono::Utc::now().to_rfc3339()),
                    );
                }
                self.print_json_object(&obj);
            }
            OutputMode::Plain => {
                println!(
                    "RESULT: [{}] {} source={} status={}",
                    result.prefix, result.song_name, result.source, result.status
                );
            }
        }
    }

    fn print_human_job_result(&self, result: &JobResult) {
        if self.use_colors {
            println!(
                "{}",
                style(format!("[{}] {}", result.prefix, result.song_name)).bold()
            );
            if result.source != SourceKind::None {
                println!("{}", style(format!("  source: {}", result.source)).dim());
            }
            let status_line = format!("  status: {}", result.status);
            match result.status {
                JobStatus::Ok => println!("{}", style(status_line).green()),
                JobStatus::Skip => println!("{}", style(status_line).yellow()),
                JobStatus::Error => println!("{}", style(status_line).red()),
            }
            if self.verbose_level >= 1 {
                if let Some(ref detail) = result.detail {
                    println!("{}", style(format!("  detail: {}", detail)).dim());
                }
            }
        } else {
            println!("[{}] {}", result.prefix, result.song_name);
            if result.source != SourceKind::None {
                println!("  source: {}", result.source);
            }
            println!("  status: {}", result.status);
            if self.verbose_level >= 1 {
                if let Some(ref detail) = result.detail {
                    println!("  detail: {}", detail);
                }
            }
        }
    }

    /// Dry-run listing: which source a job would use, without running it.
    pub fn print_dry_run_entry(&self, job: &Job, source: SourceKind) {
        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!(
                        "{} {}",
                        style(format!("[{}] {}", job.prefix, job.song_name)).bold(),
                        style(format!("→ {}", source)).dim()
                    );
                } else {
                    println!("[{}] {} -> {}", job.prefix, job.song_name, source);
                }
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "plan",
                    "prefix": job.prefix,
                    "song_name": job.song_name,
                    "source": source.to_string(),
                }));
            }
            OutputMode::Plain => {
                println!("PLAN: [{}] {} source={}", job.prefix, job.song_name, source);
            }
        }
    }

    // Summary and reporting
    pub fn print_batch_report(&self, report: &BatchReport) {
        match self.mode {
            OutputMode::Human => self.print_human_summary(&report.summary),
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Plain => self.print_plain_summary(&report.summary),
        }
    }

    fn print_human_summary(&self, summary: &BatchSummary) {
        if self.quiet {
            return;
        }

        println!();
        self.print_header("Summary");

        if self.use_colors {
            println!("{}", style(format!("Success   : {}", summary.ok)).green());
            println!("{}", style(format!("Skipped   : {}", summary.skipped)).yellow());
            println!("{}", style(format!("Errors    : {}", summary.errors)).red());
            println!();
            println!("{}", style("Done.").cyan());
        } else {
            println!("Success   : {}", summary.ok);
            println!("Skipped   : {}", summary.skipped);
            println!("Errors    : {}", summary.errors);
            println!();
            println!("Done.");
        }
    }

    fn print_plain_summary(&self, summary: &BatchSummary) {
        println!("COMPLETED: batch extraction");
        println!("Success: {}", summary.ok);
        println!("Skipped: {}", summary.skipped);
        println!("Errors: {}", summary.errors);
    }

    // User-friendly error handling
    pub fn print_user_friendly_error(&self, error: &PreviewError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    println!();
                    if self.use_colors {
                        println!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        println!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    println!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    pub fn warn_missing_asset_root(&self, label: &str, path: &Path) {
        self.warning(&format!(
            "{} does not exist: {} (songs relying on it will be skipped)",
            label,
            path.display()
        ));
    }

    // Specialized output methods
    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{}", style(format!("=== {} ===", title)).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {} // No separator in JSON mode
        }
    }

    // Private helper methods
    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_parsing() {
        assert_eq!(OutputMode::from_string("human"), OutputMode::Human);
        assert_eq!(OutputMode::from_string("json"), OutputMode::Json);
        assert_eq!(OutputMode::from_string("plain"), OutputMode::Plain);
        assert_eq!(OutputMode::from_string("invalid"), OutputMode::Human);
    }

    #[test]
    fn test_formatter_creation() {
        let formatter = OutputFormatter::new(OutputMode::Human, 1, false);
        assert_eq!(formatter.mode, OutputMode::Human);
        assert_eq!(formatter.verbose_level, 1);
        assert!(!formatter.quiet);
    }

    #[test]
    fn test_quiet_mode() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert_eq!(formatter.verbose_level, 0);
        assert!(formatter.quiet);
        assert!(!formatter.use_colors);
    }

    #[test]
    fn test_should_show_message() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, false);
        assert!(formatter.should_show_message(0));
        assert!(formatter.should_show_message(1));
        assert!(formatter.should_show_message(2));
        assert!(!formatter.should_show_message(3));

        let quiet_formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert!(!quiet_formatter.should_show_message(0));
    }
}
