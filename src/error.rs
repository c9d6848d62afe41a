use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Charts directory not found or not a directory: {path}")]
    ChartsDirNotFound { path: PathBuf },

    #[error("Extraction tool not found: {path}")]
    ToolMissing { path: PathBuf },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for PreviewError {
    fn user_message(&self) -> String {
        match self {
            PreviewError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            PreviewError::ChartsDirNotFound { path } => {
                format!("Charts directory not found: {}", path.display())
            }
            PreviewError::ToolMissing { path } => {
                format!("Extraction tool not found: {}", path.display())
            }
            PreviewError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            PreviewError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            PreviewError::Config { .. } => Some(
                "Check paths.json for valid JSON with \"sound_path\" and \"omnimix_sound_path\" keys, or delete it to be prompted again.".to_string()
            ),
            PreviewError::ChartsDirNotFound { .. } => Some(
                "Pass the path to the folder that contains one subfolder per BMS chart (e.g. \"07 AA -rhythm of the soul-\").".to_string()
            ),
            PreviewError::ToolMissing { .. } => Some(
                "Place 2dx_extract and ifs_extract next to previewgen (in 2dx_extract/ and ifs_extract/ subfolders), or point at them with --dx-tool and --ifs-tool.".to_string()
            ),
            PreviewError::Io(_) => Some(
                "Ensure you have read access to the sound assets and write access to the output directory.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PreviewError {
    fn from(error: serde_json::Error) -> Self {
        PreviewError::Config {
            message: error.to_string(),
        }
    }
}

impl From<regex::Error> for PreviewError {
    fn from(error: regex::Error) -> Self {
        PreviewError::Config {
            message: format!("Invalid exclude pattern: {}", error),
        }
    }
}

pub type Result<T> = std::result::Result<T, PreviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let error = PreviewError::ChartsDirNotFound {
            path: PathBuf::from("/no/such/charts"),
        };
        assert!(error.user_message().contains("Charts directory not found"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_tool_missing_suggestion() {
        let error = PreviewError::ToolMissing {
            path: PathBuf::from("2dx_extract/2dx_extract"),
        };
        assert!(error.user_message().contains("2dx_extract"));
        assert!(error.suggestion().unwrap().contains("--dx-tool"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = PreviewError::from(json_error);
        assert!(matches!(error, PreviewError::Config { .. }));
    }

    #[test]
    fn test_cancelled_has_no_suggestion() {
        assert!(PreviewError::Cancelled.suggestion().is_none());
    }
}
