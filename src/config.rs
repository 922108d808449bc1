//! Export Settings

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::DEFAULT_CODE_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("code_size must be positive")]
    ZeroCodeSize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Pixel size codes are rendered at.
    pub code_size: u32,
    /// Theme text colour that `currentColor` resolves to at export time.
    pub foreground: String,
    /// `None` keeps the code background transparent.
    pub background: Option<String>,
    pub output_dir: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            code_size: DEFAULT_CODE_SIZE,
            foreground: "#000000".to_string(),
            background: None,
            output_dir: PathBuf::from("exports"),
        }
    }
}

impl ExportSettings {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.code_size == 0 {
            return Err(ConfigError::ZeroCodeSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r##"{{"foreground": "#ffffff"}}"##).unwrap();

        let settings = ExportSettings::load_from_file(file.path()).unwrap();
        assert_eq!(settings.foreground, "#ffffff");
        assert_eq!(settings.code_size, DEFAULT_CODE_SIZE);
        assert_eq!(settings.background, None);
    }

    #[test]
    fn test_zero_code_size_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"code_size": 0}}"#).unwrap();
        assert!(matches!(
            ExportSettings::load_from_file(file.path()),
            Err(ConfigError::ZeroCodeSize)
        ));
    }
}
