use crate::domain::config::FileConfig;
use crate::domain::error::{SerComError, SerComResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Loads session defaults from the user's configuration file.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> SerComResult<Self> {
        let home = dirs::home_dir().ok_or_else(|| SerComError::Config {
            message: "could not determine home directory".to_string(),
        })?;

        Ok(Self {
            config_path: home.join(".config").join("sercom").join("config.toml"),
        })
    }

    /// Load the defaults file, or empty defaults when none exists.
    pub fn load(&self) -> SerComResult<FileConfig> {
        if !self.config_path.exists() {
            return Ok(FileConfig::default());
        }
        Self::load_from_path(&self.config_path)
    }

    /// Load defaults from an explicit path.
    pub fn load_from_path(path: &Path) -> SerComResult<FileConfig> {
        let content = fs::read_to_string(path).map_err(|e| SerComError::Config {
            message: format!("failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| SerComError::Config {
            message: format!("failed to parse config file {}: {}", path.display(), e),
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "baud = 9600").unwrap();
        writeln!(file, "send_cmd = \"sz -vv\"").unwrap();

        let config = ConfigManager::load_from_path(file.path()).unwrap();
        assert_eq!(config.baud, Some(9600));
        assert_eq!(config.send_cmd.as_deref(), Some("sz -vv"));
        assert!(config.receive_cmd.is_none());
    }

    #[test]
    fn test_load_missing_path_is_error() {
        let err = ConfigManager::load_from_path(Path::new("/no/such/sercom.toml")).unwrap_err();
        assert!(matches!(err, SerComError::Config { .. }));
    }

    #[test]
    fn test_load_invalid_toml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "baud = \"fast\"").unwrap();

        let err = ConfigManager::load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, SerComError::Config { .. }));
    }
}
