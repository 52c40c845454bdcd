//! Errors from loading, validating and saving the config file.

use std::path::PathBuf;
use thiserror::Error;

/// Config file errors. I/O variants carry the path involved.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file unreadable.
    #[error("cannot read config '{path}': {source}")]
    ReadFile {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be saved.
    #[error("cannot write config '{path}': {source}")]
    WriteFile {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Not valid TOML, or a field has the wrong type.
    #[error("invalid config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The config could not be turned back into TOML.
    #[error("cannot serialize config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Parsed, but one or more values are out of range.
    #[error("invalid config: {0}")]
    Validation(#[from] crate::validation::ValidationError),

    /// The config directory could not be created.
    #[error("cannot create config directory '{path}': {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// [`ConfigError::ReadFile`] for `path`.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// [`ConfigError::WriteFile`] for `path`.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// [`ConfigError::CreateDir`] for `path`.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn mock_io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "mock")
    }

    #[test]
    fn factories_keep_the_path() {
        let err = ConfigError::read_file("/etc/bluesgrid.toml", mock_io_err());
        assert!(
            matches!(err, ConfigError::ReadFile { ref path, .. } if path == std::path::Path::new("/etc/bluesgrid.toml"))
        );
        let err = ConfigError::create_dir("/ro", mock_io_err());
        assert!(err.to_string().contains("/ro"));
    }

    #[test]
    fn io_source_is_chained() {
        let err = ConfigError::write_file("/out.toml", mock_io_err());
        assert!(err.source().is_some());
    }

    #[test]
    fn toml_errors_convert() {
        let parse: std::result::Result<toml::Value, _> = toml::from_str("[audio");
        let err: ConfigError = parse.unwrap_err().into();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }
}
