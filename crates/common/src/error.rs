//! Common error types for xcflat.

use std::path::PathBuf;
use thiserror::Error;

/// Common error type for xcflat operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("No binary found for {library} (searched {} candidate paths)", .searched.len())]
    BinaryNotFound {
        library: String,
        searched: Vec<PathBuf>,
    },

    #[error("Framework not found: {0:?}")]
    FrameworkNotFound(PathBuf),

    #[error("Copy failed: {source_path:?} -> {destination:?} - {reason}")]
    CopyFailed {
        source_path: PathBuf,
        destination: PathBuf,
        reason: String,
    },

    #[error("Failed to spawn {program}: {reason}")]
    ToolSpawn { program: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_not_found_message() {
        let err = Error::BinaryNotFound {
            library: "Bar".to_string(),
            searched: vec![PathBuf::from("a"), PathBuf::from("b")],
        };
        assert_eq!(
            err.to_string(),
            "No binary found for Bar (searched 2 candidate paths)"
        );
    }
}
