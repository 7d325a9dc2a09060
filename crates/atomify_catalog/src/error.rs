//! # Catalog Error Types
//!
//! Failures of a whole catalog load. Per-entry problems are not errors;
//! they are reported as [`crate::SkippedEntry`] warnings.

use thiserror::Error;

/// Errors that abort a catalog load.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A required resource is not in the bundle.
    #[error("resource not found: {path}")]
    ResourceNotFound {
        /// Bundle-relative path that was looked up.
        path: String,
    },

    /// A resource exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Bundle-relative path being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest bytes are not valid JSON.
    #[error("manifest is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The manifest is JSON but lacks the expected top-level structure.
    #[error("manifest schema error: {0}")]
    Schema(String),
}

impl CatalogError {
    /// Maps an I/O failure on `path`, folding `NotFound` into
    /// [`CatalogError::ResourceNotFound`].
    #[must_use]
    pub fn from_io(path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::ResourceNotFound {
                path: path.to_string(),
            }
        } else {
            Self::Io {
                path: path.to_string(),
                source,
            }
        }
    }

    /// Returns true if retrying the same load could succeed.
    ///
    /// Only transient read failures qualify; a missing or malformed
    /// manifest stays that way until the bundle changes.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_not_found_folds_into_resource_not_found() {
        let err = CatalogError::from_io("simulations/simulations.json", io::ErrorKind::NotFound.into());
        assert!(matches!(err, CatalogError::ResourceNotFound { ref path } if path == "simulations/simulations.json"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_other_io_is_retryable() {
        let err = CatalogError::from_io("a.json", io::ErrorKind::PermissionDenied.into());
        assert!(matches!(err, CatalogError::Io { .. }));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("a.json"));
    }

    #[test]
    fn test_schema_message() {
        let err = CatalogError::Schema("missing `examples` array".to_string());
        assert_eq!(err.to_string(), "manifest schema error: missing `examples` array");
    }
}
