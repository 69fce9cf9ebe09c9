//! Error types for the mergescan core library.
//!
//! Each subsystem has its own error type derived with `thiserror`.
//! [`ScanError`] wraps the others for whole-repository scans.
//!
//! The marker scanner and the classifier have no error type at all: an
//! unterminated conflict region is reported as a malformed block, not as an
//! error. Everything here belongs to the layer around them.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The path is not inside a git work tree.
    #[error("not a git repository: '{0}'")]
    RepositoryNotFound(String),

    /// The repository has no work tree, so there is nothing to scan.
    #[error("git repository at '{0}' is bare and has no work tree")]
    BareRepository(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// A configured regular expression does not compile.
    #[error("invalid pattern in '{field}' ({pattern}): {detail}")]
    InvalidPattern {
        field: String,
        pattern: String,
        detail: String,
    },

    /// Generic I/O error reading or writing the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Repository scan errors
// ---------------------------------------------------------------------------

/// Errors that abort a whole-repository scan.
///
/// Per-file failures never show up here; they become a file report with
/// type `error` so the rest of the batch still gets processed.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Opening or querying the repository failed.
    #[error("repository scan failed: {0}")]
    Git(#[from] GitError),

    /// The configuration failed validation, so no reporter could be built.
    #[error("scanner configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = GitError::RepositoryNotFound("/tmp/nowhere".into());
        assert_eq!(err.to_string(), "not a git repository: '/tmp/nowhere'");

        let err = ConfigError::InvalidValue {
            field: "classifier.superset_ratio".into(),
            detail: "must be > 0".into(),
        };
        assert!(err.to_string().contains("classifier.superset_ratio"));

        let err = ConfigError::InvalidPattern {
            field: "classifier.version_pattern".into(),
            pattern: "(".into(),
            detail: "unclosed group".into(),
        };
        assert!(err.to_string().contains("unclosed group"));
    }

    #[test]
    fn test_scan_error_from_subsystem() {
        let scan_err: ScanError = GitError::RepositoryNotFound("x".into()).into();
        assert!(matches!(scan_err, ScanError::Git(GitError::RepositoryNotFound(_))));

        let scan_err: ScanError = ConfigError::ParseError("bad".into()).into();
        assert!(matches!(scan_err, ScanError::Config(ConfigError::ParseError(_))));
        assert!(scan_err.to_string().contains("bad"));
    }
}
