//! TOML-based configuration for mergescan.
//!
//! Every section is optional; a missing file section falls back to the
//! built-in defaults, which reproduce the stock classifier behaviour. The
//! pattern tables and the superset guard live here so new ecosystems can be
//! supported without code changes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::conflict::classifier::{DEFAULT_SUPERSET_RATIO, DEFAULT_SUPERSET_SLACK};
use crate::conflict::patterns::{DEFAULT_IMPORT_PATTERNS, DEFAULT_VERSION_PATTERN};
use crate::conflict::scanner::DEFAULT_CONTEXT_LINES;
use crate::conflict::{Classifier, PatternTable, Scanner};
use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Marker scanner settings.
    #[serde(default)]
    pub scan: ScannerConfig,

    /// Classification heuristics.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Per-file type detection.
    #[serde(default)]
    pub files: FilesConfig,
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Marker scanner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Lines of surrounding context captured on each side of a block.
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,

    /// Bytes inspected for a NUL byte when deciding whether a file is binary.
    #[serde(default = "default_binary_sniff_bytes")]
    pub binary_sniff_bytes: usize,
}

fn default_context_lines() -> usize {
    DEFAULT_CONTEXT_LINES
}
fn default_binary_sniff_bytes() -> usize {
    8192
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
            binary_sniff_bytes: default_binary_sniff_bytes(),
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Classification heuristics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Multiplier of the superset size guard. The guard value has no
    /// derivation beyond practice; tune it if supersets are over- or
    /// under-reported.
    #[serde(default = "default_superset_ratio")]
    pub superset_ratio: f64,

    /// Flat line allowance of the superset size guard.
    #[serde(default = "default_superset_slack")]
    pub superset_slack: usize,

    /// Regular expressions (regex-lite syntax) recognising import-style lines.
    #[serde(default = "default_import_patterns")]
    pub import_patterns: Vec<String>,

    /// Regular expression recognising `"name": "version"` manifest lines.
    #[serde(default = "default_version_pattern")]
    pub version_pattern: String,
}

fn default_superset_ratio() -> f64 {
    DEFAULT_SUPERSET_RATIO
}
fn default_superset_slack() -> usize {
    DEFAULT_SUPERSET_SLACK
}
fn default_import_patterns() -> Vec<String> {
    DEFAULT_IMPORT_PATTERNS.iter().map(|p| p.to_string()).collect()
}
fn default_version_pattern() -> String {
    DEFAULT_VERSION_PATTERN.into()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            superset_ratio: default_superset_ratio(),
            superset_slack: default_superset_slack(),
            import_patterns: default_import_patterns(),
            version_pattern: default_version_pattern(),
        }
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Dependency lock files that are regenerated rather than merged.
pub const DEFAULT_LOCK_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Gemfile.lock",
    "Cargo.lock",
    "poetry.lock",
    "composer.lock",
    "Pipfile.lock",
    "go.sum",
];

/// Per-file type detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Glob patterns matched against a conflicted file's name.
    #[serde(default = "default_lock_files")]
    pub lock_files: Vec<String>,

    /// Advice attached to lock-file reports.
    #[serde(default = "default_lock_suggestion")]
    pub lock_suggestion: String,
}

fn default_lock_files() -> Vec<String> {
    DEFAULT_LOCK_FILES.iter().map(|f| f.to_string()).collect()
}
fn default_lock_suggestion() -> String {
    "delete this file and re-run the package manager's install to regenerate it".into()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            lock_files: default_lock_files(),
            lock_suggestion: default_lock_suggestion(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl ScanConfig {
    /// Load a [`ScanConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: ScanConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Validate that all values are sane and every pattern compiles.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.classifier.superset_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "classifier.superset_ratio".into(),
                detail: format!("must be a finite number > 0, got {ratio}"),
            });
        }
        if self.classifier.import_patterns.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "classifier.import_patterns".into(),
                detail: "at least one pattern is required".into(),
            });
        }
        if self.scan.binary_sniff_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan.binary_sniff_bytes".into(),
                detail: "must be > 0".into(),
            });
        }
        if let Some(blank) = self.files.lock_files.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "files.lock_files".into(),
                detail: format!("empty pattern {blank:?}"),
            });
        }
        self.pattern_table()?;
        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to TOML (used to write the starter config).
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Compile the classifier's pattern tables.
    pub fn pattern_table(&self) -> Result<PatternTable, ConfigError> {
        PatternTable::new(
            self.classifier.import_patterns.as_slice(),
            &self.classifier.version_pattern,
        )
    }

    /// Build the classifier described by this config.
    pub fn classifier(&self) -> Result<Classifier, ConfigError> {
        Ok(Classifier::new(
            self.pattern_table()?,
            self.classifier.superset_ratio,
            self.classifier.superset_slack,
        ))
    }

    /// Build the scanner described by this config.
    pub fn scanner(&self) -> Scanner {
        Scanner::new(self.scan.context_lines)
    }
}
