//! Per-file and per-repository conflict reports.
//!
//! [`ConflictReporter`] ties the pieces together: the file policy decides how
//! each conflicted path is treated, text files are scanned and classified,
//! and the results are rolled up into a [`ConflictReport`] suitable for JSON
//! output.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::{FilesConfig, ScanConfig};
use crate::conflict::scanner::line_count;
use crate::conflict::{ConflictBlock, Classifier, Scanner};
use crate::errors::{ConfigError, ScanError};
use crate::file_policy::{file_name, FilePolicy, FilePolicyDecision};
use crate::git::{BranchNames, GitClient, MergeType};

/// Version of the report format.
pub const REPORT_VERSION: &str = "1.1.0";

/// Attached to text files whose content did not decode as UTF-8.
pub const ENCODING_WARNING: &str = "file may not be UTF-8 encoded; rewriting it block by block \
     can corrupt it, resolve with `git checkout --ours` or `git checkout --theirs` instead";

// ---------------------------------------------------------------------------
// File report
// ---------------------------------------------------------------------------

/// How a conflicted file was treated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Text,
    Binary,
    Lock,
    Error,
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Binary => write!(f, "binary"),
            Self::Lock => write!(f, "lock"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Analysis of one conflicted file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    /// Path relative to the repository root.
    pub path: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub blocks: Vec<ConflictBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_lines: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complex_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_warning: Option<String>,
}

impl FileReport {
    fn empty(path: &str, file_type: FileType) -> Self {
        Self {
            path: path.to_string(),
            filename: file_name(path).to_string(),
            file_type,
            blocks: Vec::new(),
            total_lines: None,
            auto_count: None,
            complex_count: None,
            suggestion: None,
            error: None,
            encoding_warning: None,
        }
    }

    pub fn lock(path: &str, suggestion: &str) -> Self {
        Self {
            suggestion: Some(suggestion.to_string()),
            ..Self::empty(path, FileType::Lock)
        }
    }

    pub fn binary(path: &str) -> Self {
        Self::empty(path, FileType::Binary)
    }

    pub fn error(path: &str, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty(path, FileType::Error)
        }
    }

    /// Text file report with counts derived from `blocks`.
    pub fn text(path: &str, blocks: Vec<ConflictBlock>, total_lines: usize) -> Self {
        let auto = blocks.iter().filter(|b| b.is_auto_resolvable()).count();
        let complex = blocks.len() - auto;
        Self {
            blocks,
            total_lines: Some(total_lines),
            auto_count: Some(auto),
            complex_count: Some(complex),
            ..Self::empty(path, FileType::Text)
        }
    }
}

// ---------------------------------------------------------------------------
// Repository report
// ---------------------------------------------------------------------------

/// Block and file counts across a whole report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Blocks safe to resolve mechanically.
    pub auto: usize,
    /// Blocks that need a decision.
    pub complex: usize,
    /// Binary files.
    pub binary: usize,
    /// Lock files.
    pub lock: usize,
}

impl Summary {
    pub fn from_files(files: &[FileReport]) -> Self {
        let mut summary = Self::default();
        for file in files {
            match file.file_type {
                FileType::Text => {
                    summary.auto += file.auto_count.unwrap_or(0);
                    summary.complex += file.complex_count.unwrap_or(0);
                }
                FileType::Binary => summary.binary += 1,
                FileType::Lock => summary.lock += 1,
                FileType::Error => {}
            }
        }
        summary
    }
}

/// Conflict report for an in-progress merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub merge_type: MergeType,
    pub branches: BranchNames,
    pub total_files: usize,
    pub files: Vec<FileReport>,
    pub summary: Summary,
}

impl ConflictReport {
    pub fn new(merge_type: MergeType, branches: BranchNames, files: Vec<FileReport>) -> Self {
        Self {
            version: REPORT_VERSION.to_string(),
            generated_at: Utc::now(),
            merge_type,
            branches,
            total_files: files.len(),
            summary: Summary::from_files(&files),
            files,
        }
    }

    /// `true` when no file is conflicted.
    pub fn is_clean(&self) -> bool {
        self.files.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

/// Runs the scan pipeline for single texts, files, and repositories.
#[derive(Debug, Clone)]
pub struct ConflictReporter {
    scanner: Scanner,
    classifier: Classifier,
    policy: FilePolicy,
    lock_suggestion: String,
}

impl Default for ConflictReporter {
    fn default() -> Self {
        let files = FilesConfig::default();
        Self::new(
            Scanner::default(),
            Classifier::default(),
            FilePolicy::default(),
            files.lock_suggestion,
        )
    }
}

impl ConflictReporter {
    pub fn new(
        scanner: Scanner,
        classifier: Classifier,
        policy: FilePolicy,
        lock_suggestion: impl Into<String>,
    ) -> Self {
        Self {
            scanner,
            classifier,
            policy,
            lock_suggestion: lock_suggestion.into(),
        }
    }

    /// Build a reporter from a validated configuration.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            config.scanner(),
            config.classifier()?,
            FilePolicy::new(&config.files, config.scan.binary_sniff_bytes),
            config.files.lock_suggestion.clone(),
        ))
    }

    /// Scan `text` and classify every region found.
    pub fn analyze_text(&self, text: &str) -> Vec<ConflictBlock> {
        self.classifier.classify_all(self.scanner.scan(text))
    }

    /// Report on `rel_path` under `root`. Failures are captured in the
    /// report rather than returned.
    pub fn report_file(&self, root: &Path, rel_path: &str) -> FileReport {
        let decision = self.policy.evaluate_path(root, rel_path);
        debug!(path = rel_path, policy = decision.label(), "evaluated conflicted file");
        match decision {
            FilePolicyDecision::Lock { pattern } => {
                debug!(path = rel_path, %pattern, "matched lock pattern");
                return FileReport::lock(rel_path, &self.lock_suggestion);
            }
            FilePolicyDecision::Binary => return FileReport::binary(rel_path),
            FilePolicyDecision::Text => {}
        }

        let bytes = match std::fs::read(root.join(rel_path)) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = rel_path, error = %e, "failed to read conflicted file");
                return FileReport::error(rel_path, e.to_string());
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        self.report_text(rel_path, &text)
    }

    /// Report on already-decoded text. A U+FFFD in `text` is taken as a sign
    /// of lossy decoding and adds the encoding warning.
    pub fn report_text(&self, rel_path: &str, text: &str) -> FileReport {
        let blocks = self.analyze_text(text);
        debug!(path = rel_path, blocks = blocks.len(), "scanned text file");
        let mut report = FileReport::text(rel_path, blocks, line_count(text));
        if text.contains('\u{FFFD}') {
            report.encoding_warning = Some(ENCODING_WARNING.to_string());
        }
        report
    }

    /// Validate `config`, then scan the repository enclosing `path` with a
    /// reporter built from it.
    pub fn scan_with_config(
        config: &ScanConfig,
        path: &Path,
    ) -> Result<ConflictReport, ScanError> {
        Self::from_config(config)?.scan_repository(path)
    }

    /// Report on every conflicted file of the repository enclosing `path`.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn scan_repository(&self, path: &Path) -> Result<ConflictReport, ScanError> {
        let client = GitClient::discover(path)?;
        let conflicted = client.conflicted_paths()?;
        let merge_type = client.merge_type();
        let branches = client.branches();

        let files: Vec<FileReport> = conflicted
            .iter()
            .map(|rel_path| self.report_file(client.workdir(), rel_path))
            .collect();

        let report = ConflictReport::new(merge_type, branches, files);
        info!(
            files = report.total_files,
            auto = report.summary.auto,
            complex = report.summary.complex,
            "repository scan complete"
        );
        Ok(report)
    }
}
