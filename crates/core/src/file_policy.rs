//! File-type policy for conflicted files.
//!
//! Provides [`FilePolicy`] which decides, before any conflict parsing, how a
//! conflicted file should be reported.
//!
//! # Decision model
//!
//! | Condition | Decision |
//! |-----------|----------|
//! | File name matches a lock-file pattern | `Lock` |
//! | NUL byte within the first `binary_sniff_bytes` | `Binary` |
//! | File cannot be opened for sniffing | `Binary` |
//! | None of the above | `Text` |
//!
//! Only `Text` files are handed to the marker scanner.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::FilesConfig;

// ---------------------------------------------------------------------------
// Decision enum
// ---------------------------------------------------------------------------

/// The outcome of evaluating a conflicted file against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePolicyDecision {
    /// Ordinary text file; scan it for conflict blocks.
    Text,
    /// Dependency lock file, regenerated instead of merged.
    Lock { pattern: String },
    /// Binary content; markers cannot be parsed.
    Binary,
}

impl FilePolicyDecision {
    /// Short human-readable label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Lock { .. } => "lock",
            Self::Binary => "binary",
        }
    }
}

// ---------------------------------------------------------------------------
// FilePolicy
// ---------------------------------------------------------------------------

/// Classifies conflicted files as lock, binary, or text.
///
/// Constructed from the `[files]` and `[scan]` config sections. Cheap to
/// clone (all data is owned strings/usize).
#[derive(Debug, Clone)]
pub struct FilePolicy {
    /// Glob patterns matched against the file name (not the full path).
    lock_patterns: Vec<String>,
    /// Number of leading bytes searched for NUL.
    binary_sniff_bytes: usize,
}

impl Default for FilePolicy {
    fn default() -> Self {
        Self::new(&FilesConfig::default(), 8192)
    }
}

impl FilePolicy {
    pub fn new(files: &FilesConfig, binary_sniff_bytes: usize) -> Self {
        Self {
            lock_patterns: files.lock_files.clone(),
            binary_sniff_bytes,
        }
    }

    /// Evaluate a file whose leading bytes are already in memory.
    ///
    /// `rel_path` is the path relative to the repository root, forward-slash
    /// separated.
    pub fn evaluate(&self, rel_path: &str, head: &[u8]) -> FilePolicyDecision {
        if let Some(pattern) = self.lock_pattern_for(rel_path) {
            return FilePolicyDecision::Lock {
                pattern: pattern.to_string(),
            };
        }
        if self.looks_binary(head) {
            debug!(path = rel_path, "NUL byte found, treating as binary");
            return FilePolicyDecision::Binary;
        }
        FilePolicyDecision::Text
    }

    /// Evaluate a file on disk, reading at most `binary_sniff_bytes`.
    ///
    /// Lock files are decided by name alone. A file that cannot be opened is
    /// treated as binary so it is never rewritten block by block.
    pub fn evaluate_path(&self, base_dir: &Path, rel_path: &str) -> FilePolicyDecision {
        if let Some(pattern) = self.lock_pattern_for(rel_path) {
            return FilePolicyDecision::Lock {
                pattern: pattern.to_string(),
            };
        }
        match self.read_head(&base_dir.join(rel_path)) {
            Ok(head) => self.evaluate(rel_path, &head),
            Err(e) => {
                warn!(path = rel_path, error = %e, "cannot sniff file, treating as binary");
                FilePolicyDecision::Binary
            }
        }
    }

    fn looks_binary(&self, head: &[u8]) -> bool {
        let end = head.len().min(self.binary_sniff_bytes);
        head[..end].contains(&0)
    }

    fn read_head(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        let mut head = Vec::with_capacity(self.binary_sniff_bytes);
        File::open(path)?
            .take(self.binary_sniff_bytes as u64)
            .read_to_end(&mut head)?;
        Ok(head)
    }

    /// First lock pattern matching the file name of `rel_path`.
    fn lock_pattern_for(&self, rel_path: &str) -> Option<&str> {
        let path = rel_path.replace('\\', "/");
        let name = file_name(&path);
        self.lock_patterns
            .iter()
            .find(|pattern| glob_match::glob_match(pattern, name))
            .map(String::as_str)
    }
}

/// Last component of a forward-slash separated path.
pub fn file_name(rel_path: &str) -> &str {
    rel_path.rsplit('/').next().unwrap_or(rel_path)
}
