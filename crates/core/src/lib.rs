//! mergescan core library.
//!
//! Locates merge-conflict regions in text files, splits them into
//! ours/base/theirs sections, and tags each region with a heuristic
//! classification telling a downstream resolver whether it is safe to
//! handle mechanically. The surrounding layers read conflicted paths from a
//! git repository and roll the results up into a JSON-ready report.

pub mod config;
pub mod conflict;
pub mod errors;
pub mod file_policy;
pub mod git;
pub mod report;

// Re-exports for convenience.
pub use config::ScanConfig;
pub use conflict::{
    Classification, Classifier, ConflictBlock, ConflictRegion, PatternTable, Scanner,
};
pub use errors::{ConfigError, GitError, ScanError};
pub use file_policy::{FilePolicy, FilePolicyDecision};
pub use git::{BranchNames, GitClient, MergeType};
pub use report::{ConflictReport, ConflictReporter, FileReport, FileType, Summary};
