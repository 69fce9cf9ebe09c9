//! Git repository inspection for mergescan.

pub mod client;

pub use client::{BranchNames, GitClient, MergeType};
