//! Conflict-marker scanning and classification.
//!
//! The conflict subsystem is responsible for:
//! 1. **Scanning** -- locating `<<<<<<<` / `|||||||` / `=======` / `>>>>>>>`
//!    regions in a file's text and splitting them into ours/base/theirs.
//! 2. **Classification** -- labelling each region with a heuristic hint for
//!    the resolver.
//!
//! Both steps are pure functions of their input and hold no state across
//! files.

pub mod block;
pub mod classifier;
pub mod patterns;
pub mod scanner;

pub use block::{Classification, ConflictBlock, ConflictRegion};
pub use classifier::Classifier;
pub use patterns::PatternTable;
pub use scanner::Scanner;
