//! Conflict block data types.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Heuristic label attached to a conflict block.
///
/// The label is a hint for whoever resolves the block, not a guarantee.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Both sides are empty or whitespace only.
    BothEmpty,
    /// Sides differ only in leading/trailing whitespace.
    Whitespace,
    /// Our side removed the content, theirs kept it.
    OursDeleted,
    /// Their side removed the content, ours kept it.
    TheirsDeleted,
    /// Both sides consist solely of import-like statements.
    ImportOrder,
    /// Their lines contain all of ours plus additions.
    TheirsSuperset,
    /// Our lines contain all of theirs plus additions.
    OursSuperset,
    /// Same lines, different order.
    Reorder,
    /// Both sides are manifest-style `"name": "version"` entries.
    VersionDiff,
    /// Nothing simpler applies, or the block is malformed.
    Complex,
}

impl Classification {
    /// Every tag the classifier can produce.
    pub const ALL: [Classification; 10] = [
        Self::BothEmpty,
        Self::Whitespace,
        Self::OursDeleted,
        Self::TheirsDeleted,
        Self::ImportOrder,
        Self::TheirsSuperset,
        Self::OursSuperset,
        Self::Reorder,
        Self::VersionDiff,
        Self::Complex,
    ];

    /// `true` for tags a resolver may handle mechanically.
    ///
    /// Deletions and version bumps still need a decision about which side
    /// wins, so they count with `complex`.
    pub fn is_auto_resolvable(&self) -> bool {
        matches!(
            self,
            Self::Whitespace
                | Self::ImportOrder
                | Self::OursSuperset
                | Self::TheirsSuperset
                | Self::Reorder
                | Self::BothEmpty
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BothEmpty => "both_empty",
            Self::Whitespace => "whitespace",
            Self::OursDeleted => "ours_deleted",
            Self::TheirsDeleted => "theirs_deleted",
            Self::ImportOrder => "import_order",
            Self::TheirsSuperset => "theirs_superset",
            Self::OursSuperset => "ours_superset",
            Self::Reorder => "reorder",
            Self::VersionDiff => "version_diff",
            Self::Complex => "complex",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Parsed region
// ---------------------------------------------------------------------------

/// Message attached to a region whose opening marker is never closed.
pub const MISSING_CLOSING_MARKER: &str =
    "incomplete conflict markers: missing >>>>>>> closing marker";

/// One conflict region as found by the scanner, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRegion {
    /// Zero-based ordinal within the file.
    pub index: usize,
    /// 1-indexed line of the opening marker.
    pub start_line: usize,
    /// 1-indexed line of the closing marker, or the last line when malformed.
    pub end_line: usize,
    pub ours_label: String,
    pub theirs_label: String,
    pub ours: String,
    pub theirs: String,
    /// Content of the `|||||||` section; `Some` iff `has_base`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    pub has_base: bool,
    pub context_before: String,
    pub context_after: String,
    /// Set when the region runs to end-of-file without a closing marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub malformed: Option<String>,
}

impl ConflictRegion {
    pub fn is_malformed(&self) -> bool {
        self.malformed.is_some()
    }
}

// ---------------------------------------------------------------------------
// Classified block
// ---------------------------------------------------------------------------

/// A conflict region with its classification attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictBlock {
    #[serde(flatten)]
    pub region: ConflictRegion,
    pub classification: Classification,
}

impl ConflictBlock {
    pub fn new(region: ConflictRegion, classification: Classification) -> Self {
        Self {
            region,
            classification,
        }
    }

    pub fn is_auto_resolvable(&self) -> bool {
        self.classification.is_auto_resolvable()
    }
}
