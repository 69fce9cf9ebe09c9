//! Conflict classification heuristics.
//!
//! Classification is an ordered chain of named rules; the first rule that
//! returns a tag wins and [`Classification::Complex`] is the fallback:
//!
//! | Order | Rule | Tag |
//! |-------|------|-----|
//! | 0 | region is malformed | `complex` |
//! | 1 | both sides blank | `both_empty` |
//! | 2 | sides equal after trimming the whole block | `whitespace` |
//! | 3 | ours has no non-blank lines | `ours_deleted` |
//! | 4 | theirs has no non-blank lines | `theirs_deleted` |
//! | 5 | every line is an import statement | `import_order` |
//! | 6 | one side's line multiset contains the other's | `theirs_superset` / `ours_superset` |
//! | 7 | identical line multisets | `reorder` |
//! | 8 | every line is a manifest version entry | `version_diff` |
//!
//! The rules overlap (blank sides trivially have equal multisets), so the
//! order is part of the contract.

use std::collections::HashMap;

use tracing::trace;

use super::block::{Classification, ConflictBlock, ConflictRegion};
use super::patterns::PatternTable;

/// Default multiplier of the superset size guard.
pub const DEFAULT_SUPERSET_RATIO: f64 = 1.3;
/// Default flat line allowance of the superset size guard.
pub const DEFAULT_SUPERSET_SLACK: usize = 5;

type Multiset<'a> = HashMap<&'a str, usize>;

/// Precomputed views of a region shared by all rules.
struct Sides<'a> {
    region: &'a ConflictRegion,
    ours_lines: Vec<&'a str>,
    theirs_lines: Vec<&'a str>,
    ours_set: Multiset<'a>,
    theirs_set: Multiset<'a>,
}

impl<'a> Sides<'a> {
    fn new(region: &'a ConflictRegion) -> Self {
        let ours_lines = significant_lines(&region.ours);
        let theirs_lines = significant_lines(&region.theirs);
        Self {
            region,
            ours_set: multiset(&ours_lines),
            theirs_set: multiset(&theirs_lines),
            ours_lines,
            theirs_lines,
        }
    }
}

/// Trimmed, non-blank lines of one side.
fn significant_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

fn multiset<'a>(lines: &[&'a str]) -> Multiset<'a> {
    let mut counts = HashMap::new();
    for line in lines {
        *counts.entry(*line).or_insert(0) += 1;
    }
    counts
}

/// `true` if every element of `sub` occurs in `sup` at least as often.
fn is_submultiset(sub: &Multiset<'_>, sup: &Multiset<'_>) -> bool {
    sub.iter()
        .all(|(line, count)| sup.get(line).copied().unwrap_or(0) >= *count)
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

type Rule = fn(&Classifier, &Sides<'_>) -> Option<Classification>;

const RULES: &[(&str, Rule)] = &[
    ("malformed", rule_malformed),
    ("both_empty", rule_both_empty),
    ("whitespace", rule_whitespace),
    ("ours_deleted", rule_ours_deleted),
    ("theirs_deleted", rule_theirs_deleted),
    ("import_order", rule_import_order),
    ("superset", rule_superset),
    ("reorder", rule_reorder),
    ("version_diff", rule_version_diff),
];

fn rule_malformed(_: &Classifier, s: &Sides<'_>) -> Option<Classification> {
    s.region.is_malformed().then_some(Classification::Complex)
}

fn rule_both_empty(_: &Classifier, s: &Sides<'_>) -> Option<Classification> {
    let empty = s.region.ours.trim().is_empty() && s.region.theirs.trim().is_empty();
    empty.then_some(Classification::BothEmpty)
}

fn rule_whitespace(_: &Classifier, s: &Sides<'_>) -> Option<Classification> {
    (s.region.ours.trim() == s.region.theirs.trim()).then_some(Classification::Whitespace)
}

fn rule_ours_deleted(_: &Classifier, s: &Sides<'_>) -> Option<Classification> {
    (s.ours_lines.is_empty() && !s.theirs_lines.is_empty()).then_some(Classification::OursDeleted)
}

fn rule_theirs_deleted(_: &Classifier, s: &Sides<'_>) -> Option<Classification> {
    (s.theirs_lines.is_empty() && !s.ours_lines.is_empty())
        .then_some(Classification::TheirsDeleted)
}

fn rule_import_order(c: &Classifier, s: &Sides<'_>) -> Option<Classification> {
    let all_imports = |lines: &[&str]| {
        !lines.is_empty() && lines.iter().all(|l| c.patterns.is_import(l))
    };
    (all_imports(&s.ours_lines) && all_imports(&s.theirs_lines))
        .then_some(Classification::ImportOrder)
}

fn rule_superset(c: &Classifier, s: &Sides<'_>) -> Option<Classification> {
    let ours_in_theirs = is_submultiset(&s.ours_set, &s.theirs_set);
    let theirs_in_ours = is_submultiset(&s.theirs_set, &s.ours_set);

    if ours_in_theirs
        && !theirs_in_ours
        && c.within_superset_guard(s.theirs_lines.len(), s.ours_lines.len())
    {
        return Some(Classification::TheirsSuperset);
    }
    if theirs_in_ours
        && !ours_in_theirs
        && c.within_superset_guard(s.ours_lines.len(), s.theirs_lines.len())
    {
        return Some(Classification::OursSuperset);
    }
    None
}

fn rule_reorder(_: &Classifier, s: &Sides<'_>) -> Option<Classification> {
    (s.ours_set == s.theirs_set).then_some(Classification::Reorder)
}

fn rule_version_diff(c: &Classifier, s: &Sides<'_>) -> Option<Classification> {
    let all_versions = |lines: &[&str]| {
        !lines.is_empty() && lines.iter().all(|l| c.patterns.is_version_entry(l))
    };
    (all_versions(&s.ours_lines) && all_versions(&s.theirs_lines))
        .then_some(Classification::VersionDiff)
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Assigns a [`Classification`] to scanned conflict regions.
///
/// Holds only immutable configuration, so one instance can be shared across
/// threads.
#[derive(Debug, Clone)]
pub struct Classifier {
    patterns: PatternTable,
    superset_ratio: f64,
    superset_slack: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(
            PatternTable::default(),
            DEFAULT_SUPERSET_RATIO,
            DEFAULT_SUPERSET_SLACK,
        )
    }
}

impl Classifier {
    /// Build a classifier. `superset_ratio` and `superset_slack` bound how much
    /// longer the larger side of a superset may be:
    /// `larger <= smaller * superset_ratio + superset_slack`.
    pub fn new(patterns: PatternTable, superset_ratio: f64, superset_slack: usize) -> Self {
        Self {
            patterns,
            superset_ratio,
            superset_slack,
        }
    }

    pub fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    /// Classify one region. Total: every input gets exactly one tag.
    pub fn classify(&self, region: &ConflictRegion) -> Classification {
        let sides = Sides::new(region);
        for (name, rule) in RULES {
            if let Some(tag) = rule(self, &sides) {
                trace!(index = region.index, rule = *name, %tag, "classified conflict block");
                return tag;
            }
        }
        Classification::Complex
    }

    /// Classify every region, attaching the tags.
    pub fn classify_all(&self, regions: Vec<ConflictRegion>) -> Vec<ConflictBlock> {
        regions
            .into_iter()
            .map(|region| {
                let tag = self.classify(&region);
                ConflictBlock::new(region, tag)
            })
            .collect()
    }

    fn within_superset_guard(&self, larger: usize, smaller: usize) -> bool {
        (larger as f64) <= (smaller as f64) * self.superset_ratio + self.superset_slack as f64
    }
}
