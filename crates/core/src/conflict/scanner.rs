//! Conflict-marker scanner.
//!
//! A single forward pass over the lines of one file, driven by an explicit
//! state machine:
//!
//! | State | `<<<<<<<` | `\|\|\|\|\|\|\|` | `=======` | `>>>>>>>` | other |
//! |-------|-----------|-----------|-----------|-----------|-------|
//! | `Outside` | open, → `InOurs` | skip | skip | skip | skip |
//! | `InOurs` | content | → `InBase` | → `InTheirs` | close | content |
//! | `InBase` | content | ignored | → `InTheirs` | close | content |
//! | `InTheirs` | content | → `InBase` | ignored | close | content |
//!
//! A base marker never moves lines already collected for `ours`; a base
//! marker after the separator sends the following lines to `base`.
//! An opening marker inside an open region is plain content: the marker
//! format itself cannot express nesting. A region still open at end of file
//! becomes a malformed region that swallows the rest of the file.

use std::borrow::Cow;

use tracing::{debug, warn};

use super::block::{ConflictRegion, MISSING_CLOSING_MARKER};

/// Default number of context lines captured on each side of a region.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

const OPEN_GLYPH: &str = "<<<<<<<";
const BASE_GLYPH: &str = "|||||||";
const SEPARATOR: &str = "=======";
const CLOSE_GLYPH: &str = ">>>>>>>";

// ---------------------------------------------------------------------------
// Line endings
// ---------------------------------------------------------------------------

/// Convert CRLF and lone CR line endings to LF.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Number of lines the scanner sees for `text` (a trailing newline yields a
/// final empty line).
pub fn line_count(text: &str) -> usize {
    normalize_line_endings(text).split('\n').count()
}

// ---------------------------------------------------------------------------
// Marker grammar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker<'a> {
    Open(&'a str),
    Base,
    Separator,
    Close(&'a str),
}

impl<'a> Marker<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        if line == SEPARATOR {
            return Some(Self::Separator);
        }
        if let Some(label) = labelled(line, OPEN_GLYPH) {
            return Some(Self::Open(label));
        }
        if labelled(line, BASE_GLYPH).is_some() {
            return Some(Self::Base);
        }
        labelled(line, CLOSE_GLYPH).map(Self::Close)
    }
}

/// Match `glyph` alone or `glyph` + space + label; returns the trimmed label.
fn labelled<'a>(line: &'a str, glyph: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(glyph)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix(' ').map(str::trim)
}

fn is_marker(line: &str) -> bool {
    Marker::parse(line).is_some()
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Accumulator for a region whose closing marker has not been seen yet.
#[derive(Debug)]
struct Pending<'a> {
    /// 0-based index of the opening marker line.
    start: usize,
    ours_label: &'a str,
    ours: Vec<&'a str>,
    base: Vec<&'a str>,
    has_base: bool,
    theirs: Vec<&'a str>,
}

impl<'a> Pending<'a> {
    fn open(start: usize, ours_label: &'a str) -> Self {
        Self {
            start,
            ours_label,
            ours: Vec::new(),
            base: Vec::new(),
            has_base: false,
            theirs: Vec::new(),
        }
    }

    fn base_text(&self) -> Option<String> {
        self.has_base.then(|| self.base.join("\n"))
    }
}

#[derive(Debug)]
enum ScanState<'a> {
    Outside,
    InOurs(Pending<'a>),
    InBase(Pending<'a>),
    InTheirs(Pending<'a>),
}

/// Result of feeding one line to the state machine.
enum Step<'a> {
    Continue(ScanState<'a>),
    Closed {
        region: Pending<'a>,
        end: usize,
        theirs_label: &'a str,
    },
}

impl<'a> ScanState<'a> {
    fn advance(self, idx: usize, line: &'a str) -> Step<'a> {
        let next = match (self, Marker::parse(line)) {
            (Self::Outside, Some(Marker::Open(label))) => Self::InOurs(Pending::open(idx, label)),
            (Self::Outside, _) => Self::Outside,

            (
                Self::InOurs(region) | Self::InBase(region) | Self::InTheirs(region),
                Some(Marker::Close(theirs_label)),
            ) => {
                return Step::Closed {
                    region,
                    end: idx,
                    theirs_label,
                }
            }

            (Self::InOurs(mut region) | Self::InTheirs(mut region), Some(Marker::Base)) => {
                region.has_base = true;
                Self::InBase(region)
            }
            (Self::InOurs(region) | Self::InBase(region), Some(Marker::Separator)) => {
                Self::InTheirs(region)
            }
            (state @ Self::InBase(_), Some(Marker::Base)) => state,
            (state @ Self::InTheirs(_), Some(Marker::Separator)) => state,

            (Self::InOurs(mut region), _) => {
                region.ours.push(line);
                Self::InOurs(region)
            }
            (Self::InBase(mut region), _) => {
                region.base.push(line);
                Self::InBase(region)
            }
            (Self::InTheirs(mut region), _) => {
                region.theirs.push(line);
                Self::InTheirs(region)
            }
        };
        Step::Continue(next)
    }

    fn into_pending(self) -> Option<Pending<'a>> {
        match self {
            Self::Outside => None,
            Self::InOurs(p) | Self::InBase(p) | Self::InTheirs(p) => Some(p),
        }
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Stateless conflict-marker scanner.
#[derive(Debug, Clone, Copy)]
pub struct Scanner {
    context_lines: usize,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_LINES)
    }
}

impl Scanner {
    pub fn new(context_lines: usize) -> Self {
        Self { context_lines }
    }

    pub fn context_lines(&self) -> usize {
        self.context_lines
    }

    /// Find every conflict region in `text`, in file order.
    ///
    /// Never fails: an opening marker without a closing marker produces a
    /// malformed region ending at the last line of the file.
    pub fn scan(&self, text: &str) -> Vec<ConflictRegion> {
        let normalized = normalize_line_endings(text);
        let lines: Vec<&str> = normalized.split('\n').collect();

        let mut regions = Vec::new();
        let mut state = ScanState::Outside;

        for (idx, line) in lines.iter().copied().enumerate() {
            state = match state.advance(idx, line) {
                Step::Continue(next) => next,
                Step::Closed {
                    region,
                    end,
                    theirs_label,
                } => {
                    let index = regions.len();
                    regions.push(self.finish(&lines, region, end, theirs_label, index));
                    ScanState::Outside
                }
            };
        }

        if let Some(region) = state.into_pending() {
            warn!(
                start_line = region.start + 1,
                "conflict region has no closing marker"
            );
            let index = regions.len();
            regions.push(malformed(region, lines.len(), index));
        }

        debug!(lines = lines.len(), regions = regions.len(), "scan complete");
        regions
    }

    fn finish(
        &self,
        lines: &[&str],
        region: Pending<'_>,
        end: usize,
        theirs_label: &str,
        index: usize,
    ) -> ConflictRegion {
        ConflictRegion {
            index,
            start_line: region.start + 1,
            end_line: end + 1,
            ours_label: region.ours_label.to_string(),
            theirs_label: theirs_label.to_string(),
            ours: region.ours.join("\n"),
            theirs: region.theirs.join("\n"),
            base: region.base_text(),
            has_base: region.has_base,
            context_before: self.context_before(lines, region.start),
            context_after: self.context_after(lines, end),
            malformed: None,
        }
    }

    /// Up to `context_lines` lines directly above `start`, cut at the nearest
    /// marker line.
    fn context_before(&self, lines: &[&str], start: usize) -> String {
        let window = &lines[start.saturating_sub(self.context_lines)..start];
        let from = window
            .iter()
            .rposition(|l| is_marker(l))
            .map_or(0, |pos| pos + 1);
        window[from..].join("\n")
    }

    /// Up to `context_lines` lines directly below `end`, cut at the nearest
    /// marker line.
    fn context_after(&self, lines: &[&str], end: usize) -> String {
        let from = (end + 1).min(lines.len());
        let to = (end + 1 + self.context_lines).min(lines.len());
        let window = &lines[from..to];
        let until = window
            .iter()
            .position(|l| is_marker(l))
            .unwrap_or(window.len());
        window[..until].join("\n")
    }
}

fn malformed(region: Pending<'_>, total_lines: usize, index: usize) -> ConflictRegion {
    ConflictRegion {
        index,
        start_line: region.start + 1,
        end_line: total_lines,
        ours_label: region.ours_label.to_string(),
        theirs_label: String::new(),
        ours: region.ours.join("\n"),
        theirs: region.theirs.join("\n"),
        base: region.base_text(),
        has_base: region.has_base,
        context_before: String::new(),
        context_after: String::new(),
        malformed: Some(MISSING_CLOSING_MARKER.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<ConflictRegion> {
        Scanner::default().scan(text)
    }

    const SIMPLE: &str = "\
fn main() {
    let a = 1;
<<<<<<< HEAD
    let b = 2;
=======
    let b = 3;
>>>>>>> feature/x
    println!(\"{}\", a + b);
}
";

    #[test]
    fn test_no_markers_yields_nothing() {
        assert!(scan("").is_empty());
        assert!(scan("plain text\nwith lines\n").is_empty());
        // Marker glyphs not at line start do not count.
        assert!(scan("  <<<<<<< HEAD\nx\n  >>>>>>> other").is_empty());
    }

    #[test]
    fn test_simple_region() {
        let regions = scan(SIMPLE);
        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        assert_eq!(r.index, 0);
        assert_eq!(r.start_line, 3);
        assert_eq!(r.end_line, 7);
        assert_eq!(r.ours_label, "HEAD");
        assert_eq!(r.theirs_label, "feature/x");
        assert_eq!(r.ours, "    let b = 2;");
        assert_eq!(r.theirs, "    let b = 3;");
        assert!(!r.has_base);
        assert!(r.base.is_none());
        assert_eq!(r.context_before, "fn main() {\n    let a = 1;");
        assert_eq!(r.context_after, "    println!(\"{}\", a + b);\n}\n");
        assert!(!r.is_malformed());
    }

    #[test]
    fn test_multiple_regions_in_order() {
        let text = "a\n<<<<<<< ours\n1\n=======\n2\n>>>>>>> theirs\nb\nc\nd\ne\n\
                    <<<<<<< ours\n3\n=======\n4\n>>>>>>> theirs\nf";
        let regions = scan(text);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].index, 0);
        assert_eq!((regions[0].start_line, regions[0].end_line), (2, 6));
        assert_eq!(regions[1].index, 1);
        assert_eq!((regions[1].start_line, regions[1].end_line), (11, 15));
        assert_eq!(regions[1].ours, "3");
        assert_eq!(regions[1].theirs, "4");
        assert_eq!(regions[1].context_after, "f");
    }

    #[test]
    fn test_bare_markers_without_labels() {
        let regions = scan("<<<<<<<\nx\n=======\ny\n>>>>>>>");
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].ours_label, "");
        assert_eq!(regions[0].theirs_label, "");
        assert_eq!(regions[0].context_before, "");
        assert_eq!(regions[0].context_after, "");
    }

    #[test]
    fn test_glyph_run_without_space_is_not_a_marker() {
        // Eight '<' is neither the bare glyph nor glyph + space.
        assert!(scan("<<<<<<<<\nx\n=======\ny\n>>>>>>>>").is_empty());
        // The separator has no label form.
        let regions = scan("<<<<<<< a\nx\n======= b\ny\n>>>>>>> c");
        assert_eq!(regions[0].ours, "x\n======= b\ny");
        assert_eq!(regions[0].theirs, "");
    }

    #[test]
    fn test_labels_are_trimmed() {
        let regions = scan("<<<<<<<   HEAD  \na\n=======\nb\n>>>>>>>  abc123 (msg)  ");
        assert_eq!(regions[0].ours_label, "HEAD");
        assert_eq!(regions[0].theirs_label, "abc123 (msg)");
    }

    #[test]
    fn test_diff3_base_section() {
        let text = "<<<<<<< HEAD\nours\n||||||| merged common ancestors\nbase\n\
                    =======\ntheirs\n>>>>>>> b";
        let r = &scan(text)[0];
        assert!(r.has_base);
        assert_eq!(r.base.as_deref(), Some("base"));
        assert_eq!(r.ours, "ours");
        assert_eq!(r.theirs, "theirs");
    }

    #[test]
    fn test_empty_base_is_present() {
        let r = &scan("<<<<<<< a\nx\n|||||||\n=======\ny\n>>>>>>> b")[0];
        assert!(r.has_base);
        assert_eq!(r.base.as_deref(), Some(""));
    }

    #[test]
    fn test_repeated_base_marker_keeps_base_section() {
        let text = "<<<<<<< a\nx\n||||||| one\nb1\n||||||| two\nb2\n=======\ny\n>>>>>>> b";
        let r = &scan(text)[0];
        assert_eq!(r.ours, "x");
        assert_eq!(r.base.as_deref(), Some("b1\nb2"));
        assert_eq!(r.theirs, "y");
    }

    #[test]
    fn test_base_marker_after_separator_switches_to_base() {
        let text = "<<<<<<< a\nx\n=======\ny\n||||||| late\nz\n>>>>>>> b";
        let r = &scan(text)[0];
        assert_eq!(r.ours, "x");
        assert_eq!(r.theirs, "y");
        assert!(r.has_base);
        assert_eq!(r.base.as_deref(), Some("z"));
    }

    #[test]
    fn test_repeated_separator_in_theirs_is_ignored() {
        let r = &scan("<<<<<<< a\nx\n=======\ny\n=======\nz\n>>>>>>> b")[0];
        assert_eq!(r.ours, "x");
        assert_eq!(r.theirs, "y\nz");
        assert!(!r.has_base);
    }

    #[test]
    fn test_nested_open_marker_is_content() {
        let text = "<<<<<<< a\nx\n<<<<<<< inner\ny\n=======\nz\n>>>>>>> b\ntail";
        let regions = scan(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].ours, "x\n<<<<<<< inner\ny");
        assert_eq!(regions[0].theirs, "z");
        assert_eq!(regions[0].end_line, 7);
    }

    #[test]
    fn test_empty_sides() {
        let r = &scan("<<<<<<< a\n=======\n>>>>>>> b")[0];
        assert_eq!(r.ours, "");
        assert_eq!(r.theirs, "");
        assert_eq!((r.start_line, r.end_line), (1, 3));
    }

    #[test]
    fn test_crlf_and_cr_normalized() {
        let crlf = "a\r\n<<<<<<< x\r\n1\r\n=======\r\n2\r\n>>>>>>> y\r\nb";
        let cr = "a\r<<<<<<< x\r1\r=======\r2\r>>>>>>> y\rb";
        for text in [crlf, cr] {
            let regions = scan(text);
            assert_eq!(regions.len(), 1);
            assert_eq!(regions[0].ours, "1");
            assert_eq!(regions[0].theirs_label, "y");
            assert_eq!((regions[0].start_line, regions[0].end_line), (2, 6));
            assert_eq!(regions[0].context_after, "b");
        }
    }

    #[test]
    fn test_context_clamped_at_file_edges() {
        let text = "one\n<<<<<<< a\nx\n=======\ny\n>>>>>>> b\ntwo";
        let r = &scan(text)[0];
        assert_eq!(r.context_before, "one");
        assert_eq!(r.context_after, "two");
    }

    #[test]
    fn test_context_never_includes_markers() {
        let text = "<<<<<<< a\n1\n=======\n2\n>>>>>>> b\nmid\n<<<<<<< a\n3\n=======\n4\n>>>>>>> b";
        let regions = scan(text);
        assert_eq!(regions[0].context_after, "mid");
        assert_eq!(regions[1].context_before, "mid");
    }

    #[test]
    fn test_custom_context_width() {
        let text = "l1\nl2\nl3\nl4\n<<<<<<< a\nx\n=======\ny\n>>>>>>> b\nl5\nl6";
        let r = &Scanner::new(1).scan(text)[0];
        assert_eq!(r.context_before, "l4");
        assert_eq!(r.context_after, "l5");
        let r = &Scanner::new(0).scan(text)[0];
        assert_eq!(r.context_before, "");
        assert_eq!(r.context_after, "");
    }

    #[test]
    fn test_unterminated_region_is_malformed() {
        let text = "head\n<<<<<<< HEAD\nours line\n=======\ntheirs line\nmore";
        let regions = scan(text);
        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        assert!(r.is_malformed());
        assert_eq!(r.start_line, 2);
        assert_eq!(r.end_line, 6);
        assert_eq!(r.ours, "ours line");
        assert_eq!(r.theirs, "theirs line\nmore");
        assert_eq!(r.context_before, "");
        assert_eq!(r.context_after, "");
        assert_eq!(r.theirs_label, "");
    }

    #[test]
    fn test_unterminated_without_separator() {
        let regions = scan("<<<<<<< HEAD\nonly ours\n");
        assert_eq!(regions.len(), 1);
        assert!(regions[0].is_malformed());
        // Trailing newline counts as a final empty line.
        assert_eq!(regions[0].end_line, 3);
        assert_eq!(regions[0].ours, "only ours\n");
    }

    #[test]
    fn test_malformed_after_well_formed() {
        let text = "<<<<<<< a\n1\n=======\n2\n>>>>>>> b\n<<<<<<< c\n3";
        let regions = scan(text);
        assert_eq!(regions.len(), 2);
        assert!(!regions[0].is_malformed());
        assert!(regions[1].is_malformed());
        assert_eq!(regions[1].index, 1);
        assert_eq!(regions[1].end_line, 7);
    }

    #[test]
    fn test_stray_closing_and_separator_outside_are_ignored() {
        let regions = scan("=======\n>>>>>>> x\n|||||||\ntext");
        assert!(regions.is_empty());
    }

    #[test]
    fn test_round_trip_two_way_region() {
        let lines: Vec<&str> = SIMPLE.split('\n').collect();
        let r = &scan(SIMPLE)[0];
        let rebuilt = format!("{}\n=======\n{}", r.ours, r.theirs);
        let original = lines[r.start_line..r.end_line - 1].join("\n");
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_line_count() {
        assert_eq!(line_count(""), 1);
        assert_eq!(line_count("a\nb"), 2);
        assert_eq!(line_count("a\r\nb\r\n"), 3);
    }
}
