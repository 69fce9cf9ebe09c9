//! Terminal styling for status lines and classification tags.

use comfy_table::Color;
use console::Style;

use mergescan_core::Classification;

fn marked(mark: &str, mark_style: Style, msg: &str) -> String {
    format!("{} {}", mark_style.apply_to(mark), msg)
}

/// Green check mark, for clean files and finished commands.
pub fn success(msg: &str) -> String {
    marked("✓", Style::new().green(), msg)
}

/// Red cross, for failures printed to stderr.
pub fn error(msg: &str) -> String {
    marked("✗", Style::new().red(), msg)
}

/// Yellow sign, for encoding fallbacks and ignored settings.
pub fn warn(msg: &str) -> String {
    marked("⚠", Style::new().yellow(), msg)
}

/// Report and file titles.
pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// Cell colour for a block's tag: green when a resolver may apply it
/// mechanically, yellow for a side-picking decision, red for `complex`.
/// Malformed blocks are always red.
pub fn tag_color(tag: Classification, malformed: bool) -> Color {
    if malformed || tag == Classification::Complex {
        Color::Red
    } else if tag.is_auto_resolvable() {
        Color::Green
    } else {
        Color::Yellow
    }
}
