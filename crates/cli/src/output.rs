//! Human-readable table rendering of conflict reports.

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use mergescan_core::{ConflictBlock, ConflictReport, FileReport, FileType};

use crate::style;

/// Widest side preview shown in a block table cell.
const PREVIEW_WIDTH: usize = 40;

/// Print a repository report: per-file overview, then one block table per
/// scanned text file.
pub fn print_report(report: &ConflictReport) {
    println!();
    println!(
        "{}",
        style::header(&format!(
            "{} of {} into {}",
            report.merge_type, report.branches.incoming, report.branches.current
        ))
    );
    println!();

    if report.is_clean() {
        println!("{}", style::success("No conflicted files"));
        println!();
        return;
    }

    println!("{}", files_table(&report.files));
    println!();

    for file in report.files.iter().filter(|f| !f.blocks.is_empty()) {
        print_blocks(file);
    }

    let summary = &report.summary;
    println!(
        "{} auto, {} complex, {} binary, {} lock",
        summary.auto, summary.complex, summary.binary, summary.lock
    );
    println!();
}

/// Print the report for a single file.
pub fn print_file(file: &FileReport) {
    println!();
    match file.file_type {
        FileType::Text if file.blocks.is_empty() => {
            println!("{}", style::success(&format!("{}: no conflict markers", file.path)));
            println!();
        }
        FileType::Text => print_blocks(file),
        _ => {
            println!("{}", files_table(std::slice::from_ref(file)));
            println!();
        }
    }
}

fn print_blocks(file: &FileReport) {
    println!(
        "{}",
        style::header(&format!("{} ({} blocks)", file.path, file.blocks.len()))
    );
    if let Some(warning) = &file.encoding_warning {
        println!("{}", style::warn(warning));
    }
    println!("{}", blocks_table(&file.blocks));
    println!();
}

pub fn files_table(files: &[FileReport]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "Type", "Blocks", "Auto", "Complex", "Note"]);

    for f in files {
        let count = |n: Option<usize>| n.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
        let note = f
            .error
            .as_deref()
            .or(f.suggestion.as_deref())
            .or(f.encoding_warning.as_deref())
            .unwrap_or("");
        table.add_row(vec![
            Cell::new(&f.path),
            Cell::new(f.file_type),
            Cell::new(f.blocks.len()),
            Cell::new(count(f.auto_count)),
            Cell::new(count(f.complex_count)),
            Cell::new(note),
        ]);
    }
    table
}

pub fn blocks_table(blocks: &[ConflictBlock]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Lines", "Classification", "Ours", "Theirs"]);

    for b in blocks {
        let region = &b.region;
        let mut tag = b.classification.to_string();
        if region.is_malformed() {
            tag.push_str(" (malformed)");
        }
        table.add_row(vec![
            Cell::new(region.index),
            Cell::new(format!("{}-{}", region.start_line, region.end_line)),
            Cell::new(tag).fg(style::tag_color(b.classification, region.is_malformed())),
            Cell::new(preview(&region.ours)),
            Cell::new(preview(&region.theirs)),
        ]);
    }
    table
}

/// First line of a section, truncated, with a count of hidden lines.
fn preview(section: &str) -> String {
    let mut lines = section.lines();
    let first = lines.next().unwrap_or("");
    let rest = lines.count();
    let first = truncate(first, PREVIEW_WIDTH);
    if rest > 0 {
        format!("{first} (+{rest} lines)")
    } else {
        first
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
