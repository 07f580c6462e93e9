//! CLI output formatting for resolve runs.
//!
//! Output is information-centric: the primary display for every
//! placeholder is its template and the width decision, with the resolved
//! URL as an indented context line. A summary line closes the listing
//! with the cache/fetch tally.
//!
//! ```text
//! Placeholders
//! 001 /image/1/800/600/photos/dawn.jpg
//!     Width: 300 → 320
//!     Resolved: /image/1/320/0/photos/dawn.jpg
//! 002 /image/2/800/600/1/photos/dusk.jpg
//!     Width: 700 → 1440
//!     Resolved: /image/2/1440/1080/1/photos/dusk.jpg
//!
//! Resolved 2 placeholders, 0 cached (high density)
//! ```
//!
//! # Architecture
//!
//! [`format_resolve_output`] returns `Vec<String>` for testability and
//! [`print_resolve_output`] writes it to stdout. Format functions are
//! pure — no I/O, no side effects.

use crate::manifest::ResolveReport;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Format the resolve listing as lines, one placeholder per entry.
pub fn format_resolve_output(report: &ResolveReport) -> Vec<String> {
    let mut lines = vec!["Placeholders".to_string()];

    for (position, entry) in report.entries.iter().enumerate() {
        lines.push(format!("{} {}", format_index(position + 1), entry.template));
        lines.push(format!(
            "    Width: {} → {}",
            entry.rendered_width, entry.selected_width
        ));
        let label = if entry.background {
            "Background"
        } else {
            "Resolved"
        };
        lines.push(format!("    {}: {}", label, entry.resolved_url));
    }

    lines.push(String::new());
    lines.push(summary_line(report));
    lines
}

/// The closing tally: entry count, cache hits, fetches, density.
fn summary_line(report: &ResolveReport) -> String {
    let mut line = format!(
        "Resolved {} placeholder{}, {} cached",
        report.entries.len(),
        if report.entries.len() == 1 { "" } else { "s" },
        report.cache_hits,
    );
    if report.fetches > 0 {
        line.push_str(&format!(", {} fetched", report.fetches));
    }
    if report.high_density {
        line.push_str(" (high density)");
    }
    line
}

/// Print the resolve listing to stdout.
pub fn print_resolve_output(report: &ResolveReport) {
    for line in format_resolve_output(report) {
        println!("{line}");
    }
}
