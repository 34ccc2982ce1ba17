//! CLI output formatting for all commands.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every page is shown
//! by its positional index and title, with its route or output file as
//! secondary context after `→`. Details follow on indented lines.
//!
//! # Output Format
//!
//! ## Export
//!
//! ```text
//! Pages: 12
//! Site settings: yes
//! Images: 31 referenced, 30 downloaded (14.2 MB)
//!     Failed: /uploads/missing.jpg
//! ```
//!
//! ## Enrich
//!
//! ```text
//! 42 references enriched from 30/31 optimized images (0 stale, 1 not optimized)
//!     Not optimized: new-work.jpg
//! ```
//!
//! ## Build
//!
//! ```text
//! Home → index.html
//! 001 Dawn Series → dawn-series/index.html
//!     3 figures, 1 video
//! 002 Untitled → skipped (no slug)
//! Generated 1 page into dist
//! ```
//!
//! ## Check
//!
//! ```text
//! Content from snapshot
//! Ongoing
//!     001 Dawn Series → /dawn-series/
//!         5 blocks: 3 figures, 1 video
//! Checked 1 page, 0 problems
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::content::Origin;
use crate::enrich::EnrichSummary;
use crate::export::ExportSummary;
use crate::generate::{BuildSummary, PageStats};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 page`, `2 pages`.
fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Human-readable byte count.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Comma-joined media counts for a page, e.g. `3 figures, 1 video`.
fn media_line(stats: &PageStats) -> String {
    let mut parts = Vec::new();
    if stats.figures > 0 {
        parts.push(plural(stats.figures, "figure"));
    }
    if stats.videos > 0 {
        parts.push(plural(stats.videos, "video"));
    }
    if stats.placeholders > 0 {
        parts.push(plural(stats.placeholders, "placeholder"));
    }
    if parts.is_empty() {
        "text only".to_string()
    } else {
        parts.join(", ")
    }
}

fn page_problems(stats: &PageStats) -> usize {
    stats.placeholders + stats.dropped() + usize::from(stats.slug.is_none())
}

// ============================================================================
// Export
// ============================================================================

pub fn format_export(summary: &ExportSummary) -> Vec<String> {
    let mut lines = vec![
        format!("Pages: {}", summary.pages),
        format!(
            "Site settings: {}",
            if summary.has_site { "yes" } else { "no" }
        ),
        format!(
            "Images: {} referenced, {} downloaded ({})",
            summary.images_found,
            summary.downloaded,
            format_bytes(summary.bytes)
        ),
    ];
    for url in &summary.failed {
        lines.push(format!("{}Failed: {}", indent(1), url));
    }
    lines
}

pub fn print_export(summary: &ExportSummary) {
    for line in format_export(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Enrich
// ============================================================================

pub fn format_enrich(summary: &EnrichSummary) -> Vec<String> {
    let mut lines = vec![summary.to_string()];
    for name in &summary.stale {
        lines.push(format!("{}Stale: {}", indent(1), name));
    }
    for name in &summary.uncached {
        lines.push(format!("{}Not optimized: {}", indent(1), name));
    }
    if summary.updated() == 0 {
        lines.push("Snapshot unchanged".to_string());
    }
    lines
}

pub fn print_enrich(summary: &EnrichSummary) {
    for line in format_enrich(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build(summary: &BuildSummary) -> Vec<String> {
    let mut lines = vec!["Home \u{2192} index.html".to_string()];
    for (i, stats) in summary.pages.iter().enumerate() {
        let header = format!("{} {}", format_index(i + 1), stats.title);
        match &stats.slug {
            Some(slug) if !summary.skipped.contains(&stats.title) => {
                lines.push(format!("{} \u{2192} {}/index.html", header, slug));
                lines.push(format!("{}{}", indent(1), media_line(stats)));
            }
            _ => lines.push(format!("{} \u{2192} skipped (no slug)", header)),
        }
    }
    if summary.images_copied > 0 {
        lines.push(format!("Copied {}", plural(summary.images_copied, "image")));
    }
    lines.push(format!(
        "Generated {} into {}",
        plural(summary.written, "page"),
        summary.output_dir.display()
    ));
    lines
}

pub fn print_build(summary: &BuildSummary) {
    for line in format_build(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Content inventory grouped by sidebar label, in first-seen group order.
///
/// Pages without a group are listed under `Ungrouped`.
pub fn format_check(origin: Origin, pages: &[PageStats]) -> Vec<String> {
    let mut lines = vec![match origin {
        Origin::Cms => "Content from CMS".to_string(),
        Origin::Snapshot => "Content from snapshot".to_string(),
    }];

    let mut labels: Vec<&str> = Vec::new();
    for stats in pages {
        let label = stats.group.as_deref().unwrap_or("Ungrouped");
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    let mut problems = 0;
    for label in labels {
        lines.push(label.to_string());
        let members = pages
            .iter()
            .filter(|s| s.group.as_deref().unwrap_or("Ungrouped") == label);
        for (i, stats) in members.enumerate() {
            let route = match &stats.slug {
                Some(slug) => format!("/{}/", slug),
                None => "(no slug)".to_string(),
            };
            lines.push(format!(
                "{}{} {} \u{2192} {}",
                indent(1),
                format_index(i + 1),
                stats.title,
                route
            ));
            lines.push(format!(
                "{}{}: {}",
                indent(2),
                plural(stats.blocks, "block"),
                media_line(stats)
            ));
            if stats.dropped() > 0 {
                lines.push(format!(
                    "{}{} not rendered",
                    indent(2),
                    plural(stats.dropped(), "block")
                ));
            }
            problems += page_problems(stats);
        }
    }

    lines.push(format!(
        "Checked {}, {}",
        plural(pages.len(), "page"),
        plural(problems, "problem")
    ));
    lines
}

pub fn print_check(origin: Origin, pages: &[PageStats]) {
    for line in format_check(origin, pages) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
