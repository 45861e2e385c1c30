//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Make
//!
//! ```text
//! image.jpg
//!     Source: /var/www/public/image.jpg (jpeg, 300x300)
//!     resize {"width":100,"height":90,"crop":true}
//!     rotate {"angle":90}
//!     Result: 90x100
//!     Saved: out.png
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 a.jpg → a-filters(100x_).jpg (100x50)
//! 002 missing.jpg
//!     Error: File not found: public/missing.jpg
//!
//! Saved 1 of 2 images, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchSummary};
use crate::chain::FilterStep;
use crate::filters::{FilterRegistry, FilterStage};
use crate::raster::Image;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn dims((width, height): (u32, u32)) -> String {
    format!("{width}x{height}")
}

fn stage_label(stage: FilterStage) -> &'static str {
    match stage {
        FilterStage::Geometry => "geometry",
        FilterStage::Orientation => "orientation",
        FilterStage::Cosmetic => "cosmetic",
    }
}

// ============================================================================
// make / url
// ============================================================================

/// Report one `make`: where the image came from, the steps that ran, the
/// resulting size and, when saved, the output path.
pub fn format_make(
    path: &str,
    opened: &Image,
    steps: &[FilterStep],
    result: &Image,
    saved: Option<&str>,
) -> Vec<String> {
    let mut lines = vec![path.to_string()];

    let mut source = match opened.filepath() {
        Some(p) => format!("{}Source: {}", indent(1), p.display()),
        None => format!("{}Source: {}", indent(1), path),
    };
    match opened.metadata().format {
        Some(format) => source.push_str(&format!(" ({format}, {})", dims(opened.dimensions()))),
        None => source.push_str(&format!(" ({})", dims(opened.dimensions()))),
    }
    lines.push(source);

    for step in steps {
        lines.push(format!("{}{} {}", indent(1), step.name, step.params));
    }
    lines.push(format!("{}Result: {}", indent(1), dims(result.dimensions())));
    if let Some(output) = saved {
        lines.push(format!("{}Saved: {}", indent(1), output));
    }
    lines
}

pub fn print_make(
    path: &str,
    opened: &Image,
    steps: &[FilterStep],
    result: &Image,
    saved: Option<&str>,
) {
    for line in format_make(path, opened, steps, result, saved) {
        println!("{}", line);
    }
}

// ============================================================================
// batch
// ============================================================================

pub fn format_batch_event(index: usize, event: &BatchEvent) -> Vec<String> {
    let header = format!("{} {}", format_index(index), event.path);
    match (&event.result, &event.output) {
        (Ok(size), Some(output)) => vec![format!("{header} → {output} ({})", dims(*size))],
        (Ok(size), None) => vec![format!("{header} ({})", dims(*size))],
        (Err(e), _) => vec![header, format!("{}Error: {}", indent(1), e)],
    }
}

pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    let mut line = format!("Saved {} of {} images", summary.saved, summary.total);
    if !summary.failures.is_empty() {
        line.push_str(&format!(", {} failed", summary.failures.len()));
    }
    vec![line]
}

pub fn print_batch_summary(summary: &BatchSummary) {
    for line in format_batch_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// filters
// ============================================================================

/// One line per registered filter, sorted by name.
pub fn format_filters(registry: &FilterRegistry) -> Vec<String> {
    registry
        .names()
        .into_iter()
        .filter_map(|name| {
            let filter = registry.get(name).ok()?;
            Some(format!("{:<12} {}", name, stage_label(filter.stage())))
        })
        .collect()
}

pub fn print_filters(registry: &FilterRegistry) {
    for line in format_filters(registry) {
        println!("{}", line);
    }
}
