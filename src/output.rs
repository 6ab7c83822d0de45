//! CLI output formatting for `imagevault render`.
//!
//! # Output Format
//!
//! ```text
//! Source
//!     http://img.test/a.jpg?size=large
//!     Fetched: https://img.test/a.jpg?size=large (482113 bytes)
//! Resize
//!     Original: 3000x2000
//!     Factor: 428x285
//!     Budget: unchanged
//! Output
//!     428x285 RGB, 365940 bytes → a.rgb
//! ```
//!
//! Stage lines show the size each stage produced, or `unchanged` when the
//! stage was skipped. The fetched line is shown only when a fallback candidate
//! delivered, otherwise the byte count goes on the source line.
//!
//! # Architecture
//!
//! [`format_render_summary`] returns `Vec<String>` for testability and
//! [`print_render_summary`] writes it to stdout. The format function is pure:
//! no I/O, no side effects.

use crate::render::Rendered;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn size(dims: (u32, u32)) -> String {
    format!("{}x{}", dims.0, dims.1)
}

fn stage_line(label: &str, target: Option<(u32, u32)>) -> String {
    match target {
        Some(dims) => format!("{}{label}: {}", indent(1), size(dims)),
        None => format!("{}{label}: unchanged", indent(1)),
    }
}

/// Format the summary of one render.
pub fn format_render_summary(requested: &str, rendered: &Rendered, out: Option<&Path>) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Source".to_string());
    if rendered.source == requested {
        lines.push(format!(
            "{}{requested} ({} bytes)",
            indent(1),
            rendered.fetched_bytes
        ));
    } else {
        lines.push(format!("{}{requested}", indent(1)));
        lines.push(format!(
            "{}Fetched: {} ({} bytes)",
            indent(1),
            rendered.source,
            rendered.fetched_bytes
        ));
    }

    lines.push("Resize".to_string());
    lines.push(format!("{}Original: {}", indent(1), size(rendered.original_size())));
    lines.push(stage_line("Factor", rendered.plan.stage1_resize()));
    lines.push(stage_line("Budget", rendered.plan.stage2_resize()));

    lines.push("Output".to_string());
    let image = &rendered.image;
    let detail = format!(
        "{} RGB, {} bytes",
        size((image.width, image.height)),
        image.data.len()
    );
    match out {
        Some(path) => lines.push(format!("{}{detail} → {}", indent(1), path.display())),
        None => lines.push(format!("{}{detail}", indent(1))),
    }

    lines
}

pub fn print_render_summary(requested: &str, rendered: &Rendered, out: Option<&Path>) {
    for line in format_render_summary(requested, rendered, out) {
        println!("{line}");
    }
}
