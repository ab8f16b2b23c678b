//! `attrib diff`: run the compressed diff over two files on disk.

use std::path::Path;

use anyhow::Context;

use attrib_core::diff;

pub fn cmd_diff(old: &Path, new: &Path) -> anyhow::Result<()> {
    let old_text = std::fs::read_to_string(old)
        .with_context(|| format!("reading {}", old.display()))?;
    let new_text = std::fs::read_to_string(new)
        .with_context(|| format!("reading {}", new.display()))?;

    match render_diff(&old_text, &new_text) {
        Some(rendered) => println!("{rendered}"),
        None => println!("files are identical"),
    }
    Ok(())
}

/// Unified hunks plus a trailing summary line, or `None` for equal inputs.
fn render_diff(old_text: &str, new_text: &str) -> Option<String> {
    let result = diff::diff(old_text, new_text);
    if result.is_empty() {
        return None;
    }
    Some(format!(
        "{}\n{} added, {} removed",
        result.to_unified(),
        result.added_lines,
        result.removed_lines
    ))
}

// ─── Tests ────────────────────────────────────────────────────────
