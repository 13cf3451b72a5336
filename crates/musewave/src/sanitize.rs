//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Prompts and lyrics are user content; spans only ever carry a truncated
//! prompt and file names, never full paths.

use std::path::Path;

const PROMPT_PREVIEW_CHARS: usize = 48;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Truncates a prompt to a short single-line preview.
///
/// - `"dark techno with rolling bass"` → unchanged
/// - a 200 char prompt → first 48 chars followed by `…`
pub fn redact_prompt(prompt: &str) -> String {
    let single_line: String = prompt
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if single_line.chars().count() <= PROMPT_PREVIEW_CHARS {
        return single_line;
    }

    let mut preview: String = single_line.chars().take(PROMPT_PREVIEW_CHARS).collect();
    preview.push('…');
    preview
}
