//! Free-text sanitization for user supplied fields.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_TEXT_LENGTH: usize = 1000;

/// Angle brackets, script and data URIs, inline event handlers.
static UNSAFE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[<>]|javascript:|data:|on\w+\s*=").expect("Invalid sanitize regex")
});

/// Strips markup and script vectors, then truncates to `MAX_TEXT_LENGTH`
/// characters and trims. Removal repeats until nothing matches so that
/// fragments joined by a removal (`java<script:`) are caught too, which
/// makes the function idempotent.
pub fn sanitize(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = UNSAFE.replace_all(&current, "");
        if next.len() == current.len() {
            break;
        }
        current = next.into_owned();
    }

    let truncated: String = current.chars().take(MAX_TEXT_LENGTH).collect();
    truncated.trim().to_string()
}

pub fn sanitize_opt(text: Option<&str>) -> Option<String> {
    text.map(sanitize).filter(|s| !s.is_empty())
}
