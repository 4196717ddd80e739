use crate::error::{ErrorKind, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

regex!(RESERVED_CHARS_REGEX, r#"[<>:"/\\|?*\x00-\x1f\x7f]"#);
regex!(WHITESPACE_REGEX, r"\s+");

/// Most filesystems cap a single path component at 255 bytes.
const MAX_NAME_BYTES: usize = 255;

/// Turn a naming service reply into a usable file name.
///
/// Only the first non-blank line is considered. Wrapping quotes and any
/// directory part are dropped, characters that are reserved on common
/// filesystems become `_`, and the original extension is appended when the
/// proposal does not already end with it.
///
/// ```
/// use renamer_naming::finalize_name;
///
/// assert_eq!(finalize_name("\"Quarterly Report\"", "q3.pdf").unwrap(), "Quarterly Report.pdf");
/// assert_eq!(finalize_name("beach/sunset.JPG", "IMG_0001.jpg").unwrap(), "sunset.JPG");
/// assert!(finalize_name("  ...  ", "a.txt").is_err());
/// ```
pub fn finalize_name(proposal: &str, original_name: &str) -> Result<String> {
    let line = proposal.lines().map(str::trim).find(|line| !line.is_empty()).unwrap_or_default();
    let unquoted = line.trim_matches(|c: char| matches!(c, '"' | '\'' | '`') || c.is_whitespace());
    let last_segment = unquoted.rsplit(['/', '\\']).next().unwrap_or_default();
    // Whitespace first: tabs and newlines fall inside the control range.
    let collapsed = WHITESPACE_REGEX.replace_all(last_segment, " ");
    let replaced = RESERVED_CHARS_REGEX.replace_all(&collapsed, "_");
    let stem = replaced.trim_matches(|c: char| c == '.' || c == ' ');
    if stem.is_empty() || stem.chars().all(|c| c == '_') {
        exn::bail!(ErrorKind::InvalidName(proposal.to_string()));
    }

    let suffix = match Path::new(original_name).extension().and_then(|e| e.to_str()) {
        Some(extension) if !stem.to_lowercase().ends_with(&format!(".{}", extension.to_lowercase())) => {
            format!(".{extension}")
        },
        _ => String::new(),
    };
    let budget = MAX_NAME_BYTES.saturating_sub(suffix.len());
    Ok(format!("{}{suffix}", truncate(stem, budget).trim_end()))
}

fn truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
