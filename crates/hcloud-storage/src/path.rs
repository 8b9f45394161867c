//! Validation and normalization of user-supplied names and logical paths.
//!
//! Nothing here touches the filesystem. Every failure is a validation
//! error that names the rejected input.

use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;

/// Longest accepted file or directory name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

const ILLEGAL_NAME_PATTERNS: &[&str] = &["../", "..\\", "<", ">", ":", "\"", "|", "?", "*"];

/// Validate a single file or directory name.
pub fn validate_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "Name is longer than {MAX_NAME_LEN} bytes"
        )));
    }
    if let Some(pattern) = ILLEGAL_NAME_PATTERNS.iter().find(|p| name.contains(*p)) {
        return Err(AppError::validation(format!(
            "Name '{name}' contains illegal sequence '{pattern}'"
        )));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(AppError::validation(format!(
            "Name '{}' must be a single path segment",
            name.escape_default()
        )));
    }
    if name.starts_with('.') {
        return Err(AppError::validation(format!(
            "Name '{name}' must not start with '.'"
        )));
    }
    Ok(())
}

/// Validate a logical path. The literal `/` denotes the user root.
pub fn validate_path(path: &str) -> AppResult<()> {
    if path.is_empty() {
        return Err(AppError::validation("Path cannot be empty"));
    }
    if path == "/" {
        return Ok(());
    }
    if path.contains('\0') {
        return Err(AppError::validation("Path contains a NUL byte"));
    }
    if has_foreign_root(path) {
        return Err(AppError::validation(format!(
            "Path '{path}' must not carry a drive letter or UNC prefix"
        )));
    }
    if segments_of(path).any(|segment| segment == "..") {
        return Err(AppError::validation(format!(
            "Path '{path}' contains a parent reference"
        )));
    }
    Ok(())
}

/// Normalize a logical path into a user-root-relative form.
///
/// Leading separators and a leading drive letter are dropped, `.` and empty
/// segments are removed, and `..` consumes the preceding segment but never
/// climbs above the root. The root itself is the empty string.
pub fn sanitize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in segments_of(path) {
        match segment {
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let mut segments: Vec<String> = segments
        .iter()
        .map(|s| s.replace('\0', ""))
        .filter(|s| is_plain_segment(s))
        .collect();
    // a drive designator only means something in front
    while let Some(first) = segments.first_mut() {
        let rest = strip_drive(first);
        if rest.len() == first.len() {
            break;
        }
        if is_plain_segment(rest) {
            *first = rest.to_string();
        } else {
            segments.remove(0);
        }
    }
    segments.join("/")
}

/// Join a sanitized parent path and a name.
pub fn join_logical(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Split a sanitized path into its parent path and final segment.
pub fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

/// Longest prefix of `s` that is at most `max_len` bytes and ends on a
/// character boundary.
pub fn prefix_within(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Shorten `name` to at most `max_len` bytes.
///
/// The stem is cut and the extension kept, unless the extension alone
/// would not leave room for a stem.
pub fn truncate_name(name: &str, max_len: usize) -> String {
    if name.len() <= max_len {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() + 1 < max_len => {
            let stem = prefix_within(stem, max_len - ext.len() - 1);
            format!("{stem}.{ext}")
        }
        _ => prefix_within(name, max_len).to_string(),
    }
}

fn has_foreign_root(path: &str) -> bool {
    path.starts_with("\\\\") || strip_drive(path).len() != path.len()
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".."
}

fn strip_drive(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        &path[2..]
    } else {
        path
    }
}

fn segments_of(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
}
