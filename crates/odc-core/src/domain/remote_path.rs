//! Textual helpers for remote drive paths
//!
//! Remote paths are `/`-separated and absolute from the drive root. The root
//! itself is the empty string; every other path starts with `/`
//! (e.g. `/Documents/report.pdf`).

/// Normalize a textual path into its segments.
///
/// Empty segments and `.` are dropped, `..` pops the previous segment and is
/// ignored at the root. The input is treated as absolute.
pub fn normalize_segments(path: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }
    segments
}

/// Build the absolute form of `text` as seen from the folder at `current`.
///
/// `text` starting with `/` is absolute; anything else is appended to
/// `current` before normalization.
pub fn absolutize(current: &str, text: &str) -> Vec<String> {
    if text.starts_with('/') {
        normalize_segments(text)
    } else {
        normalize_segments(&format!("{current}/{text}"))
    }
}

/// Join normalized segments back into a remote path (`""` for the root).
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", s.as_ref()))
        .collect::<String>()
}

/// Join a parent path and a child name.
pub fn child_path(parent: &str, name: &str) -> String {
    format!("{parent}/{name}")
}

/// Split a path into its parent path and base name.
///
/// Returns `None` for the root.
pub fn split_parent(path: &str) -> Option<(String, String)> {
    let mut segments = normalize_segments(path);
    let name = segments.pop()?;
    Some((join_segments(&segments), name))
}

/// Normalize a user- or server-supplied path to canonical form.
pub fn canonical(path: &str) -> String {
    join_segments(&normalize_segments(path))
}

/// Whether a single path segment looks like an API version (`v1.0`, `V2.13`).
///
/// Graph routes requests whose path contains such a segment to the wrong API
/// version, so these folders cannot be addressed with `root:/path:` syntax.
pub fn is_version_segment(segment: &str) -> bool {
    let Some(rest) = segment
        .strip_prefix('v')
        .or_else(|| segment.strip_prefix('V'))
    else {
        return false;
    };
    let Some((major, minor)) = rest.split_once('.') else {
        return false;
    };
    !major.is_empty()
        && !minor.is_empty()
        && major.bytes().all(|b| b.is_ascii_digit())
        && minor.bytes().all(|b| b.is_ascii_digit())
}

/// Whether any segment of `path` would trip the version-routing defect.
pub fn has_version_segment(path: &str) -> bool {
    path.split('/').any(is_version_segment)
}

/// Validate a base name for a new or renamed item.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/')
}
