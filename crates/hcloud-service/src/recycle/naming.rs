//! Alternate names for restores that would collide.

use hcloud_storage::path::{MAX_NAME_LEN, prefix_within};

/// Candidate name for restore attempt `attempt`.
///
/// Attempt 0 is the original name. Later attempts insert `_restored{N}`
/// before the extension (`report_restored1.pdf`) when `keep_extension` is
/// set, and append it otherwise. The stem is cut so candidates never exceed
/// [`MAX_NAME_LEN`].
pub(crate) fn restored_name(name: &str, attempt: u32, keep_extension: bool) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    let suffix = format!("_restored{attempt}");
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext))
            if keep_extension
                && !stem.is_empty()
                && !ext.is_empty()
                && ext.len() + 1 + suffix.len() < MAX_NAME_LEN =>
        {
            (stem, &name[stem.len()..])
        }
        _ => (name, ""),
    };
    let stem = prefix_within(stem, MAX_NAME_LEN - suffix.len() - ext.len());
    format!("{stem}{suffix}{ext}")
}
