//! Predicates and formatters for the canonical library layout.

use chrono::NaiveDateTime;
use std::path::{Component, Path, PathBuf};

/// strftime layout of the timestamp part of an organized file name.
pub const NAME_LAYOUT: &str = "%Y_%m_%d_%H:%M:%S";

/// Shape of an organized file name stem: `#` is any ASCII digit.
const NAME_TEMPLATE: &[u8] = b"####_##_##_##:##:##_####";

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

/// Whether `dir` is a `/YYYY/MM` or `/YYYY/MM/DD` directory.
pub fn is_date_dir(dir: &Path) -> bool {
    let mut parts = Vec::new();
    for component in dir.components() {
        match component {
            Component::RootDir => {}
            Component::Normal(part) => match part.to_str() {
                Some(s) => parts.push(s),
                None => return false,
            },
            _ => return false,
        }
    }

    match parts.as_slice() {
        [year, month] => is_digits(year, 4) && is_digits(month, 2),
        [year, month, day] => is_digits(year, 4) && is_digits(month, 2) && is_digits(day, 2),
        _ => false,
    }
}

/// Whether a file name starts with `YYYY_MM_DD_HH:MM:SS_NNNN`.
pub fn is_canonical_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.len() < NAME_TEMPLATE.len() {
        return false;
    }
    let shape_ok = NAME_TEMPLATE
        .iter()
        .zip(bytes)
        .all(|(t, b)| if *t == b'#' { b.is_ascii_digit() } else { t == b });

    shape_ok && matches!(bytes.get(NAME_TEMPLATE.len()), None | Some(b'.'))
}

/// Whether a root-relative path is already in its organized place.
pub fn is_organized(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str());
    match (path.parent(), name) {
        (Some(dir), Some(name)) => is_date_dir(dir) && is_canonical_name(name),
        _ => false,
    }
}

/// Directory an item captured at `timestamp` belongs in.
pub fn target_dir(timestamp: &NaiveDateTime, day_dirs: bool) -> PathBuf {
    let layout = if day_dirs { "/%Y/%m/%d" } else { "/%Y/%m" };
    PathBuf::from(timestamp.format(layout).to_string())
}

/// File name prefix for an item captured at `timestamp`, before the sequence.
pub fn name_prefix(timestamp: &NaiveDateTime) -> String {
    timestamp.format(NAME_LAYOUT).to_string()
}

/// The lowercased extension of `path` including the dot, or an empty string.
pub fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}
