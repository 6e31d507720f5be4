//! Per-prefix sequence number allocation.

use std::path::Path;
use tracing::debug;

use crate::fs::FileSystem;

use super::error::NamingError;

/// Picks the next free `prefix_NNNN` name in `dir`.
///
/// Existing files matching `prefix_*.*` are listed and sorted; the number
/// after the prefix of the last one, plus one, is returned zero-padded to
/// four digits. With no matches the result is `prefix_0000`. A missing
/// directory counts as no matches.
///
/// Ordering is lexicographic, so sequences past `9999` are not allocated
/// correctly. A suffix that cannot be incremented, or a result that names an
/// existing file, is an error rather than a guess. The caller must not allocate concurrently for the same
/// directory and prefix; nothing is reserved until the file is renamed.
pub async fn allocate_sequence(
    fs: &dyn FileSystem,
    dir: &Path,
    prefix: &str,
) -> Result<String, NamingError> {
    let pattern = dir.join(format!("{}_*.*", prefix));
    let mut matches = fs.glob(&pattern).await?;
    matches.sort();

    let next = match matches.last() {
        Some(last) => {
            let last = parse_sequence(last, prefix).unwrap_or(0);
            last.checked_add(1)
                .ok_or_else(|| NamingError::SequenceOverflow {
                    prefix: prefix.to_string(),
                    last,
                })?
        }
        None => 0,
    };
    let name = format!("{}_{:04}", prefix, next);
    if matches
        .iter()
        .any(|path| path.file_stem().and_then(|s| s.to_str()) == Some(name.as_str()))
    {
        return Err(NamingError::SequenceTaken { name });
    }

    debug!(
        "Allocated sequence {:04} for {:?} in {:?} ({} existing)",
        next,
        prefix,
        dir,
        matches.len()
    );

    Ok(name)
}

fn parse_sequence(path: &Path, prefix: &str) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(prefix)?
        .strip_prefix('_')?
        .parse()
        .ok()
}
