//! Shell-style wildcard matching for the final path component.

use regex_lite::Regex;
use std::path::{Path, PathBuf};

/// Splits a glob pattern into its directory and file-name pattern.
///
/// Wildcards are only honoured in the final component.
pub fn split_pattern(pattern: &Path) -> (PathBuf, String) {
    let dir = pattern
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));
    let name = pattern
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, name)
}

/// Whether `name` matches a pattern using `*` and `?` wildcards.
pub fn glob_matches(pattern: &str, name: &str) -> bool {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex_lite::escape(&other.to_string())),
        }
    }
    expr.push('$');

    Regex::new(&expr)
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_matches_sequence_pattern() {
        let pattern = "2010_01_01_10:00:00_*.*";
        assert!(glob_matches(pattern, "2010_01_01_10:00:00_0000.jpg"));
        assert!(glob_matches(pattern, "2010_01_01_10:00:00_0012.mov"));
        assert!(!glob_matches(pattern, "2010_01_01_10:00:00_0000"));
        assert!(!glob_matches(pattern, "2010_01_01_10:00:01_0000.jpg"));
    }

    #[test]
    fn test_glob_matches_escapes_regex_chars() {
        assert!(glob_matches("a+b.(1)?", "a+b.(1)x"));
        assert!(!glob_matches("a.b", "axb"));
    }

    #[test]
    fn test_split_pattern() {
        let (dir, name) = split_pattern(Path::new("/2010/01/prefix_*.*"));
        assert_eq!(dir, PathBuf::from("/2010/01"));
        assert_eq!(name, "prefix_*.*");
    }
}
