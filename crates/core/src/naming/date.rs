//! Capture-date extraction from file names.

use chrono::NaiveDateTime;
use regex_lite::Regex;
use std::path::Path;

use super::error::NamingError;

/// A single date rule: a prefix pattern and the layout used to parse the match.
///
/// `layout` uses `chrono` strftime syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormat {
    pub pattern: &'static str,
    pub layout: &'static str,
}

/// Rules recognised out of the box, tried in order.
pub const DEFAULT_DATE_FORMATS: &[DateFormat] = &[
    // Already organized: 2010_01_10_06:57:48_0000.jpg
    DateFormat {
        pattern: r"^\d{4}_\d{2}_\d{2}_\d{2}:\d{2}:\d{2}",
        layout: "%Y_%m_%d_%H:%M:%S",
    },
    DateFormat {
        pattern: r"^\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}",
        layout: "%Y-%m-%d_%H-%M-%S",
    },
    DateFormat {
        pattern: r"^\d{4}-\d{2}-\d{2}\s+\d{2}\.\d{2}\.\d{2}",
        layout: "%Y-%m-%d %H.%M.%S",
    },
    DateFormat {
        pattern: r"^\d{8}_\d{6}",
        layout: "%Y%m%d_%H%M%S",
    },
    // Android camera
    DateFormat {
        pattern: r"^IMG_\d{8}_\d{6}",
        layout: "IMG_%Y%m%d_%H%M%S",
    },
    DateFormat {
        pattern: r"^VID_\d{8}_\d{6}",
        layout: "VID_%Y%m%d_%H%M%S",
    },
];

struct CompiledFormat {
    regex: Regex,
    layout: &'static str,
}

/// Matches file names against an ordered list of [`DateFormat`] rules.
///
/// The first rule whose pattern matches wins. A name that matches a pattern
/// but holds an impossible timestamp (month 13, say) parses to the zero
/// timestamp `1970-01-01 00:00:00` rather than failing.
pub struct DateMatcher {
    formats: Vec<CompiledFormat>,
}

impl Default for DateMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DateMatcher {
    /// Creates a matcher with [`DEFAULT_DATE_FORMATS`].
    pub fn new() -> Self {
        let formats = DEFAULT_DATE_FORMATS
            .iter()
            .filter_map(|f| {
                Regex::new(f.pattern).ok().map(|regex| CompiledFormat {
                    regex,
                    layout: f.layout,
                })
            })
            .collect();
        Self { formats }
    }

    /// Creates a matcher with a custom rule list.
    pub fn with_formats(formats: &[DateFormat]) -> Result<Self, NamingError> {
        let formats = formats
            .iter()
            .map(|f| {
                Regex::new(f.pattern)
                    .map(|regex| CompiledFormat {
                        regex,
                        layout: f.layout,
                    })
                    .map_err(|e| NamingError::InvalidPattern {
                        pattern: f.pattern.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { formats })
    }

    /// Number of rules in this matcher.
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Extracts the capture timestamp encoded at the start of a file name.
    ///
    /// Only the final path component is considered.
    pub fn find(&self, filename: impl AsRef<Path>) -> Result<NaiveDateTime, NamingError> {
        let name = filename
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        for format in &self.formats {
            if let Some(m) = format.regex.find(&name) {
                // Collapse whitespace runs so a single-space layout still parses
                let matched = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
                return Ok(
                    NaiveDateTime::parse_from_str(&matched, format.layout).unwrap_or_default()
                );
            }
        }

        Err(NamingError::UnknownDateFormat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_find_known_formats() {
        let matcher = DateMatcher::new();
        let cases = [
            ("2010_01_10_06:57:48_0000.jpg", at(2010, 1, 10, 6, 57, 48)),
            ("2010-08-08 14.26.21.jpg", at(2010, 8, 8, 14, 26, 21)),
            ("2012-06-25_16-58-20_209.jpg", at(2012, 6, 25, 16, 58, 20)),
            ("20160529_102009", at(2016, 5, 29, 10, 20, 9)),
            ("IMG_20130525_125511_332", at(2013, 5, 25, 12, 55, 11)),
            ("VID_20130525_125511_332", at(2013, 5, 25, 12, 55, 11)),
        ];
        for (input, want) in cases {
            assert_eq!(matcher.find(input).unwrap(), want, "input {}", input);
        }
    }

    #[test]
    fn test_find_unknown_format() {
        let matcher = DateMatcher::new();
        assert!(matches!(
            matcher.find("Vfoo"),
            Err(NamingError::UnknownDateFormat)
        ));
        assert!(matches!(
            matcher.find("holiday.jpg"),
            Err(NamingError::UnknownDateFormat)
        ));
    }

    #[test]
    fn test_find_uses_basename_only() {
        let matcher = DateMatcher::new();
        let got = matcher.find("/20160529_102009/IMG_20130525_125511.jpg").unwrap();
        assert_eq!(got, at(2013, 5, 25, 12, 55, 11));
        assert!(matcher.find("/20160529_102009/holiday.jpg").is_err());
    }

    #[test]
    fn test_find_collapses_whitespace() {
        let matcher = DateMatcher::new();
        let got = matcher.find("2010-08-08   14.26.21.jpg").unwrap();
        assert_eq!(got, at(2010, 8, 8, 14, 26, 21));
    }

    #[test]
    fn test_find_impossible_date_is_zero() {
        let matcher = DateMatcher::new();
        let got = matcher.find("20101345_250000.jpg").unwrap();
        assert_eq!(got, NaiveDateTime::default());
        assert_eq!(got, at(1970, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_rule_order_does_not_change_results() {
        let reversed: Vec<DateFormat> = DEFAULT_DATE_FORMATS.iter().rev().copied().collect();
        let forward = DateMatcher::new();
        let backward = DateMatcher::with_formats(&reversed).unwrap();
        for input in [
            "2010_01_10_06:57:48_0000.jpg",
            "2010-08-08 14.26.21.jpg",
            "2012-06-25_16-58-20_209.jpg",
            "20160529_102009",
            "IMG_20130525_125511_332",
        ] {
            assert_eq!(forward.find(input).unwrap(), backward.find(input).unwrap());
        }
    }

    #[test]
    fn test_with_formats_invalid_pattern() {
        let result = DateMatcher::with_formats(&[DateFormat {
            pattern: r"^(\d{4}",
            layout: "%Y",
        }]);
        assert!(matches!(result, Err(NamingError::InvalidPattern { .. })));
    }

    #[test]
    fn test_default_matcher_has_all_rules() {
        assert_eq!(DateMatcher::new().len(), DEFAULT_DATE_FORMATS.len());
    }
}
