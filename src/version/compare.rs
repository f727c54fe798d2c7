//! Junos version ordering.
//!
//! Versions are compared loosely: the string is split into runs of digits,
//! runs of lowercase letters and runs of anything else, dots are dropped,
//! and the resulting segments are compared left to right. The service
//! release marker `-S` is folded to `00` first so that `22.4R3-S6` sorts
//! after `22.4R3-S5` and `18.4R3-S9` before `18.4R3-S10`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Result of comparing two optional versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionOrdering {
    /// Left is newer.
    Greater,
    /// Both are the same release.
    Equal,
    /// Left is older.
    Less,
    /// At least one side is unknown.
    Undefined,
}

impl VersionOrdering {
    /// Swaps the operands.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Greater => Self::Less,
            Self::Less => Self::Greater,
            other => other,
        }
    }
}

impl From<Ordering> for VersionOrdering {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Greater => Self::Greater,
            Ordering::Equal => Self::Equal,
            Ordering::Less => Self::Less,
        }
    }
}

impl fmt::Display for VersionOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Greater => ">",
            Self::Equal => "=",
            Self::Less => "<",
            Self::Undefined => "?",
        };
        write!(f, "{symbol}")
    }
}

/// Compares two versions.
///
/// Returns [`VersionOrdering::Undefined`] when either side is absent.
#[must_use]
pub fn compare_version(left: Option<&str>, right: Option<&str>) -> VersionOrdering {
    match (left, right) {
        (Some(left), Some(right)) => {
            let left = normalize(left);
            let right = normalize(right);
            segments(&left).cmp(&segments(&right)).into()
        }
        _ => VersionOrdering::Undefined,
    }
}

fn normalize(version: &str) -> String {
    version.trim().replace("-S", "00")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Digit,
    Lower,
    Dot,
    Other,
}

impl CharClass {
    const fn of(c: char) -> Self {
        match c {
            '0'..='9' => Self::Digit,
            'a'..='z' => Self::Lower,
            '.' => Self::Dot,
            _ => Self::Other,
        }
    }
}

/// A comparable piece of a version string.
#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    /// Digits with leading zeros removed.
    Number(&'a str),
    Text(&'a str),
}

impl Ord for Segment<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // Arbitrary length digit runs: longer is larger, then lexical.
            (Self::Number(a), Self::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Segment<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn segments(version: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = version;

    while let Some(first) = rest.chars().next() {
        let class = CharClass::of(first);
        let end = rest
            .find(|c| CharClass::of(c) != class)
            .unwrap_or(rest.len());
        let (token, tail) = rest.split_at(end);
        match class {
            CharClass::Digit => out.push(Segment::Number(token.trim_start_matches('0'))),
            CharClass::Lower | CharClass::Other => out.push(Segment::Text(token)),
            CharClass::Dot => {}
        }
        rest = tail;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "18.4R3-S9",
        "18.4R3-S10",
        "18.4R3-S9.2",
        "20.4R3.8",
        "21.4R3-S5.4",
        "22.4R3-S5",
        "22.4R3-S6",
        "22.4R3-S6.5",
        "15.1X49-D230",
        "15.1X49-D240",
        "23.2R1",
    ];

    fn cmp(left: &str, right: &str) -> VersionOrdering {
        compare_version(Some(left), Some(right))
    }

    #[test]
    fn test_service_release_ordering() {
        assert_eq!(cmp("22.4R3-S6", "22.4R3-S5"), VersionOrdering::Greater);
        assert_eq!(cmp("18.4R3-S9", "18.4R3-S10"), VersionOrdering::Less);
        assert_eq!(cmp("22.4R3-S6.5", "22.4R3-S6.5"), VersionOrdering::Equal);
    }

    #[test]
    fn test_major_and_legacy_ordering() {
        assert_eq!(cmp("23.2R1", "22.4R3-S6.5"), VersionOrdering::Greater);
        assert_eq!(cmp("15.1X49-D240", "15.1X49-D230"), VersionOrdering::Greater);
        assert_eq!(cmp("20.4R3.8", "20.4R3"), VersionOrdering::Greater);
    }

    #[test]
    fn test_absent_side_is_undefined() {
        assert_eq!(compare_version(None, Some("22.4R3-S6")), VersionOrdering::Undefined);
        assert_eq!(compare_version(Some("22.4R3-S6"), None), VersionOrdering::Undefined);
        assert_eq!(compare_version(None, None), VersionOrdering::Undefined);
    }

    #[test]
    fn test_antisymmetric_and_reflexive() {
        for left in SAMPLES {
            assert_eq!(cmp(left, left), VersionOrdering::Equal, "{left}");
            for right in SAMPLES {
                assert_eq!(cmp(left, right), cmp(right, left).reverse(), "{left} vs {right}");
            }
        }
    }

    #[test]
    fn test_long_digit_runs_do_not_overflow() {
        assert_eq!(
            cmp("22.4R3-S99999999999999999999999", "22.4R3-S100000000000000000000000"),
            VersionOrdering::Less
        );
    }
}
