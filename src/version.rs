//! # Feature Version Ordering
//!
//! Feature definitions are versioned with dotted version strings such as
//! `1.2.0`. Projects declare the version they want, migrations are keyed by
//! version, and the drift detector searches sibling versions in ascending
//! order. All of that needs one comparator, defined here.
//!
//! ## Rules
//!
//! - Versions are split on `.` into segments and compared component-wise.
//! - Two numeric segments compare numerically (`10 > 9`).
//! - Two non-numeric segments compare lexicographically as strings.
//! - A numeric segment always sorts below a non-numeric one, so `1.0.9`
//!   comes before `1.0.rc1` and `1.10` before `1.1a`.
//! - A shorter version is padded with `0` segments, so `1.2 == 1.2.0`.
//!
//! The comparator is deliberately more lenient than strict semver: feature
//! catalogs in the wild use two-segment versions and suffixes like `1.0.rc1`.

use std::cmp::Ordering;

/// Compare two dotted version strings.
///
/// # Examples
///
/// ```
/// use feature_sync::version::compare_versions;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Equal);
/// assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
/// ```
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.split('.').collect();
    let right: Vec<&str> = b.split('.').collect();
    let len = left.len().max(right.len());

    for idx in 0..len {
        let l = left.get(idx).copied().unwrap_or("0");
        let r = right.get(idx).copied().unwrap_or("0");
        let ordering = compare_segment(l, r);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    match (parse_numeric(a), parse_numeric(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn parse_numeric(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Whether two version strings name the same version (`1.2` and `1.2.0` do).
pub fn versions_equal(a: &str, b: &str) -> bool {
    compare_versions(a, b) == Ordering::Equal
}

/// Sort a list of version strings in ascending order.
pub fn sort_versions<S: AsRef<str>>(versions: &mut [S]) {
    versions.sort_by(|a, b| compare_versions(a.as_ref(), b.as_ref()));
}
