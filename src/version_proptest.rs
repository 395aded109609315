//! Property-based tests for version ordering.
//!
//! Segments mix small numbers with short alphanumeric tags so that
//! numeric, non-numeric and mixed pairs are all exercised.

#[cfg(test)]
mod proptest_tests {
    use crate::version::{compare_versions, sort_versions, versions_equal};
    use proptest::prelude::*;
    use std::cmp::Ordering;

    fn segment() -> impl Strategy<Value = String> {
        prop_oneof![
            3 => (0u32..20).prop_map(|n| n.to_string()),
            1 => "[0-9a-c]{1,3}",
        ]
    }

    fn version() -> impl Strategy<Value = String> {
        prop::collection::vec(segment(), 1..4).prop_map(|segments| segments.join("."))
    }

    proptest! {
        /// Property: every version equals itself
        #[test]
        fn compare_is_reflexive(v in version()) {
            prop_assert_eq!(compare_versions(&v, &v), Ordering::Equal);
        }

        /// Property: swapping arguments reverses the ordering
        #[test]
        fn compare_is_antisymmetric(a in version(), b in version()) {
            prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
        }

        /// Property: ordering is transitive
        #[test]
        fn compare_is_transitive(a in version(), b in version(), c in version()) {
            if compare_versions(&a, &b) != Ordering::Greater
                && compare_versions(&b, &c) != Ordering::Greater
            {
                prop_assert_ne!(compare_versions(&a, &c), Ordering::Greater);
            }
        }

        /// Property: trailing zero segments do not change a version
        #[test]
        fn trailing_zeros_are_ignored(v in version()) {
            let padded = format!("{}.0", v);
            prop_assert!(versions_equal(&v, &padded));
        }

        /// Property: sorted output is non-decreasing
        #[test]
        fn sort_is_ordered(mut versions in prop::collection::vec(version(), 0..8)) {
            sort_versions(&mut versions);
            for pair in versions.windows(2) {
                prop_assert_ne!(compare_versions(&pair[0], &pair[1]), Ordering::Greater);
            }
        }
    }
}
