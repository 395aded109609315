//! Property-based tests for JSON fragment merging.

#[cfg(test)]
mod proptest_tests {
    use crate::merge::json::{merge_fragments, JsonFragment};
    use proptest::prelude::*;
    use serde_json::{json, Map, Value as JsonValue};

    fn leaf() -> impl Strategy<Value = JsonValue> {
        prop_oneof![
            (0i64..4).prop_map(|n| json!(n)),
            "[a-c]{1,2}".prop_map(JsonValue::String),
            prop::collection::vec(0i64..3, 0..3).prop_map(|v| json!(v)),
        ]
    }

    fn value() -> impl Strategy<Value = JsonValue> {
        leaf().prop_recursive(2, 12, 3, |inner| {
            prop::collection::btree_map("[a-c]", inner, 0..3)
                .prop_map(|m| JsonValue::Object(m.into_iter().collect::<Map<_, _>>()))
        })
    }

    fn object(keys: &'static str) -> impl Strategy<Value = JsonValue> {
        prop::collection::btree_map(keys, value(), 0..4)
            .prop_map(|m| JsonValue::Object(m.into_iter().collect::<Map<_, _>>()))
    }

    proptest! {
        /// Property: merging is pure for a fixed fragment order
        #[test]
        fn merge_is_deterministic(
            base in object("[a-d]"),
            first in object("[a-d]"),
            second in object("[a-d]"),
        ) {
            let fragments = vec![
                JsonFragment::new("one@1", first),
                JsonFragment::new("two@1", second),
            ];
            let a = merge_fragments(&base, &fragments).unwrap();
            let b = merge_fragments(&base, &fragments).unwrap();
            prop_assert_eq!(a, b);
        }

        /// Property: fragments with disjoint top-level keys merge in any order
        /// without conflicts
        #[test]
        fn disjoint_fragments_commute(
            base in object("[a-d]"),
            left in object("[e-g]"),
            right in object("[x-z]"),
        ) {
            let forward = merge_fragments(
                &base,
                &[JsonFragment::new("l@1", left.clone()), JsonFragment::new("r@1", right.clone())],
            )
            .unwrap();
            let backward = merge_fragments(
                &base,
                &[JsonFragment::new("r@1", right), JsonFragment::new("l@1", left)],
            )
            .unwrap();
            prop_assert!(forward.conflicts.is_empty());
            prop_assert!(backward.conflicts.is_empty());
            prop_assert_eq!(forward.merged, backward.merged);
        }

        /// Property: the same contribution from two sources never conflicts
        #[test]
        fn identical_contributions_never_conflict(base in object("[a-d]"), frag in object("[a-d]")) {
            let result = merge_fragments(
                &base,
                &[JsonFragment::new("a@1", frag.clone()), JsonFragment::new("b@1", frag)],
            )
            .unwrap();
            prop_assert!(result.conflicts.is_empty());
        }

        /// Property: every conflict names two different sources
        #[test]
        fn conflicts_name_distinct_sources(
            first in object("[a-c]"),
            second in object("[a-c]"),
            third in object("[a-c]"),
        ) {
            let result = merge_fragments(
                &json!({}),
                &[
                    JsonFragment::new("one@1", first),
                    JsonFragment::new("two@1", second),
                    JsonFragment::new("three@1", third),
                ],
            )
            .unwrap();
            for conflict in &result.conflicts {
                prop_assert_eq!(conflict.owners.len(), 2);
                prop_assert_ne!(&conflict.owners[0], &conflict.owners[1]);
            }
        }

        /// Property: the last fragment's leaf values are present in the result
        #[test]
        fn last_fragment_wins(first in object("[a-c]"), second in object("[a-c]")) {
            let result = merge_fragments(
                &json!({}),
                &[JsonFragment::new("one@1", first), JsonFragment::new("two@1", second.clone())],
            )
            .unwrap();
            if let JsonValue::Object(map) = &second {
                for (key, value) in map {
                    if !value.is_object() {
                        prop_assert_eq!(&result.merged[key], value);
                    }
                }
            }
        }
    }
}
