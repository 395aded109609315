//! Property-based tests for template rendering.

#[cfg(test)]
mod proptest_tests {
    use crate::template::{placeholders, render};
    use proptest::prelude::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn vars() -> impl Strategy<Value = BTreeMap<String, String>> {
        prop::collection::btree_map("[a-c]", "[a-z ]{0,6}", 0..4)
    }

    proptest! {
        /// Property: rendering twice is the same as rendering once when values
        /// contain no placeholders
        #[test]
        fn render_is_idempotent(vars in vars(), body in "[a-z {}]{0,20}") {
            let mut template = body.clone();
            for name in vars.keys() {
                template.push_str(&format!("{{{{{}}}}}", name));
            }
            let once = match render(&template, &vars, &BTreeSet::new()) {
                Ok(out) => out,
                Err(_) => return Ok(()),
            };
            if placeholders(&once).is_empty() {
                let twice = render(&once, &vars, &BTreeSet::new()).unwrap();
                prop_assert_eq!(twice, once);
            }
        }

        /// Property: text without placeholders renders unchanged
        #[test]
        fn render_without_placeholders_is_identity(text in "[^{}]*") {
            let out = render(&text, &BTreeMap::new(), &BTreeSet::new()).unwrap();
            prop_assert_eq!(out, text);
        }

        /// Property: a missing variable fails and names a referenced placeholder
        #[test]
        fn missing_variable_fails_closed(name in "[A-Za-z0-9_-]{1,8}", prefix in "[a-z ]{0,8}") {
            let template = format!("{}{{{{{}}}}}", prefix, name);
            let err = render(&template, &BTreeMap::new(), &BTreeSet::new()).unwrap_err();
            prop_assert!(err.to_string().contains(&name));
        }
    }
}
