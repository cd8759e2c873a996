// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

fn attrs(pairs: &[(&str, &str)]) -> Attributes {
    pairs.iter().map(|(k, v)| (k.to_string(), AttrValue::from(*v))).collect()
}

#[test]
fn update_attributes_is_right_biased() {
    let defaults = attrs(&[("media", "iso-a4"), ("document-format", "application/octet-stream")]);
    let request = attrs(&[("media", "na-letter"), ("copies", "2")]);

    let merged = update_attributes(&defaults, &request);

    assert_eq!(merged.get("media"), Some(&AttrValue::from("na-letter")));
    assert_eq!(
        merged.get("document-format"),
        Some(&AttrValue::from("application/octet-stream"))
    );
    assert_eq!(merged.get("copies"), Some(&AttrValue::from("2")));
}

#[test]
fn update_attributes_with_empty_updates_is_identity() {
    let defaults = attrs(&[("media", "iso-a4")]);
    let merged = update_attributes(&defaults, &Attributes::new());
    assert_eq!(merged, defaults);
}

#[test]
fn attr_value_display() {
    assert_eq!(AttrValue::from("iso-a4").to_string(), "iso-a4");
    assert_eq!(AttrValue::Int(42).to_string(), "42");
    assert_eq!(AttrValue::Bool(true).to_string(), "true");
    assert_eq!(
        AttrValue::Strings(vec!["a".into(), "b".into()]).to_string(),
        "a,b"
    );
}

#[test]
fn attr_value_serde_is_untagged() {
    let json = serde_json::to_string(&AttrValue::from("iso-a4")).unwrap();
    assert_eq!(json, "\"iso-a4\"");
    let back: AttrValue = serde_json::from_str("\"iso-a4\"").unwrap();
    assert_eq!(back, AttrValue::from("iso-a4"));
    let n: AttrValue = serde_json::from_str("7").unwrap();
    assert_eq!(n, AttrValue::Int(7));
}

proptest! {
    /// Every key of the update set wins; every unshadowed base key survives.
    #[test]
    fn merge_covers_both_maps(
        base in proptest::collection::hash_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..8),
        updates in proptest::collection::hash_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..8),
    ) {
        let base: Attributes =
            base.into_iter().map(|(k, v)| (k, AttrValue::Str(v))).collect();
        let updates: Attributes =
            updates.into_iter().map(|(k, v)| (k, AttrValue::Str(v))).collect();

        let merged = update_attributes(&base, &updates);

        for (k, v) in &updates {
            prop_assert_eq!(merged.get(k), Some(v));
        }
        for (k, v) in &base {
            if !updates.contains_key(k) {
                prop_assert_eq!(merged.get(k), Some(v));
            }
        }
        prop_assert!(merged.len() <= base.len() + updates.len());
    }
}
