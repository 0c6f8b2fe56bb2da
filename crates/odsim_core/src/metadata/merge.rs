//! Deep merge of metadata trees.
//!
//! Fragments are layered one on top of another (common context, dataset
//! fragment, kind fragment) with [`merge`]. Existing keys are never removed;
//! colliding leaves are promoted to a sequence holding both values.

use serde_json::Value;

/// Merge `addition` into `base` and return the composite tree.
///
/// Rules, checked in order:
///
/// 1. sequence + sequence: `addition` is appended to `base` (concatenation).
/// 2. sequence + anything else: `addition` is pushed as a single element.
/// 3. mapping + mapping: each key of `addition` is merged recursively into
///    the matching key of `base`, or inserted when absent.
/// 4. anything else: `base` is wrapped in a one-element sequence and the
///    rules are applied again, so two scalars become `[base, addition]` and a
///    scalar followed by a sequence becomes `[base, ...addition]`.
///
/// Rule 2 is asymmetric on purpose: a sequence never gets flattened into by a
/// mapping or scalar, the whole value becomes one new element.
pub fn merge(base: Value, addition: Value) -> Value {
    match (base, addition) {
        (Value::Array(mut items), Value::Array(extra)) => {
            items.extend(extra);
            Value::Array(items)
        }
        (Value::Array(mut items), other) => {
            items.push(other);
            Value::Array(items)
        }
        (Value::Object(mut map), Value::Object(extra)) => {
            for (key, value) in extra {
                match map.get_mut(&key) {
                    Some(existing) => {
                        let current = existing.take();
                        *existing = merge(current, value);
                    }
                    None => {
                        map.insert(key, value);
                    }
                }
            }
            Value::Object(map)
        }
        (base, other) => merge(Value::Array(vec![base]), other),
    }
}

/// Merge a sequence of fragments left to right.
///
/// Returns `Value::Null` for an empty iterator.
pub fn merge_all<I>(fragments: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    let mut iter = fragments.into_iter();
    let Some(first) = iter.next() else {
        return Value::Null;
    };
    iter.fold(first, merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn concatenates_sequences() {
        let merged = merge(json!([1, 2]), json!([3]));
        assert_eq!(merged, json!([1, 2, 3]));
    }

    #[test]
    fn sequence_plus_scalar_appends_one_element() {
        let merged = merge(json!(["a"]), json!("b"));
        assert_eq!(merged, json!(["a", "b"]));
    }

    #[test]
    fn sequence_plus_mapping_appends_mapping_whole() {
        let merged = merge(json!([1]), json!({"k": [2, 3]}));
        assert_eq!(merged, json!([1, {"k": [2, 3]}]));
    }

    #[test]
    fn colliding_scalars_become_pair() {
        let merged = merge(json!({"title": "old"}), json!({"title": "new"}));
        assert_eq!(merged, json!({"title": ["old", "new"]}));
    }

    #[test]
    fn scalar_then_sequence_is_prepended() {
        let merged = merge(json!({"k": 1}), json!({"k": [2, 3]}));
        assert_eq!(merged, json!({"k": [1, 2, 3]}));
    }

    #[test]
    fn mapping_then_scalar_wraps_mapping() {
        let merged = merge(json!({"k": {"a": 1}}), json!({"k": "x"}));
        assert_eq!(merged, json!({"k": [{"a": 1}, "x"]}));
    }

    #[test]
    fn keeps_keys_missing_from_addition() {
        let base = json!({"keep": 1, "nested": {"a": 1, "b": 2}});
        let merged = merge(base, json!({"nested": {"c": 3}, "new": true}));
        assert_eq!(
            merged,
            json!({"keep": 1, "nested": {"a": 1, "b": 2, "c": 3}, "new": true})
        );
    }

    #[test]
    fn nested_collision_only_touches_leaf() {
        let base = json!({"wasGeneratedBy": {"startedAtTime": "t0", "used": ["x"]}});
        let addition = json!({"wasGeneratedBy": {"startedAtTime": "t1", "endedAtTime": "t2"}});
        let merged = merge(base, addition);
        assert_eq!(
            merged,
            json!({"wasGeneratedBy": {
                "startedAtTime": ["t0", "t1"],
                "used": ["x"],
                "endedAtTime": "t2"
            }})
        );
    }

    #[test]
    fn layering_disjoint_fragments_is_order_independent_in_grouping() {
        let a = json!({"a": 1, "n": {"x": 1}});
        let b = json!({"b": 2, "n": {"y": 2}});
        let c = json!({"c": 3, "n": {"z": 3}});

        let left = merge(merge(a.clone(), b.clone()), c.clone());
        let right = merge(a, merge(b, c));
        assert_eq!(left, right);
    }

    #[test]
    fn merge_all_folds_left() {
        let merged = merge_all(vec![json!({"a": 1}), json!({"b": 2}), json!({"a": 3})]);
        assert_eq!(merged, json!({"a": [1, 3], "b": 2}));
        assert_eq!(merge_all(Vec::new()), Value::Null);
    }
}
