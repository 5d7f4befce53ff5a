//! Deep merge of JSON configuration layers.

use serde_json::Value;

/// Merge `overlay` on top of `base`, returning the combined tree.
///
/// When a key is present on both sides and both values are objects, the merge
/// recurses. In every other case the overlay value replaces the base value
/// outright; arrays are replaced wholesale, never concatenated. Keys only
/// present in `base` are kept, including keys no schema knows about.
pub fn deep_merge(mut base: Value, overlay: &Value) -> Value {
    merge_into(&mut base, overlay);
    base
}

/// In-place variant of [`deep_merge`].
pub fn merge_into(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                let recurse = value.is_object() && base_map.get(key).is_some_and(Value::is_object);
                match base_map.get_mut(key) {
                    Some(existing) if recurse => merge_into(existing, value),
                    _ => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Look up a dotted path such as `compiler.warnings.level`.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |node, key| node.get(key))
}

/// Set a dotted path, creating intermediate objects as needed.
///
/// Non-object intermediates are replaced by objects.
pub fn set_path(value: &mut Value, path: &str, new_value: Value) {
    if !value.is_object() {
        *value = Value::Object(Default::default());
    }
    let Some(map) = value.as_object_mut() else {
        return;
    };

    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), new_value);
        }
        Some((head, rest)) => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Default::default()));
            set_path(child, rest, new_value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_objects_merge() {
        let base = json!({"compiler": {"standard": "c++20", "parallel": true}});
        let overlay = json!({"compiler": {"standard": "c++17"}});

        let merged = deep_merge(base, &overlay);
        assert_eq!(
            merged,
            json!({"compiler": {"standard": "c++17", "parallel": true}})
        );
    }

    #[test]
    fn test_arrays_replace_wholesale() {
        let base = json!({"compiler": {"defines": ["A", "B"]}});
        let overlay = json!({"compiler": {"defines": ["NDEBUG"]}});

        let merged = deep_merge(base, &overlay);
        assert_eq!(merged["compiler"]["defines"], json!(["NDEBUG"]));
    }

    #[test]
    fn test_scalar_replaces_object_and_back() {
        let merged = deep_merge(json!({"a": {"b": 1}}), &json!({"a": 3}));
        assert_eq!(merged, json!({"a": 3}));

        let merged = deep_merge(json!({"a": 3}), &json!({"a": {"b": 1}}));
        assert_eq!(merged, json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_unknown_keys_survive() {
        let merged = deep_merge(json!({"x_custom": {"k": true}}), &json!({"project": {}}));
        assert_eq!(merged["x_custom"]["k"], json!(true));
    }

    #[test]
    fn test_associative_for_disjoint_keys() {
        let a = json!({"project": {"name": "app"}, "linker": {"libraries": ["a.lib"]}});
        let b = json!({"project": {"type": "dll"}, "compiler": {"parallel": false}});
        let c = json!({"compiler": {"warnings": {"level": 3}}, "pch": {"enabled": true}});

        let left = deep_merge(deep_merge(a.clone(), &b), &c);
        let right = deep_merge(a, &deep_merge(b, &c));
        assert_eq!(left, right);
    }

    #[test]
    fn test_rightmost_scalar_wins() {
        let a = json!({"project": {"architecture": "x86"}});
        let b = json!({"project": {"architecture": "x64"}});
        let c = json!({"project": {"architecture": "arm64"}});

        let merged = deep_merge(deep_merge(a, &b), &c);
        assert_eq!(merged["project"]["architecture"], json!("arm64"));
    }

    #[test]
    fn test_get_and_set_path() {
        let mut value = json!({"compiler": {"warnings": {"level": 4}}});
        assert_eq!(get_path(&value, "compiler.warnings.level"), Some(&json!(4)));
        assert_eq!(get_path(&value, "compiler.missing.level"), None);

        set_path(&mut value, "project.output_name", json!("tool.exe"));
        set_path(&mut value, "compiler.warnings.level", json!(2));
        assert_eq!(value["project"]["output_name"], json!("tool.exe"));
        assert_eq!(value["compiler"]["warnings"]["level"], json!(2));
    }
}
