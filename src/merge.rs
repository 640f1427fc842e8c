use serde_json::{Map, Value};

/// A structural configuration tree: records, sequences, scalars and null.
pub type Tree = Map<String, Value>;

/// Deep-merge `overlay` on top of `base`.
/// If both sides have a record for the same key, recurse.
/// Otherwise, `overlay`'s value wins, sequences included.
///
/// An explicit `null` in `overlay` is a value, not "no override": it replaces
/// whatever `base` held at that key. Only a key missing from `overlay` leaves
/// `base` untouched.
pub fn deep_merge(mut base: Tree, overlay: Tree) -> Tree {
    for (key, overlay_val) in overlay {
        match (base.remove(&key), overlay_val) {
            (Some(Value::Object(base_tbl)), Value::Object(overlay_tbl)) => {
                base.insert(key, Value::Object(deep_merge(base_tbl, overlay_tbl)));
            }
            (_, overlay_val) => {
                base.insert(key, overlay_val);
            }
        }
    }
    base
}
