#[cfg(test)]
pub mod test {
    use serde_json::Value;

    use crate::merge::Tree;
    use crate::overrides::RawOverride;
    use crate::types::Layer;

    /// A raw override layer from a `json!` record.
    pub fn raw(value: Value) -> Layer {
        Layer::Raw(RawOverride::from_value(value).expect("fixture must be a record"))
    }

    /// A structural tree from a `json!` record.
    pub fn tree(value: Value) -> Tree {
        match value {
            Value::Object(map) => map,
            other => panic!("expected a record, got {other}"),
        }
    }
}
