// src/dataset/fields.rs

use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

use super::types::ColumnDescriptor;

/// Logical field name → position in every raw row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldIndex {
    positions: HashMap<String, usize>,
}

impl FieldIndex {
    /// Map every visible, named column to its position in the column list.
    pub fn from_columns(columns: &[ColumnDescriptor]) -> Self {
        let mut positions = HashMap::with_capacity(columns.len());
        for (idx, col) in columns.iter().enumerate() {
            match &col.field_name {
                Some(name) if !col.is_hidden() => {
                    trace!(field = %name, idx, "mapped column");
                    positions.insert(name.clone(), idx);
                }
                _ => trace!(idx, "skipping meta column"),
            }
        }
        Self { positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Cell for `name` in `row`. Unmapped names, short rows and JSON `null`
    /// all read as `None`.
    pub fn field<'r>(&self, row: &'r [Value], name: &str) -> Option<&'r Value> {
        self.position(name)
            .and_then(|idx| row.get(idx))
            .filter(|v| !v.is_null())
    }
}

impl FromIterator<(String, usize)> for FieldIndex {
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn col(name: Option<&str>, flags: Option<Value>) -> ColumnDescriptor {
        ColumnDescriptor {
            field_name: name.map(str::to_string),
            flags,
        }
    }

    #[test]
    fn only_named_visible_columns_are_mapped() {
        let cols = vec![
            col(Some(":sid"), Some(json!(["hidden"]))),
            col(Some(":id"), Some(json!(["hidden"]))),
            col(None, None),
            col(Some("county"), None),
            col(Some("city"), Some(json!([]))),
            col(Some("state"), Some(json!(["hidden", "other"]))),
            col(Some("zip_code"), Some(json!("hidden"))),
        ];
        let idx = FieldIndex::from_columns(&cols);

        assert_eq!(idx.len(), 4);
        assert_eq!(idx.position(":sid"), None);
        assert_eq!(idx.position(":id"), None);
        assert_eq!(idx.position("county"), Some(3));
        assert_eq!(idx.position("city"), Some(4));
        assert_eq!(idx.position("state"), Some(5));
        // a bare string is not the list ["hidden"]
        assert_eq!(idx.position("zip_code"), Some(6));
    }

    #[test]
    fn field_reads_are_bounds_checked() {
        let idx: FieldIndex = [("a", 0), ("b", 1), ("c", 2), ("far", 9)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let row = vec![json!("123"), Value::Null, json!("45")];

        assert_eq!(idx.field(&row, "a"), Some(&json!("123")));
        assert_eq!(idx.field(&row, "b"), None);
        assert_eq!(idx.field(&row, "c"), Some(&json!("45")));
        assert_eq!(idx.field(&row, "far"), None);
        assert_eq!(idx.field(&row, "missing"), None);
    }

    #[test]
    fn descriptors_deserialize_from_socrata_shape() -> anyhow::Result<()> {
        let cols: Vec<ColumnDescriptor> = serde_json::from_value(json!([
            {"id": -1, "name": "sid", "dataTypeName": "meta_data", "fieldName": ":sid",
             "position": 0, "flags": ["hidden"]},
            {"id": 1, "name": "County", "dataTypeName": "text", "fieldName": "county",
             "position": 1}
        ]))?;
        assert!(cols[0].is_hidden());
        assert!(!cols[1].is_hidden());
        assert_eq!(cols[1].field_name.as_deref(), Some("county"));
        Ok(())
    }
}
