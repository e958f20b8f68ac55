// src/dataset/types.rs

use serde::Deserialize;
use serde_json::Value;

/// One positional cell array from the `data` section.
pub type RawRow = Vec<Value>;

/// A `rows.json` export: column metadata plus positional rows.
#[derive(Debug, Deserialize)]
pub struct DatasetDocument {
    pub meta: Meta,
    pub data: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
pub struct Meta {
    pub view: View,
}

#[derive(Debug, Deserialize)]
pub struct View {
    pub columns: Vec<ColumnDescriptor>,
}

/// Column metadata. Only the keys we act on are modelled; the rest are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    #[serde(default)]
    pub field_name: Option<String>,
    /// Usually a list such as `["hidden"]`, but left untyped so odd shapes
    /// never fail the whole document.
    #[serde(default)]
    pub flags: Option<Value>,
}

impl ColumnDescriptor {
    /// Meta columns carry exactly `["hidden"]`. Anything else is data.
    pub fn is_hidden(&self) -> bool {
        match &self.flags {
            Some(Value::Array(items)) => {
                items.len() == 1 && items[0].as_str() == Some("hidden")
            }
            _ => false,
        }
    }
}

impl DatasetDocument {
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.meta.view.columns
    }
}
