pub mod fields;
pub mod types;

pub use fields::FieldIndex;
pub use types::{ColumnDescriptor, DatasetDocument, RawRow};
