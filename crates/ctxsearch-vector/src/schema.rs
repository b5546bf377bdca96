use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const TABLE_NAME: &str = "documents";
pub const ID: &str = "id";
pub const CATEGORY: &str = "category";
pub const TITLE_VECTOR: &str = "title_vector";
pub const CONTENT_VECTOR: &str = "content_vector";

fn vector_type(dim: i32) -> DataType {
    DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim)
}

/// One row per document: the id, the category used for pre-filtering
/// (empty string when unset) and both vectors.
pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(ID, DataType::Utf8, false),
        Field::new(CATEGORY, DataType::Utf8, false),
        Field::new(TITLE_VECTOR, vector_type(dim), true),
        Field::new(CONTENT_VECTOR, vector_type(dim), true),
    ]))
}

/// Vector length declared by a table schema for `content_vector`.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
    match schema.field_with_name(CONTENT_VECTOR).ok()?.data_type() {
        DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_is_read_back_from_schema() {
        assert_eq!(vector_dim(&build_arrow_schema(384)), Some(384));
        let other = Schema::new(vec![Field::new(CONTENT_VECTOR, DataType::Utf8, true)]);
        assert_eq!(vector_dim(&other), None);
    }
}
