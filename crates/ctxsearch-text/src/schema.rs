use tantivy::schema::{
    DateOptions, DateTimePrecision, Field, IndexRecordOption, Schema, TextFieldIndexing,
    TextOptions, STORED, STRING,
};
use tantivy::Index;

pub const ID: &str = "id";
pub const TITLE: &str = "title";
pub const CONTENT: &str = "content";
pub const CATEGORY: &str = "category";
pub const TAGS: &str = "tags";
pub const CREATED_AT: &str = "created_at";

/// Tokenizer for `title` and `content`: word split, long-token removal, lowercase.
pub const TEXT_TOKENIZER: &str = "default";

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_text_field(ID, STRING | STORED);
    let text_field_indexing = TextFieldIndexing::default()
        .set_tokenizer(TEXT_TOKENIZER)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
    schema_builder.add_text_field(TITLE, text_options.clone());
    schema_builder.add_text_field(CONTENT, text_options);
    schema_builder.add_text_field(CATEGORY, STRING | STORED);
    schema_builder.add_text_field(TAGS, STRING | STORED);
    let date_options = DateOptions::default()
        .set_stored()
        .set_indexed()
        .set_precision(DateTimePrecision::Microseconds);
    schema_builder.add_date_field(CREATED_AT, date_options);
    schema_builder.build()
}

#[derive(Debug, Clone, Copy)]
pub struct Fields {
    pub id: Field,
    pub title: Field,
    pub content: Field,
    pub category: Field,
    pub tags: Field,
    pub created_at: Field,
}

impl Fields {
    pub fn resolve(index: &Index) -> anyhow::Result<Self> {
        let schema = index.schema();
        Ok(Self {
            id: schema.get_field(ID)?,
            title: schema.get_field(TITLE)?,
            content: schema.get_field(CONTENT)?,
            category: schema.get_field(CATEGORY)?,
            tags: schema.get_field(TAGS)?,
            created_at: schema.get_field(CREATED_AT)?,
        })
    }
}
