//! Lance table holding the title/content vectors of one index.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{connect, DistanceType, Table};

use ctxsearch_core::types::Document;

use crate::schema::{build_arrow_schema, vector_dim, CATEGORY, CONTENT_VECTOR, ID, TABLE_NAME};

/// Default `ef` passed to HNSW-backed searches.
pub const EF_SEARCH: u32 = 100;

/// One nearest-neighbour hit. `score = 1 / (1 + cosine_distance)`, so
/// identical directions score 1.0 and higher is always closer.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    pub score: f32,
}

pub struct VectorStore {
    pub(crate) table: Table,
    dim: usize,
    ef: u32,
}

/// Quote a string literal for a Lance SQL predicate.
pub(crate) fn sql_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `1 / (1 + d)`. A distance that is not a number (a stored zero vector)
/// ranks below every real match.
pub fn distance_score(distance: f32) -> f32 {
    if distance.is_finite() {
        1.0 / (1.0 + distance)
    } else {
        0.0
    }
}

impl VectorStore {
    /// Create the table for vectors of length `dim` under `dir`. Opens the
    /// existing table instead when there is one.
    pub async fn create(dir: &Path, dim: usize) -> Result<Self> {
        let db = connect(&dir.to_string_lossy()).execute().await?;
        let names = db.table_names().execute().await?;
        if !names.iter().any(|n| n == TABLE_NAME) {
            let schema = build_arrow_schema(i32::try_from(dim)?);
            // create empty table with 0 rows
            let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
            db.create_table(TABLE_NAME, Box::new(iter)).execute().await?;
            tracing::debug!(dir = %dir.display(), dim, "created vector table");
        }
        Self::open(dir).await
    }

    pub async fn open(dir: &Path) -> Result<Self> {
        let db = connect(&dir.to_string_lossy()).execute().await?;
        let table = db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .with_context(|| format!("opening vector table in {}", dir.display()))?;
        let schema = table.schema().await?;
        let dim = vector_dim(&schema).ok_or_else(|| anyhow!("{CONTENT_VECTOR} is not a fixed-size vector column"))?;
        Ok(Self { table, dim, ef: EF_SEARCH })
    }

    pub fn with_ef(mut self, ef: u32) -> Self {
        self.ef = ef;
        self
    }

    /// Vector length fixed by the table schema.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.table.count_rows(None).await?)
    }

    /// Insert or fully replace rows by id, in one write.
    pub async fn upsert(&self, docs: &[Document]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let batch = self.to_record_batch(docs)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let mut mi = self.table.merge_insert(&[ID]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.table.delete(&format!("{ID} = {}", sql_literal(id))).await?;
        Ok(())
    }

    /// Top-`k` nearest documents to `query` on `content_vector`. With a
    /// category, only rows whose category equals it exactly are candidates.
    pub async fn knn(&self, query: &[f32], k: usize, category: Option<&str>) -> Result<Vec<VectorHit>> {
        if query.len() != self.dim {
            bail!("query vector has {} values, table stores {}", query.len(), self.dim);
        }
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut q = self
            .table
            .vector_search(query.to_vec())?
            .column(CONTENT_VECTOR)
            .distance_type(DistanceType::Cosine)
            .ef(self.ef as usize)
            .select(Select::columns(&[ID]))
            .limit(k);
        if let Some(category) = category {
            q = q.only_if(format!("{CATEGORY} = {}", sql_literal(category)));
        }
        let mut stream = q.execute().await?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            let ids = batch
                .column_by_name(ID)
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow!("missing {ID} column"))?;
            let dist = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| anyhow!("missing _distance column"))?;
            for i in 0..batch.num_rows() {
                hits.push(VectorHit { id: ids.value(i).to_string(), score: distance_score(dist.value(i)) });
            }
        }
        // stable, so equal scores keep the table's distance order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    fn to_record_batch(&self, docs: &[Document]) -> Result<RecordBatch> {
        let dim = i32::try_from(self.dim)?;
        let mut ids = Vec::with_capacity(docs.len());
        let mut categories = Vec::with_capacity(docs.len());
        let mut titles: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(docs.len());
        let mut contents: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(docs.len());
        for d in docs {
            for v in [&d.title_vector, &d.content_vector] {
                if v.len() != self.dim {
                    bail!("document {}: vector has {} values, table stores {}", d.id, v.len(), self.dim);
                }
            }
            ids.push(d.id.as_str());
            categories.push(d.category.as_str());
            titles.push(Some(d.title_vector.iter().map(|&x| Some(x)).collect()));
            contents.push(Some(d.content_vector.iter().map(|&x| Some(x)).collect()));
        }
        let batch = RecordBatch::try_new(
            build_arrow_schema(dim),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(categories)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(titles, dim)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(contents, dim)),
            ],
        )?;
        Ok(batch)
    }
}
