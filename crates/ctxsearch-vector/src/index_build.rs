//! ANN index on `content_vector` for large tables.
//!
//! Small tables are searched by flat scan, which is exact. Once a bulk load
//! pushes the row count past a threshold an IVF-HNSW-SQ index is trained;
//! searches then pass the configured `ef`.
use anyhow::Result;
use lancedb::index::vector::IvfHnswSqIndexBuilder;
use lancedb::index::Index;
use lancedb::DistanceType;

use crate::schema::CONTENT_VECTOR;
use crate::store::VectorStore;

/// IVF training needs a few hundred rows per partition to be meaningful.
const MIN_TRAINING_ROWS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IvfParams {
    pub num_partitions: u32,
}

pub fn compute_ivf_params(total_rows: usize) -> IvfParams {
    let sqrt_n = (total_rows as f64).sqrt() as usize;
    let mut nlist = sqrt_n.clamp(1, 4096);
    // Clamp nlist so every partition gets training rows
    nlist = nlist.min((total_rows / MIN_TRAINING_ROWS).max(1));
    IvfParams { num_partitions: u32::try_from(nlist).unwrap_or(u32::MAX) }
}

impl VectorStore {
    /// Build the ANN index when the table holds at least `min_rows` rows.
    /// Returns whether an index was built.
    pub async fn maybe_build_ann(&self, min_rows: usize) -> Result<bool> {
        let rows = self.count().await?;
        if rows < min_rows.max(MIN_TRAINING_ROWS) {
            tracing::debug!(rows, min_rows, "skipping ANN build, flat scan is exact");
            return Ok(false);
        }
        let params = compute_ivf_params(rows);
        tracing::info!(rows, partitions = params.num_partitions, "building IVF-HNSW index on {CONTENT_VECTOR}");
        self.table
            .create_index(
                &[CONTENT_VECTOR],
                Index::IvfHnswSq(
                    IvfHnswSqIndexBuilder::default()
                        .distance_type(DistanceType::Cosine)
                        .num_partitions(params.num_partitions),
                ),
            )
            .replace(true)
            .execute()
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_scale_with_rows() {
        assert_eq!(compute_ivf_params(300).num_partitions, 1);
        assert_eq!(compute_ivf_params(10_000).num_partitions, 39);
        assert_eq!(compute_ivf_params(1_000_000).num_partitions, 1000);
        assert_eq!(compute_ivf_params(100_000_000).num_partitions, 4096);
    }
}
