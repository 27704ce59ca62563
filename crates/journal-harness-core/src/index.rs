//! Per-owner exact nearest-neighbour index over chunk embeddings.
//!
//! A [`VectorIndex`] stores one vector per chunk in a flat `f32` buffer and
//! maps each internal position to the external [`ChunkId`] it was built
//! from. Search is brute-force squared-L2 distance, nearest first.
//!
//! The index is only ever produced by [`VectorIndex::build`] over an
//! owner's whole chunk set. New chunks make it stale; [`VectorIndex::status`]
//! reports the drift, and reconciliation is always an explicit rebuild.
//!
//! # Artifact format
//!
//! ```text
//! magic    "JHVI"            4 bytes
//! version  u16 LE
//! owner    u32 LE length + UTF-8 bytes
//! dims     u32 LE
//! count    u32 LE
//! ids      count × i64 LE
//! vectors  count × dims × f32 LE
//! checksum SHA-256 of every preceding byte (32 bytes)
//! ```

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::embedding::{blob_to_vec, embed_one, l2_distance_sq, vec_to_blob, Embedder};
use crate::error::{EngineError, Result};
use crate::models::ChunkId;

const MAGIC: &[u8; 4] = b"JHVI";
const VERSION: u16 = 1;
const CHECKSUM_LEN: usize = 32;

/// One nearest-neighbour match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk_id: ChunkId,
    /// Squared L2 distance to the query vector.
    pub distance: f32,
}

/// Drift between an index and the owner's current chunk set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStatus {
    /// Vectors held by the index.
    pub indexed: usize,
    /// Chunks currently in storage.
    pub current: usize,
    /// Chunks in storage that the index does not cover.
    pub missing: usize,
    /// Indexed ids that no longer exist in storage.
    pub orphaned: usize,
}

impl IndexStatus {
    pub fn is_stale(&self) -> bool {
        self.missing > 0 || self.orphaned > 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    owner: String,
    dims: usize,
    ids: Vec<ChunkId>,
    vectors: Vec<f32>,
}

impl VectorIndex {
    /// An index with no vectors. Searching it always yields nothing.
    pub fn empty(owner: &str, dims: usize) -> Self {
        Self {
            owner: owner.to_string(),
            dims,
            ids: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Embed `texts` and key each vector by the matching entry of `ids`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::LengthMismatch`] if `texts` and `ids` differ in length.
    /// - [`EngineError::EmbeddingUnavailable`] if the embedder fails or
    ///   returns the wrong number of vectors.
    /// - [`EngineError::DimensionMismatch`] if vectors are not uniformly
    ///   shaped or disagree with the embedder's declared dimensionality.
    pub async fn build(
        embedder: &dyn Embedder,
        owner: &str,
        texts: &[String],
        ids: &[ChunkId],
    ) -> Result<Self> {
        if texts.len() != ids.len() {
            return Err(EngineError::LengthMismatch {
                texts: texts.len(),
                ids: ids.len(),
            });
        }
        if texts.is_empty() {
            return Ok(Self::empty(owner, embedder.dims()));
        }

        let vectors = embedder.embed(texts).await.map_err(|e| {
            if e.is_external() {
                e
            } else {
                EngineError::EmbeddingUnavailable(e.to_string())
            }
        })?;

        if vectors.len() != texts.len() {
            return Err(EngineError::EmbeddingUnavailable(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }

        let declared = embedder.dims();
        let dims = if declared > 0 { declared } else { vectors[0].len() };
        if dims == 0 {
            return Err(EngineError::DimensionMismatch {
                expected: 1,
                got: 0,
            });
        }

        let mut flat = Vec::with_capacity(dims * vectors.len());
        for v in &vectors {
            if v.len() != dims {
                return Err(EngineError::DimensionMismatch {
                    expected: dims,
                    got: v.len(),
                });
            }
            flat.extend_from_slice(v);
        }

        Ok(Self {
            owner: owner.to_string(),
            dims,
            ids: ids.to_vec(),
            vectors: flat,
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Chunk ids resolvable through this index, in position order.
    pub fn chunk_ids(&self) -> &[ChunkId] {
        &self.ids
    }

    /// Top-`k` nearest chunks to `query`, ascending by distance.
    ///
    /// Ties are broken by chunk id so results are stable. `k == 0` or an
    /// empty index yields an empty vector. A query of the wrong
    /// dimensionality is an error, not an empty result.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        if self.dims == 0 {
            return Err(corrupt("non-empty index with zero dimensions"));
        }
        if query.len() != self.dims {
            return Err(EngineError::DimensionMismatch {
                expected: self.dims,
                got: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .ids
            .iter()
            .zip(self.vectors.chunks_exact(self.dims))
            .map(|(&chunk_id, v)| SearchHit {
                chunk_id,
                distance: l2_distance_sq(query, v),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then(a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Embed `query_text` and search. Skips the embedding call entirely
    /// when the result would be empty anyway.
    pub async fn search(
        &self,
        embedder: &dyn Embedder,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let query = embed_one(embedder, query_text).await?;
        self.search_vector(&query, k)
    }

    /// Compare the indexed ids with the owner's current chunk ids.
    pub fn status(&self, current: &[ChunkId]) -> IndexStatus {
        let indexed: HashSet<ChunkId> = self.ids.iter().copied().collect();
        let current_set: HashSet<ChunkId> = current.iter().copied().collect();
        IndexStatus {
            indexed: indexed.len(),
            current: current_set.len(),
            missing: current_set.difference(&indexed).count(),
            orphaned: indexed.difference(&current_set).count(),
        }
    }

    /// Serialize to the checksummed binary artifact.
    pub fn to_bytes(&self) -> Vec<u8> {
        let owner = self.owner.as_bytes();
        let mut out = Vec::with_capacity(
            4 + 2 + 4 + owner.len() + 8 + self.ids.len() * 8 + self.vectors.len() * 4 + CHECKSUM_LEN,
        );
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&(owner.len() as u32).to_le_bytes());
        out.extend_from_slice(owner);
        out.extend_from_slice(&(self.dims as u32).to_le_bytes());
        out.extend_from_slice(&(self.ids.len() as u32).to_le_bytes());
        for id in &self.ids {
            out.extend_from_slice(&id.to_le_bytes());
        }
        out.extend_from_slice(&vec_to_blob(&self.vectors));
        let checksum = Sha256::digest(&out);
        out.extend_from_slice(&checksum);
        out
    }

    /// Parse an artifact written by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// [`EngineError::IndexCorrupt`] on bad magic, unknown version,
    /// truncation, trailing bytes, checksum mismatch, or vectors declared
    /// with zero dimensions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CHECKSUM_LEN {
            return Err(corrupt("artifact shorter than checksum"));
        }
        let (body, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if Sha256::digest(body).as_slice() != checksum {
            return Err(corrupt("checksum mismatch"));
        }

        let mut reader = Reader { buf: body, pos: 0 };
        if reader.take(4)? != MAGIC {
            return Err(corrupt("bad magic"));
        }
        let version = u16::from_le_bytes(reader.array::<2>()?);
        if version != VERSION {
            return Err(corrupt(&format!("unsupported version {}", version)));
        }
        let owner_len = u32::from_le_bytes(reader.array::<4>()?) as usize;
        let owner = std::str::from_utf8(reader.take(owner_len)?)
            .map_err(|_| corrupt("owner is not UTF-8"))?
            .to_string();
        let dims = u32::from_le_bytes(reader.array::<4>()?) as usize;
        let count = u32::from_le_bytes(reader.array::<4>()?) as usize;
        if dims == 0 && count > 0 {
            return Err(corrupt("vectors declared with zero dimensions"));
        }

        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(i64::from_le_bytes(reader.array::<8>()?));
        }
        let vector_bytes = count
            .checked_mul(dims)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| corrupt("vector slab size overflow"))?;
        let vectors = blob_to_vec(reader.take(vector_bytes)?);
        if reader.pos != body.len() {
            return Err(corrupt("trailing bytes after vector slab"));
        }

        Ok(Self {
            owner,
            dims,
            ids,
            vectors,
        })
    }
}

fn corrupt(msg: &str) -> EngineError {
    EngineError::IndexCorrupt(msg.to_string())
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| corrupt("unexpected end of artifact"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Maps each text to a fixed vector by looking at its first word.
    struct TableEmbedder;

    #[async_trait]
    impl Embedder for TableEmbedder {
        fn model_name(&self) -> &str {
            "table"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| match t.split_whitespace().next() {
                    Some("north") => vec![0.0, 1.0],
                    Some("south") => vec![0.0, -1.0],
                    Some("east") => vec![1.0, 0.0],
                    _ => vec![0.0, 0.0],
                })
                .collect())
        }
    }

    struct RaggedEmbedder;

    #[async_trait]
    impl Embedder for RaggedEmbedder {
        fn model_name(&self) -> &str {
            "ragged"
        }
        fn dims(&self) -> usize {
            0
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![1.0; t.len()]).collect())
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        fn model_name(&self) -> &str {
            "down"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(EngineError::EmbeddingUnavailable("connection refused".into()))
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn compass() -> VectorIndex {
        VectorIndex::build(
            &TableEmbedder,
            "alice",
            &texts(&["north wind", "south road", "east gate", "centre"]),
            &[10, 20, 30, 40],
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_orders_nearest_first() {
        let index = compass().await;
        let hits = index.search_vector(&[0.1, 0.9], 4).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.chunk_id).collect();
        assert_eq!(ids[0], 10);
        for pair in hits.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[tokio::test]
    async fn test_search_respects_k() {
        let index = compass().await;
        assert_eq!(index.search_vector(&[0.0, 0.0], 2).unwrap().len(), 2);
        assert_eq!(index.search_vector(&[0.0, 0.0], 99).unwrap().len(), 4);
        assert!(index.search_vector(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_by_text() {
        let index = compass().await;
        let hits = index.search(&TableEmbedder, "east side", 1).await.unwrap();
        assert_eq!(hits[0].chunk_id, 30);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[tokio::test]
    async fn test_empty_index_search_does_not_embed() {
        let index = VectorIndex::empty("alice", 2);
        let hits = index.search(&DownEmbedder, "anything", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_build_length_mismatch() {
        let err = VectorIndex::build(&TableEmbedder, "alice", &texts(&["north"]), &[1, 2])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::LengthMismatch { texts: 1, ids: 2 }));
    }

    #[tokio::test]
    async fn test_build_ragged_vectors() {
        let err = VectorIndex::build(&RaggedEmbedder, "alice", &texts(&["ab", "abc"]), &[1, 2])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DimensionMismatch { expected: 2, got: 3 }));
    }

    #[tokio::test]
    async fn test_build_embedding_unavailable() {
        let err = VectorIndex::build(&DownEmbedder, "alice", &texts(&["north"]), &[1])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let index = compass().await;
        assert!(matches!(
            index.search_vector(&[1.0, 2.0, 3.0], 1),
            Err(EngineError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[tokio::test]
    async fn test_bytes_preserve_search_results() {
        let index = compass().await;
        let loaded = VectorIndex::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(loaded, index);
        assert_eq!(loaded.owner(), "alice");
        let hits = loaded.search_vector(&[0.0, -1.0], 4).unwrap();
        for hit in &hits {
            assert!([10, 20, 30, 40].contains(&hit.chunk_id));
        }
        assert_eq!(hits[0].chunk_id, 20);
    }

    #[test]
    fn test_zero_dimension_vectors_rejected() {
        let flat = VectorIndex {
            owner: "alice".to_string(),
            dims: 0,
            ids: vec![1, 2],
            vectors: Vec::new(),
        };
        // Checksum is valid, so only the header check can catch it.
        assert!(matches!(
            VectorIndex::from_bytes(&flat.to_bytes()),
            Err(EngineError::IndexCorrupt(_))
        ));
        assert!(matches!(
            flat.search_vector(&[], 1),
            Err(EngineError::IndexCorrupt(_))
        ));

        let empty = VectorIndex::empty("alice", 0);
        let loaded = VectorIndex::from_bytes(&empty.to_bytes()).unwrap();
        assert!(loaded.search_vector(&[], 3).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_artifacts_rejected() {
        let bytes = compass().await.to_bytes();

        let mut flipped = bytes.clone();
        flipped[12] ^= 0xff;
        assert!(matches!(
            VectorIndex::from_bytes(&flipped),
            Err(EngineError::IndexCorrupt(_))
        ));

        assert!(matches!(
            VectorIndex::from_bytes(&bytes[..bytes.len() - 5]),
            Err(EngineError::IndexCorrupt(_))
        ));
        assert!(matches!(
            VectorIndex::from_bytes(b"JH"),
            Err(EngineError::IndexCorrupt(_))
        ));
    }

    #[tokio::test]
    async fn test_status_reports_drift() {
        let index = compass().await;
        let status = index.status(&[10, 20, 30, 40]);
        assert!(!status.is_stale());

        let status = index.status(&[10, 20, 30, 50, 60]);
        assert_eq!(status.indexed, 4);
        assert_eq!(status.current, 5);
        assert_eq!(status.missing, 2);
        assert_eq!(status.orphaned, 1);
        assert!(status.is_stale());
    }
}
