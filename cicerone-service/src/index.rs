//! In-memory embedding index and its on-disk snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{EmbeddingError, ProcessingError, ServiceError, ServiceResult};
use crate::ingestion::Chunk;

const SNAPSHOT_FILE: &str = "index-snapshot.json";

/// A chunk with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Brute-force nearest-neighbour index over chunk embeddings
#[derive(Debug, Default)]
pub struct VectorIndex {
    entries: Vec<IndexedChunk>,
    dimension: Option<usize>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Add a chunk. All embeddings must share the first one's dimension.
    pub fn insert(&mut self, chunk: Chunk, embedding: Vec<f32>) -> ServiceResult<()> {
        match self.dimension {
            Some(expected) if expected != embedding.len() => {
                return Err(ServiceError::Embedding(
                    EmbeddingError::DimensionMismatch {
                        expected,
                        actual: embedding.len(),
                    },
                ));
            }
            None if embedding.is_empty() => {
                return Err(ServiceError::Embedding(EmbeddingError::Generation {
                    message: format!("Empty embedding for chunk {}", chunk.chunk_index),
                }));
            }
            None => self.dimension = Some(embedding.len()),
            _ => {}
        }

        self.entries.push(IndexedChunk { chunk, embedding });
        Ok(())
    }

    /// Up to `k` chunks most similar to the query, best first.
    pub fn similarity_search(&self, query: &[f32], k: usize) -> Vec<(&Chunk, f32)> {
        if k == 0 || self.entries.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(&Chunk, f32)> = self
            .entries
            .iter()
            .map(|entry| (&entry.chunk, cosine_similarity(query, &entry.embedding)))
            .collect();

        // Stable sort keeps insertion order for equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity; zero-length or mismatched vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Identifies which document and chunking settings produced a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFingerprint {
    pub document_hash: String,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separator: String,
}

/// Serialized index, reused across restarts when the fingerprint matches
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub fingerprint: IndexFingerprint,
    pub built_at: DateTime<Utc>,
    pub chunks: Vec<IndexedChunk>,
}

impl IndexSnapshot {
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(SNAPSHOT_FILE)
    }

    /// Load a snapshot if one exists and matches the fingerprint.
    pub fn load_matching(
        data_dir: &Path,
        fingerprint: &IndexFingerprint,
    ) -> ServiceResult<Option<IndexSnapshot>> {
        let path = Self::path_in(data_dir);
        if !path.is_file() {
            return Ok(None);
        }

        let file = File::open(&path).map_err(ProcessingError::Io)?;
        let snapshot: IndexSnapshot = match serde_json::from_reader(BufReader::new(file)) {
            Ok(s) => s,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Ignoring unreadable index snapshot");
                return Ok(None);
            }
        };

        if &snapshot.fingerprint != fingerprint {
            info!(path = %path.display(), "Index snapshot is stale, rebuilding");
            return Ok(None);
        }

        Ok(Some(snapshot))
    }

    /// Write the snapshot atomically (temp file in the same directory, then rename).
    pub fn save(&self, data_dir: &Path) -> ServiceResult<PathBuf> {
        std::fs::create_dir_all(data_dir).map_err(ProcessingError::Io)?;
        let path = Self::path_in(data_dir);

        let mut temp = tempfile::NamedTempFile::new_in(data_dir).map_err(ProcessingError::Io)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer(&mut writer, self).map_err(|e| ServiceError::Internal {
                message: format!("Failed to serialize index snapshot: {}", e),
            })?;
            writer.flush().map_err(ProcessingError::Io)?;
        }
        temp.persist(&path)
            .map_err(|e| ServiceError::Processing(ProcessingError::Io(e.error)))?;

        Ok(path)
    }

    pub fn into_index(self) -> ServiceResult<VectorIndex> {
        let mut index = VectorIndex::new();
        for entry in self.chunks {
            index.insert(entry.chunk, entry.embedding)?;
        }
        Ok(index)
    }
}

/// SHA-256 of a file's contents as lowercase hex.
pub fn document_hash(path: &Path) -> ServiceResult<String> {
    let file = File::open(path).map_err(ProcessingError::Io)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut BufReader::new(file), &mut hasher).map_err(ProcessingError::Io)?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn chunk(index: usize, content: &str) -> Chunk {
        Chunk {
            id: format!("chunk-{}", index),
            content: content.to_string(),
            chunk_index: index,
            page_number: Some(1),
            section_title: None,
        }
    }

    fn fingerprint() -> IndexFingerprint {
        IndexFingerprint {
            document_hash: "abc".to_string(),
            embedding_model: "embedding-001".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            separator: "\n\n".to_string(),
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_similarity_search_orders_and_limits() {
        let mut index = VectorIndex::new();
        index.insert(chunk(0, "beaches"), vec![0.0, 1.0]).unwrap();
        index.insert(chunk(1, "port"), vec![1.0, 0.0]).unwrap();
        index.insert(chunk(2, "harbour"), vec![0.9, 0.1]).unwrap();
        index.insert(chunk(3, "temples"), vec![-1.0, 0.0]).unwrap();

        let results = index.similarity_search(&[1.0, 0.0], 3);
        let contents: Vec<&str> = results.iter().map(|(c, _)| c.content.as_str()).collect();
        assert_eq!(contents, vec!["port", "harbour", "beaches"]);

        assert!(index.similarity_search(&[1.0, 0.0], 0).is_empty());
        assert_eq!(index.similarity_search(&[1.0, 0.0], 10).len(), 4);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = VectorIndex::new();
        index.insert(chunk(0, "first"), vec![1.0, 0.0]).unwrap();
        index.insert(chunk(1, "second"), vec![2.0, 0.0]).unwrap();

        let results = index.similarity_search(&[1.0, 0.0], 2);
        assert_eq!(results[0].0.content, "first");
        assert_eq!(results[1].0.content, "second");
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut index = VectorIndex::new();
        index.insert(chunk(0, "a"), vec![1.0, 0.0]).unwrap();
        let err = index.insert(chunk(1, "b"), vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Embedding(EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert_eq!(index.len(), 1);

        let mut empty = VectorIndex::new();
        assert!(empty.insert(chunk(2, "c"), vec![]).is_err());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_snapshot_round_trip_and_staleness() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = IndexSnapshot {
            fingerprint: fingerprint(),
            built_at: Utc::now(),
            chunks: vec![IndexedChunk {
                chunk: chunk(0, "port city"),
                embedding: vec![0.5, 0.5],
            }],
        };
        let path = snapshot.save(dir.path()).unwrap();
        assert!(path.ends_with(SNAPSHOT_FILE));

        let loaded = IndexSnapshot::load_matching(dir.path(), &fingerprint())
            .unwrap()
            .unwrap();
        let index = loaded.into_index().unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.dimension(), Some(2));

        let mut other = fingerprint();
        other.chunk_size = 500;
        assert!(
            IndexSnapshot::load_matching(dir.path(), &other)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_missing_or_corrupt_snapshot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            IndexSnapshot::load_matching(dir.path(), &fingerprint())
                .unwrap()
                .is_none()
        );

        std::fs::write(IndexSnapshot::path_in(dir.path()), b"{not json").unwrap();
        assert!(
            IndexSnapshot::load_matching(dir.path(), &fingerprint())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_document_hash() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        assert_eq!(
            document_hash(file.path()).unwrap(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }
}
