//! Persisted embedding cache.
//!
//! The cache directory holds two files:
//!
//! - `embeddings.f32` - a dense little-endian `f32` matrix, row-major, one
//!   row per chunk in build order
//! - `manifest.json` - `{ format_version, key, rows, dims, model_id }`
//!
//! The key is a SHA-256 over the embedding model identity and every chunk
//! text, so an edited corpus or a different model never reuses stale vectors.
//! The cache is an optimization only: a miss or unreadable cache just means
//! the embeddings are recomputed.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::document::Chunk;
use crate::error::{RagError, Result};

const FORMAT_VERSION: u32 = 1;
const MANIFEST_FILE: &str = "manifest.json";
const MATRIX_FILE: &str = "embeddings.f32";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Manifest {
    format_version: u32,
    key: String,
    rows: usize,
    dims: usize,
    model_id: String,
}

/// Compute the cache key for a chunk sequence embedded by `model_id`.
///
/// Texts are length-prefixed so that no two distinct sequences collide by
/// concatenation.
pub fn cache_key(model_id: &str, dimensions: usize, chunks: &[Chunk]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(FORMAT_VERSION.to_le_bytes());
    hasher.update((model_id.len() as u64).to_le_bytes());
    hasher.update(model_id.as_bytes());
    hasher.update((dimensions as u64).to_le_bytes());
    hasher.update((chunks.len() as u64).to_le_bytes());
    for chunk in chunks {
        hasher.update((chunk.text.len() as u64).to_le_bytes());
        hasher.update(chunk.text.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// A directory-backed store for one embedding matrix.
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    dir: PathBuf,
}

impl EmbeddingCache {
    /// Use `dir` as the cache location. Nothing is created until [`store`](Self::store).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    fn matrix_path(&self) -> PathBuf {
        self.dir.join(MATRIX_FILE)
    }

    /// Load the matrix stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing is cached, the key differs, or the
    /// stored shape does not match `rows x dims`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CacheError`] if a present cache cannot be read or decoded.
    pub fn load(&self, key: &str, rows: usize, dims: usize) -> Result<Option<Vec<f32>>> {
        let manifest_path = self.manifest_path();
        if !manifest_path.exists() {
            debug!(path = %manifest_path.display(), "no embedding cache manifest");
            return Ok(None);
        }

        let raw = fs::read(&manifest_path).map_err(|e| {
            RagError::CacheError(format!("failed to read {}: {e}", manifest_path.display()))
        })?;
        let manifest: Manifest = serde_json::from_slice(&raw).map_err(|e| {
            RagError::CacheError(format!("failed to decode {}: {e}", manifest_path.display()))
        })?;

        if manifest.format_version != FORMAT_VERSION || manifest.key != key {
            debug!(cached_key = %manifest.key, key, "embedding cache key mismatch");
            return Ok(None);
        }
        if manifest.rows != rows || manifest.dims != dims {
            warn!(
                cached_rows = manifest.rows,
                cached_dims = manifest.dims,
                rows,
                dims,
                "embedding cache shape mismatch"
            );
            return Ok(None);
        }

        let matrix_path = self.matrix_path();
        let bytes = match fs::read(&matrix_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RagError::CacheError(format!(
                    "failed to read {}: {e}",
                    matrix_path.display()
                )));
            }
        };

        if bytes.len() != rows * dims * 4 {
            warn!(
                expected_bytes = rows * dims * 4,
                actual_bytes = bytes.len(),
                "embedding cache file truncated"
            );
            return Ok(None);
        }

        let matrix = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(Some(matrix))
    }

    /// Persist `matrix` under `key`, replacing any previous contents.
    ///
    /// Each file is written to a temporary sibling and renamed into place.
    pub fn store(&self, key: &str, model_id: &str, dims: usize, matrix: &[f32]) -> Result<()> {
        if dims == 0 || matrix.len() % dims != 0 {
            return Err(RagError::CacheError(format!(
                "matrix of {} values is not a whole number of {dims}-wide rows",
                matrix.len()
            )));
        }

        fs::create_dir_all(&self.dir).map_err(|e| {
            RagError::CacheError(format!("failed to create {}: {e}", self.dir.display()))
        })?;

        let mut bytes = Vec::with_capacity(matrix.len() * 4);
        for value in matrix {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        write_atomic(&self.matrix_path(), &bytes)?;

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            key: key.to_string(),
            rows: matrix.len() / dims,
            dims,
            model_id: model_id.to_string(),
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| RagError::CacheError(format!("failed to encode manifest: {e}")))?;
        write_atomic(&self.manifest_path(), &json)?;

        debug!(dir = %self.dir.display(), rows = manifest.rows, dims, "stored embedding cache");
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)
        .map_err(|e| RagError::CacheError(format!("failed to write {}: {e}", tmp.display())))?;
    fs::rename(&tmp, path)
        .map_err(|e| RagError::CacheError(format!("failed to rename {}: {e}", tmp.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Chunker, Document, RecursiveChunker};

    fn chunks(text: &str) -> Vec<Chunk> {
        RecursiveChunker::new(64, 8).chunk(&Document::new("d", text)).unwrap()
    }

    #[test]
    fn key_depends_on_text_and_model() {
        let a = chunks("the claim is false");
        let b = chunks("the claim is true");
        assert_eq!(cache_key("m", 4, &a), cache_key("m", 4, &a));
        assert_ne!(cache_key("m", 4, &a), cache_key("m", 4, &b));
        assert_ne!(cache_key("m", 4, &a), cache_key("n", 4, &a));
        assert_ne!(cache_key("m", 4, &a), cache_key("m", 8, &a));
    }

    #[test]
    fn store_then_load_under_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::new(dir.path().join("cache"));
        let matrix = vec![1.0, -0.5, 0.25, 2.0];

        assert!(cache.load("k", 2, 2).unwrap().is_none());
        cache.store("k", "model", 2, &matrix).unwrap();
        assert_eq!(cache.load("k", 2, 2).unwrap(), Some(matrix));
        assert!(cache.load("other", 2, 2).unwrap().is_none());
        assert!(cache.load("k", 4, 1).unwrap().is_none());
    }

    #[test]
    fn truncated_matrix_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::new(dir.path());
        cache.store("k", "model", 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        fs::write(dir.path().join(MATRIX_FILE), [0u8; 6]).unwrap();
        assert!(cache.load("k", 2, 2).unwrap().is_none());
    }

    #[test]
    fn corrupt_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), b"{not json").unwrap();
        let cache = EmbeddingCache::new(dir.path());
        assert!(matches!(cache.load("k", 1, 1), Err(RagError::CacheError(_))));
    }
}
