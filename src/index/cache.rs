//! Fingerprint-validated persistence of built indexes.
//!
//! Layout under the cache directory:
//! - `index.fingerprint`: hex fingerprint of the corpus the snapshot was built from
//! - `index.rkyv`: the [`IndexSnapshot`] archive
//!
//! The sidecar is compared first so a changed corpus is detected without mapping the
//! snapshot. Any read or validation failure falls through to a rebuild.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use super::error::IndexError;
use super::snapshot::IndexSnapshot;
use super::{CorpusIndex, IndexFingerprint, IndexOrigin, IndexParts, LexicalIndexes};
use crate::constants::{FINGERPRINT_FILENAME, SNAPSHOT_FILENAME};
use crate::corpus::Passage;
use crate::embedding::{EmbedKind, Embedder};
use crate::hashing::digest_contents;
use crate::vectordb::VectorBackend;

#[derive(Debug, Clone)]
pub struct IndexCache {
    dir: PathBuf,
    backend: VectorBackend,
    general_partition: String,
}

impl IndexCache {
    pub fn new(
        dir: impl Into<PathBuf>,
        backend: VectorBackend,
        general_partition: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            backend,
            general_partition: general_partition.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILENAME)
    }

    pub fn fingerprint_path(&self) -> PathBuf {
        self.dir.join(FINGERPRINT_FILENAME)
    }

    /// The fingerprint recorded by the last successful build, if readable.
    pub fn stored_fingerprint(&self) -> Option<IndexFingerprint> {
        match fs::read_to_string(self.fingerprint_path()) {
            Ok(raw) if !raw.trim().is_empty() => Some(IndexFingerprint::from_stored(&raw)),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "No stored index fingerprint");
                None
            }
        }
    }

    /// Restores the index for `passages` from disk when the fingerprint matches, otherwise
    /// embeds every passage and persists a fresh snapshot.
    #[instrument(skip_all, fields(passages = passages.len()))]
    pub async fn load_or_build(
        &self,
        passages: Vec<Passage>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<CorpusIndex, IndexError> {
        if passages.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }

        let fingerprint = IndexFingerprint::compute(&passages);
        let digest = digest_contents(passages.iter().map(|p| p.content.as_str()));

        let restored = match self.stored_fingerprint() {
            Some(stored) if stored == fingerprint => {
                self.try_restore(&fingerprint, &digest, &passages, embedder.dimension())
                    .await
            }
            Some(stored) => {
                info!(%stored, current = %fingerprint, "Corpus changed, rebuilding index");
                None
            }
            None => {
                info!(current = %fingerprint, "No index snapshot, building index");
                None
            }
        };

        let (vectors, origin) = match restored {
            Some(vectors) => (vectors, IndexOrigin::Snapshot),
            None => {
                let vectors = embed_passages(&passages, Arc::clone(&embedder)).await?;
                if let Err(e) = self
                    .persist(&fingerprint, &digest, &passages, &vectors, embedder.dimension())
                    .await
                {
                    warn!(error = %e, "Failed to persist index snapshot, serving unpersisted index");
                }
                (vectors, IndexOrigin::Built)
            }
        };

        let passages: Vec<Arc<Passage>> = passages.into_iter().map(Arc::new).collect();
        let lexical = {
            let passages = passages.clone();
            tokio::task::spawn_blocking(move || LexicalIndexes::build(&passages))
                .await
                .map_err(|e| IndexError::TaskFailed {
                    reason: e.to_string(),
                })?
        };

        let store = self
            .backend
            .open(fingerprint.as_str(), embedder.dimension())
            .await?;

        let index = CorpusIndex::assemble(
            IndexParts {
                passages,
                vectors,
                lexical,
                fingerprint,
                origin,
            },
            store,
            &self.general_partition,
        )
        .await?;

        info!(
            passages = index.len(),
            origin = ?index.origin(),
            fingerprint = %index.fingerprint(),
            "Corpus index ready"
        );
        Ok(index)
    }

    async fn try_restore(
        &self,
        fingerprint: &IndexFingerprint,
        digest: &str,
        passages: &[Passage],
        dimension: usize,
    ) -> Option<Vec<Vec<f32>>> {
        let path = self.snapshot_path();
        let snapshot = match tokio::task::spawn_blocking(move || IndexSnapshot::read_mapped(&path))
            .await
        {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                warn!(error = %e, "Index snapshot unreadable, rebuilding");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Index snapshot task failed, rebuilding");
                return None;
            }
        };

        let ids_match = snapshot.passages.len() == passages.len()
            && snapshot
                .passages
                .iter()
                .zip(passages)
                .all(|(stored, current)| stored.id == current.id);

        if snapshot.fingerprint != fingerprint.as_str()
            || snapshot.content_digest != digest
            || !ids_match
        {
            warn!("Index snapshot does not match the corpus, rebuilding");
            return None;
        }
        if snapshot.dimension as usize != dimension
            || snapshot.vectors.iter().any(|v| v.len() != dimension)
        {
            warn!(
                stored = snapshot.dimension,
                expected = dimension,
                "Index snapshot has a different embedding dimension, rebuilding"
            );
            return None;
        }

        debug!(passages = passages.len(), "Restored vectors from snapshot");
        Some(snapshot.vectors)
    }

    async fn persist(
        &self,
        fingerprint: &IndexFingerprint,
        digest: &str,
        passages: &[Passage],
        vectors: &[Vec<f32>],
        dimension: usize,
    ) -> Result<(), IndexError> {
        let snapshot = IndexSnapshot {
            fingerprint: fingerprint.as_str().to_string(),
            content_digest: digest.to_string(),
            created_at: chrono::Utc::now().timestamp(),
            dimension: dimension as u32,
            passages: passages.to_vec(),
            vectors: vectors.to_vec(),
        };
        let snapshot_path = self.snapshot_path();
        let fingerprint_path = self.fingerprint_path();
        let fingerprint = fingerprint.as_str().to_string();

        tokio::task::spawn_blocking(move || {
            snapshot.write_atomic(&snapshot_path)?;
            write_fingerprint(&fingerprint_path, &fingerprint)
        })
        .await
        .map_err(|e| IndexError::TaskFailed {
            reason: e.to_string(),
        })??;

        debug!(dir = %self.dir.display(), "Index snapshot persisted");
        Ok(())
    }
}

fn write_fingerprint(path: &Path, fingerprint: &str) -> Result<(), IndexError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(fingerprint.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| IndexError::Io(e.error))?;
    Ok(())
}

async fn embed_passages(
    passages: &[Passage],
    embedder: Arc<dyn Embedder>,
) -> Result<Vec<Vec<f32>>, IndexError> {
    let texts: Vec<String> = passages.iter().map(|p| p.content.clone()).collect();
    let expected = texts.len();

    let vectors = tokio::task::spawn_blocking(move || {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        embedder.embed_batch(&refs, EmbedKind::Passage)
    })
    .await
    .map_err(|e| IndexError::TaskFailed {
        reason: e.to_string(),
    })??;

    if vectors.len() != expected {
        return Err(IndexError::TaskFailed {
            reason: format!("embedded {} of {expected} passages", vectors.len()),
        });
    }
    info!(passages = expected, "Embedded passages");
    Ok(vectors)
}
