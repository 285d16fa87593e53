use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::error::CorpusError;
use super::model::{ChunkRecord, Passage};

/// Lists `*.json` files directly under `dir`, sorted by path.
///
/// A missing directory yields an empty list.
pub fn discover_chunk_files(dir: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    if !dir.exists() {
        warn!(dir = %dir.display(), "Chunk directory does not exist");
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|source| CorpusError::ReadFailed {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    debug!(dir = %dir.display(), files = files.len(), "Discovered chunk files");
    Ok(files)
}

/// Reads every chunk file in order and converts the records into passages.
///
/// Missing files are skipped with a warning. A file that exists but does not parse is an
/// error. Records whose id was already seen are dropped (the first occurrence wins).
pub fn load_chunk_files(paths: &[PathBuf]) -> Result<Vec<Passage>, CorpusError> {
    let mut passages = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for path in paths {
        if !path.exists() {
            warn!(path = %path.display(), "Chunk file not found, skipping");
            continue;
        }

        let raw = fs::read_to_string(path).map_err(|source| CorpusError::ReadFailed {
            path: path.clone(),
            source,
        })?;
        let records: Vec<ChunkRecord> =
            serde_json::from_str(&raw).map_err(|source| CorpusError::ParseFailed {
                path: path.clone(),
                source,
            })?;

        let mut loaded = 0usize;
        for record in records {
            if !seen.insert(record.chunk_id.clone()) {
                warn!(chunk_id = %record.chunk_id, path = %path.display(), "Duplicate chunk id, skipping");
                continue;
            }
            passages.push(Passage::from(record));
            loaded += 1;
        }
        debug!(path = %path.display(), loaded, "Loaded chunk file");
    }

    if passages.is_empty() {
        return Err(CorpusError::NoChunks);
    }

    info!(passages = passages.len(), "Chunk records loaded");
    Ok(passages)
}
