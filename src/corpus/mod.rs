//! Passage corpus: persisted chunk records and their typed in-memory form.
//!
//! Chunk files hold a JSON array of [`ChunkRecord`]s. [`load_chunk_files`] turns them
//! into [`Passage`]s, which are immutable once loaded and shared via `Arc`.

pub mod error;
pub mod loader;
pub mod model;

#[cfg(test)]
mod tests;

pub use error::CorpusError;
pub use loader::{discover_chunk_files, load_chunk_files};
pub use model::{ChunkMetadata, ChunkRecord, OneOrMany, Passage, partition_from_id};
