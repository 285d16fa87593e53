//! Chunk record (on-disk) and passage (in-memory) types.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::UNKNOWN_PARTITION;

/// A metadata field that may be written either as a single string or as a list.
///
/// Round-trips in the shape it was read in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::One(String::new())
    }
}

impl OneOrMany {
    /// Non-empty values, trimmed.
    pub fn values(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            OneOrMany::One(s) => vec![s.as_str()],
            OneOrMany::Many(items) => items.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub category: OneOrMany,
    #[serde(default)]
    pub area: OneOrMany,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<OneOrMany>,
    /// Older chunk files carry `keywords` instead of `tags`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<OneOrMany>,
}

impl ChunkMetadata {
    /// `tags`, falling back to `keywords` when `tags` is absent or empty.
    pub fn topic_tags(&self) -> Vec<String> {
        let tags = self.tags.as_ref().map(OneOrMany::values).unwrap_or_default();
        if !tags.is_empty() {
            return tags;
        }
        self.keywords
            .as_ref()
            .map(OneOrMany::values)
            .unwrap_or_default()
    }
}

/// One persisted chunk, as found in the corpus JSON files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub metadata: ChunkMetadata,
    #[serde(default)]
    pub content: String,
}

/// Topic partition implied by a chunk id: the text before the first `_`.
///
/// `"onsen_knowledge_001"` belongs to `"onsen"`. An empty id maps to `"unknown"`.
pub fn partition_from_id(id: &str) -> String {
    match id.split('_').next() {
        Some(prefix) if !prefix.is_empty() => prefix.to_string(),
        _ => UNKNOWN_PARTITION.to_string(),
    }
}

/// A retrievable unit of text.
///
/// Created at load time and never mutated afterwards.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
pub struct Passage {
    pub id: String,
    pub content: String,
    pub section: String,
    pub source_document: String,
    pub category: Vec<String>,
    pub area: Vec<String>,
    /// Sorted, deduplicated.
    pub topic_tags: Vec<String>,
    pub topic_partition: String,
}

impl Passage {
    /// Builds a passage with the partition derived from `id`.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        let id = id.into();
        let topic_partition = partition_from_id(&id);
        Self {
            id,
            content: content.into(),
            section: String::new(),
            source_document: String::new(),
            category: Vec::new(),
            area: Vec::new(),
            topic_tags: Vec::new(),
            topic_partition,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_document = source.into();
        self
    }

    /// Overrides the partition derived from the id.
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.topic_partition = partition.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        tags.sort();
        tags.dedup();
        self.topic_tags = tags;
        self
    }

    pub fn with_category(mut self, category: Vec<String>) -> Self {
        self.category = category;
        self
    }

    pub fn with_area(mut self, area: Vec<String>) -> Self {
        self.area = area;
        self
    }
}

impl From<ChunkRecord> for Passage {
    fn from(record: ChunkRecord) -> Self {
        let topic_tags = record.metadata.topic_tags();
        Passage::new(record.chunk_id, record.content)
            .with_section(record.section)
            .with_source(record.metadata.source)
            .with_tags(topic_tags)
            .with_category(record.metadata.category.values())
            .with_area(record.metadata.area.values())
    }
}
