//! Topic-partition detection with single-turn conversational memory.
//!
//! A question naming exactly one known place resolves to that place's partition. A
//! question naming none inherits the partition of the last question that named one.
//! A question naming several is searched broadly.


use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::lexical::normalize;

/// Keyword table mapping partitions to the terms that identify them.
///
/// Keywords are stored NFKC-normalized and lowercased; matching is by substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionKeywords {
    entries: Vec<(String, Vec<String>)>,
}

/// Error parsing a `partition=kw1|kw2;...` keyword table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTableError {
    pub entry: String,
}

impl fmt::Display for KeywordTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid partition keyword entry '{}'", self.entry)
    }
}

impl std::error::Error for KeywordTableError {}

impl Default for PartitionKeywords {
    fn default() -> Self {
        Self::new([
            ("kusatsu", vec!["草津", "kusatsu"]),
            ("hakone", vec!["箱根", "hakone"]),
            ("beppu", vec!["別府", "beppu"]),
            ("arima", vec!["有馬", "arima"]),
        ])
    }
}

impl PartitionKeywords {
    pub fn new<I, P, K>(table: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<K>)>,
        P: Into<String>,
        K: AsRef<str>,
    {
        let entries = table
            .into_iter()
            .map(|(partition, keywords)| {
                let keywords = keywords
                    .iter()
                    .map(|k| normalize(k.as_ref().trim()))
                    .filter(|k| !k.is_empty())
                    .collect();
                (partition.into(), keywords)
            })
            .collect();
        Self { entries }
    }

    /// Parses `part=kw1|kw2;part2=kw3`.
    pub fn parse(raw: &str) -> Result<Self, KeywordTableError> {
        let mut table: Vec<(String, Vec<String>)> = Vec::new();
        for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (partition, keywords) =
                entry.split_once('=').ok_or_else(|| KeywordTableError {
                    entry: entry.to_string(),
                })?;
            let partition = partition.trim();
            let keywords: Vec<String> = keywords
                .split('|')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
            if partition.is_empty() || keywords.is_empty() {
                return Err(KeywordTableError {
                    entry: entry.to_string(),
                });
            }
            table.push((partition.to_string(), keywords));
        }
        Ok(Self::new(table))
    }

    pub fn partitions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the keyword scan found in a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    None,
    Single(String),
    /// Several partitions matched, in table order.
    Ambiguous(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub last_topic_partition: Option<String>,
}

impl ConversationState {
    pub fn with_partition(partition: impl Into<String>) -> Self {
        Self {
            last_topic_partition: Some(partition.into()),
        }
    }
}

/// Outcome of resolving one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Partition to search, or `None` for a broad search.
    pub partition: Option<String>,
    /// True when `partition` came from the prior turn rather than the question.
    pub carried_forward: bool,
    /// State to keep for the next turn.
    pub state: ConversationState,
}

#[derive(Debug, Clone, Default)]
pub struct ContextResolver {
    keywords: PartitionKeywords,
}

impl ContextResolver {
    pub fn new(keywords: PartitionKeywords) -> Self {
        Self { keywords }
    }

    pub fn keywords(&self) -> &PartitionKeywords {
        &self.keywords
    }

    pub fn detect(&self, question: &str) -> Detection {
        let normalized = normalize(question);
        let mut matched: Vec<String> = self
            .keywords
            .entries
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| normalized.contains(k.as_str())))
            .map(|(partition, _)| partition.clone())
            .collect();
        matched.dedup();

        match matched.len() {
            0 => Detection::None,
            1 => Detection::Single(matched.remove(0)),
            _ => Detection::Ambiguous(matched),
        }
    }

    pub fn resolve(&self, question: &str, prior: &ConversationState) -> Resolution {
        let resolution = match self.detect(question) {
            Detection::Single(partition) => Resolution {
                partition: Some(partition.clone()),
                carried_forward: false,
                state: ConversationState::with_partition(partition),
            },
            Detection::None => Resolution {
                partition: prior.last_topic_partition.clone(),
                carried_forward: prior.last_topic_partition.is_some(),
                state: prior.clone(),
            },
            Detection::Ambiguous(_) => Resolution {
                partition: None,
                carried_forward: false,
                state: prior.clone(),
            },
        };

        debug!(
            partition = ?resolution.partition,
            carried_forward = resolution.carried_forward,
            "Resolved topic partition"
        );
        resolution
    }

    /// Replays earlier user turns to reconstruct the conversation state they imply.
    pub fn replay<'a, I>(&self, turns: I) -> ConversationState
    where
        I: IntoIterator<Item = &'a str>,
    {
        turns
            .into_iter()
            .fold(ConversationState::default(), |state, turn| {
                self.resolve(turn, &state).state
            })
    }
}

/// Shared conversation state; concurrent updates are last-writer-wins.
#[derive(Debug, Clone, Default)]
pub struct ConversationHandle {
    inner: Arc<RwLock<ConversationState>>,
}

impl ConversationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ConversationState {
        self.inner.read().clone()
    }

    pub fn store(&self, state: ConversationState) {
        *self.inner.write() = state;
    }

    pub fn reset(&self) {
        self.store(ConversationState::default());
    }
}
