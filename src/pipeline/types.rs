use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheStatus;
use crate::scoring::FinalResult;

/// Who said a prior conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: TurnRole,
    pub content: String,
}

impl HistoryTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Result of a search-only query.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub result: Arc<FinalResult>,
    pub partition: Option<String>,
    pub elapsed: Duration,
}

/// Result of a conversational query.
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub result: Arc<FinalResult>,
    pub partition: Option<String>,
    /// The partition came from an earlier turn.
    pub carried_forward: bool,
    pub cache: CacheStatus,
    pub elapsed: Duration,
}
