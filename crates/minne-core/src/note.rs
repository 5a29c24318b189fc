use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::notebook::DEFAULT_NOTEBOOK_ID;

/// A note with all fields.
///
/// Timestamps are epoch milliseconds. A blank `id` marks a draft that has
/// not been saved yet; the repository assigns an id on first save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
    /// Cleared on every edit; only an external sync collaborator sets it.
    #[serde(default)]
    pub is_synced: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_deleted: bool,
    pub notebook_id: String,
}

impl Note {
    /// A new unsaved note in the default notebook.
    pub fn draft() -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: String::new(),
            title: String::new(),
            content: String::new(),
            created_at: now,
            updated_at: now,
            is_synced: false,
            tags: Vec::new(),
            is_favorite: false,
            is_archived: false,
            is_deleted: false,
            notebook_id: DEFAULT_NOTEBOOK_ID.to_string(),
        }
    }
}
