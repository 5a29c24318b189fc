use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Reserved id of the singleton default notebook.
pub const DEFAULT_NOTEBOOK_ID: &str = "default";

/// A notebook grouping notes.
///
/// Exactly one notebook has `is_default = true` at all times. It is seeded
/// at database creation, recreated lazily if missing, and never deletable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub is_default: bool,
}

impl Notebook {
    /// A new unsaved notebook.
    pub fn draft(name: impl Into<String>) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: String::new(),
            name: name.into(),
            description: String::new(),
            created_at: now,
            updated_at: now,
            is_default: false,
        }
    }

    /// The default notebook with its reserved id.
    pub fn default_notebook() -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: DEFAULT_NOTEBOOK_ID.to_string(),
            name: "Default".to_string(),
            description: "Default notebook".to_string(),
            created_at: now,
            updated_at: now,
            is_default: true,
        }
    }
}
