use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::error::ValidationError;
use crate::types::identifiers::{CategoryId, ItemId};

/// Content handed back when a selection finds nothing to show.
pub const NO_RESULTS_CONTENT: &str = "Your princess is in another castle. (404: File Not Found)";

/// One unit of selectable content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub category_id: CategoryId,
    pub content: String,
    /// `None` until the item is selected for the first time.
    pub last_shown_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Build a fresh, never-shown item.
    ///
    /// This is the only way new items enter the store; it enforces that the
    /// content is non-blank and hands out a new random identity.
    pub fn new(content: impl Into<String>, category_id: CategoryId) -> Result<Self, ValidationError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }

        Ok(Item {
            id: ItemId::generate(),
            category_id,
            content,
            last_shown_at: None,
        })
    }

    /// The well-known "nothing to show" item.
    pub fn no_results() -> Self {
        Item {
            id: ItemId::nil(),
            category_id: CategoryId::new(0),
            content: NO_RESULTS_CONTENT.to_string(),
            last_shown_at: None,
        }
    }

    pub fn is_no_results(&self) -> bool {
        self.id.is_nil()
    }
}
