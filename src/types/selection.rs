use serde::{Deserialize, Serialize};

use crate::model::{Impression, Item};

/// Metadata describing how a selection was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionMetadata {
    /// Name of the category the item was drawn from, if one was chosen.
    pub category: Option<String>,
    /// True when the caller named the category explicitly.
    pub filtered: bool,

    pub eligible_categories: usize,
    pub candidates_considered: usize,
    pub offset: usize,
}

/// The outcome of a single selection request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub item: Item,
    /// `None` only for the no-results sentinel; nothing was recorded.
    pub impression: Option<Impression>,
    pub selection: SelectionMetadata,
}

impl Selection {
    pub fn is_no_results(&self) -> bool {
        self.item.is_no_results()
    }
}
