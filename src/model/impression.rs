use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::identifiers::{CategoryId, ImpressionId, ItemId};

/// Append-only record of one selection event.
///
/// `category_id` is copied from the item when it was shown and is not
/// rewritten if the item later moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impression {
    pub id: ImpressionId,
    pub item_id: ItemId,
    pub category_id: CategoryId,
    pub shown_at: DateTime<Utc>,
    pub saved: bool,
    pub annotation: Option<String>,
}
