use serde::{Deserialize, Serialize};

use crate::types::error::ValidationError;
use crate::types::identifiers::CategoryId;

/// Weight given to a category that was created implicitly by an import.
pub const DEFAULT_WEIGHT: u32 = 1;

/// A named grouping of items with a target share of impressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub weight: u32,
}

/// Checks an operator-supplied weight.
pub fn validate_weight(weight: i64) -> Result<u32, ValidationError> {
    if weight <= 0 {
        return Err(ValidationError::NonPositiveWeight(weight));
    }
    u32::try_from(weight).map_err(|_| ValidationError::WeightTooLarge(weight))
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyCategoryName);
    }
    Ok(())
}
