pub mod category;
pub mod impression;
pub mod item;

pub use crate::types::identifiers::{CategoryId, ImpressionId, ItemId};
pub use category::{Category, DEFAULT_WEIGHT};
pub use impression::Impression;
pub use item::{Item, NO_RESULTS_CONTENT};
