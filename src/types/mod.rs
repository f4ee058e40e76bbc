pub mod error;
pub mod identifiers;
pub mod selection;

pub use error::{EpigramError, ImportError, NotFoundError, StoreError, ValidationError};
pub use identifiers::{CategoryId, ImpressionId, ItemId};
pub use selection::{Selection, SelectionMetadata};
