pub mod fortune;

use serde::{Deserialize, Serialize};

use crate::types::error::EpigramError;
pub use fortune::{parse_fortunes, FortuneRecords, FortuneSource};

/// One piece of content and the name of the category it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub content: String,
    pub category: String,
}

impl ImportRecord {
    pub fn new(content: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            category: category.into(),
        }
    }
}

/// Adapt plain `(content, category)` pairs into an infallible import stream.
pub fn records<I, C, N>(pairs: I) -> impl Iterator<Item = Result<ImportRecord, EpigramError>>
where
    I: IntoIterator<Item = (C, N)>,
    C: Into<String>,
    N: Into<String>,
{
    pairs
        .into_iter()
        .map(|(content, category)| Ok(ImportRecord::new(content, category)))
}
