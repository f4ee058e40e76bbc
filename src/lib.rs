//! Fair-share weighted epigram selection with durable impression tracking.
//!
//! `epigram-core` keeps a categorized collection of short texts in SQLite,
//! picks one per request, and records every pick. Categories carry a target
//! weight; categories that have already received more than their share of
//! impressions sit out until the rest catch up, and within a category the
//! least recently shown items come first with a small random skip.

pub mod config;
pub mod import;
pub mod model;
pub mod selection;
pub mod store;
pub mod types;

pub use config::{RcFile, SelectionConfig};
pub use import::{FortuneSource, ImportRecord};
pub use model::{Category, Impression, Item};
pub use selection::{CategoryShare, FairSharePolicy, FetchRatioJitter, Selector};
pub use store::{EpigramStore, ImportSummary};
pub use types::{EpigramError, Selection};
