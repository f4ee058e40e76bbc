pub(crate) mod queries;
pub mod schema;
pub mod store;

pub use schema::SCHEMA_VERSION;
pub use store::{EpigramStore, ImportSummary};
