pub mod enrich;
pub mod error;
pub mod store;
pub mod types;

pub use enrich::EnrichmentClient;
pub use error::{Error, Result};
pub use store::DocumentStore;
pub use types::{Analysis, Article, Batch, BatchStatus, PERSONAL_SEARCH_ID};
