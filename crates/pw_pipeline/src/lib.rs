pub mod enrich;
pub mod history;
pub mod import;
pub mod query;
pub mod registry;

pub use enrich::{EnrichOptions, EnrichmentCoordinator, EnrichmentReport, FailedArticle};
pub use history::{BatchSummary, HistoryService};
pub use import::{ImportCoordinator, ImportReport, NewArticle, RejectedItem};
pub use query::{ExportMode, ExportPayload, QueryEngine};
pub use registry::BatchRegistry;

pub mod prelude {
    pub use crate::enrich::{EnrichOptions, EnrichmentCoordinator, EnrichmentReport};
    pub use crate::history::HistoryService;
    pub use crate::import::{ImportCoordinator, NewArticle};
    pub use crate::query::{ExportMode, QueryEngine};
    pub use crate::registry::BatchRegistry;
    pub use pw_core::{Article, Batch, BatchStatus, DocumentStore, EnrichmentClient, Error, Result};
}
