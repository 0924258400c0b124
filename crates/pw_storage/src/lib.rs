use std::sync::Arc;

use pw_core::{DocumentStore, Error, Result};

pub mod backends;

pub use backends::memory::MemoryStore;

/// Instantiate a document store by backend name.
pub fn create_store(kind: &str) -> Result<Arc<dyn DocumentStore>> {
    match kind {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        other => Err(Error::Storage(format!(
            "unknown storage backend: {}",
            other
        ))),
    }
}

pub mod prelude {
    pub use super::backends::memory::MemoryStore;
    pub use super::create_store;
    pub use pw_core::DocumentStore;
}
