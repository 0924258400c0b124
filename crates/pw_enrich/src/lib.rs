use std::sync::Arc;

use pw_core::{EnrichmentClient, Error, Result};

pub mod clients;

pub use clients::heuristic::HeuristicClient;
pub use clients::remote::RemoteClient;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub client_name: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// Instantiate an enrichment client by name. Defaults to the offline
/// heuristic client when no name is given.
pub fn create_client(config: Config) -> Result<Arc<dyn EnrichmentClient>> {
    match config.client_name.as_deref().unwrap_or("heuristic") {
        "heuristic" => Ok(Arc::new(HeuristicClient::new())),
        "remote" => {
            let base_url = config.base_url.ok_or_else(|| {
                Error::invalid_input("base_url", "required for the remote client")
            })?;
            Ok(Arc::new(RemoteClient::new(base_url, config.api_key)?))
        }
        other => Err(Error::Enrichment(format!(
            "unknown enrichment client: {}",
            other
        ))),
    }
}

pub mod prelude {
    pub use super::{create_client, Config};
    pub use pw_core::{Analysis, EnrichmentClient, Error, Result};
}
