use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use sierra_agent::llm::{LlmClient, OpenAiCompatClient};
use sierra_agent::{ConversationState, TurnProcessor};
use sierra_core::config::{AppConfig, ConfigError, LoadOptions};
use sierra_core::{CatalogIndex, ServiceAdapter};
use sierra_store::{JsonStore, StoreError};

/// Live sessions, keyed by the id handed out on the first chat request. A
/// session's state is removed from the map for the duration of its turn, so
/// mutation stays session-exclusive without holding the registry lock.
pub type SessionMap = Arc<Mutex<HashMap<Uuid, ConversationState>>>;

/// Everything the request handlers need, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JsonStore>,
    pub processor: Arc<TurnProcessor>,
    pub sessions: SessionMap,
}

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("data store failed to load: {0}")]
    Store(#[from] StoreError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let store = Arc::new(JsonStore::load(&config.data.catalog_path, &config.data.orders_path)?);
    let catalog = CatalogIndex::new(store.product_names());
    let llm = OpenAiCompatClient::from_config(&config.llm)
        .map(|client| Arc::new(client) as Arc<dyn LlmClient>);
    if llm.is_some() {
        info!(
            event_name = "system.bootstrap.llm_enabled",
            model = %config.llm.model,
            "llm fallback enabled"
        );
    }

    let services: Arc<dyn ServiceAdapter> = Arc::clone(&store) as Arc<dyn ServiceAdapter>;
    let processor = Arc::new(TurnProcessor::new(&config, catalog, services, llm));

    info!(
        event_name = "system.bootstrap.ready",
        products = store.products().len(),
        orders = store.orders().len(),
        "application bootstrap complete"
    );

    Ok(Application {
        config,
        state: AppState { store, processor, sessions: Arc::new(Mutex::new(HashMap::new())) },
    })
}
