use std::sync::Arc;

use snaptex_api::ModelClient;
use snaptex_config::Config;
use snaptex_history::HistoryStore;
use tokio::sync::RwLock;

pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub client: ModelClient,
    pub history: HistoryStore,
}

impl AppState {
    pub fn new(config: Config, history: HistoryStore) -> Self {
        let client = ModelClient::new(config.api_key.clone());
        Self {
            config: Arc::new(RwLock::new(config)),
            client,
            history,
        }
    }
}
