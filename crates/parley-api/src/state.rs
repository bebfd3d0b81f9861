//! Application state wiring all services together.
//!
//! AppState holds the handles shared by every request: the chat service
//! (pinned to the SQLite store), the rate gate, and the loaded config.
//! Everything is constructed once at start-up and injected; nothing lives
//! in process globals.

use std::sync::Arc;
use std::time::Duration;

use parley_core::chat::service::ChatService;
use parley_core::llm::box_provider::BoxLlmProvider;
use parley_core::rate::{FixedWindowRateGate, RateGate};
use parley_infra::config::{process_env, resolve_api_key};
use parley_infra::llm::create_provider;
use parley_infra::sqlite::conversation::SqliteConversationStore;
use parley_infra::sqlite::pool::DatabasePool;
use parley_types::config::{RateLimitConfig, RelayConfig, StoreConfig};

/// Chat service pinned to the concrete infra store.
pub type ConcreteChatService = ChatService<SqliteConversationStore>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub rate_gate: Arc<dyn RateGate>,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    /// Start-up: open the store, build the provider, wire the service.
    pub async fn init(config: RelayConfig) -> anyhow::Result<Self> {
        let store = open_store(&config.store).await?;
        let api_key = resolve_api_key(&config.inference, process_env)?;
        let provider = create_provider(&config.inference, api_key)?;
        let rate_gate = rate_gate_from_config(&config.rate_limit);

        Ok(Self::from_parts(config, store, provider, rate_gate))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(
        config: RelayConfig,
        store: SqliteConversationStore,
        provider: BoxLlmProvider,
        rate_gate: Arc<dyn RateGate>,
    ) -> Self {
        let chat_service = ChatService::from_config(store, provider, &config);
        Self {
            chat_service: Arc::new(chat_service),
            rate_gate,
            config: Arc::new(config),
        }
    }

    /// Close the store's connection pools.
    pub async fn shutdown(&self) {
        self.chat_service.store().pool().close().await;
        tracing::info!("Conversation store closed");
    }
}

/// Open the SQLite pool (running migrations) and wrap it as a store.
pub async fn open_store(config: &StoreConfig) -> anyhow::Result<SqliteConversationStore> {
    let pool = DatabasePool::new(config).await?;
    Ok(SqliteConversationStore::new(
        pool,
        Duration::from_secs(config.operation_timeout_secs),
    ))
}

pub fn rate_gate_from_config(config: &RateLimitConfig) -> Arc<dyn RateGate> {
    Arc::new(FixedWindowRateGate::new(
        config.quota,
        Duration::from_secs(config.window_secs),
    ))
}
