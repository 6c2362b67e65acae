use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use codr_bus::{Bus, JobStore};
use codr_protocol::Config;
use codr_security::TokenService;

pub struct AppState<S, B> {
    pub store: S,
    pub bus: B,
    pub token_service: Arc<TokenService>,
    pub config: Arc<Config>,
    active_sessions: Arc<AtomicUsize>,
}

impl<S: Clone, B: Clone> Clone for AppState<S, B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            bus: self.bus.clone(),
            token_service: Arc::clone(&self.token_service),
            config: Arc::clone(&self.config),
            active_sessions: Arc::clone(&self.active_sessions),
        }
    }
}

impl<S, B> AppState<S, B>
where
    S: JobStore + Clone + Send + Sync + 'static,
    B: Bus + Clone + Send + Sync + 'static,
{
    pub fn new(store: S, bus: B, token_service: TokenService, config: Config) -> Self {
        Self {
            store,
            bus,
            token_service: Arc::new(token_service),
            config: Arc::new(config),
            active_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn active_session_count(&self) -> usize {
        self.active_sessions.load(Ordering::Relaxed)
    }

    pub(crate) fn session_started(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn session_ended(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn api_key_matches(&self, provided: Option<&str>) -> bool {
        match &self.config.api_key {
            None => true,
            Some(expected) => provided == Some(expected.as_str()),
        }
    }
}
