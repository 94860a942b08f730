//! HTTP API for the Raider Hotline
//!
//! `POST /voice/turn` is the stateless form endpoint, `GET /voice/stream` the
//! WebSocket stream; `/health` and `/version` are for operators.

mod handlers;
mod stream;
mod types;

pub use handlers::create_router;

use crate::config::HotlineConfig;
use crate::records::RecordStore;
use crate::router::ConversationRouter;
use crate::session::SessionStore;
use crate::signature::SignatureVerifier;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub router: ConversationRouter,
    pub sessions: Arc<SessionStore>,
    pub records: Arc<dyn RecordStore>,
    pub verifier: Arc<dyn SignatureVerifier>,
    pub config: Arc<HotlineConfig>,
}

impl AppState {
    pub fn new(
        config: HotlineConfig,
        records: Arc<dyn RecordStore>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        let router = ConversationRouter::new(records.clone(), config.utc_offset());
        let sessions = Arc::new(SessionStore::new(
            config.max_connections,
            config.idle_timeout(),
        ));
        Self {
            router,
            sessions,
            records,
            verifier,
            config: Arc::new(config),
        }
    }
}
