//! Session gate over an injectable token store.
//!
//! A session is "authenticated" iff its store holds a TokenPair. There is no
//! process-wide token state: every client carries its own `Session`.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use super::token_store::TokenStore;
use crate::types::TokenPair;

pub struct Session {
    store: Arc<dyn TokenStore>,
    /// Serializes token refreshes for this session.
    refresh_lock: Mutex<()>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    /// True iff a token pair is currently stored.
    pub fn is_authenticated(&self) -> bool {
        self.tokens().is_some()
    }

    /// The stored pair, if any. Store read failures count as "no session".
    pub fn tokens(&self) -> Option<TokenPair> {
        match self.store.load() {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("Token store read failed, treating session as absent: {}", e);
                None
            }
        }
    }

    pub fn save(&self, pair: &TokenPair) -> Result<(), super::PlanApiError> {
        self.store.save(pair)
    }

    /// Drop the stored pair. Idempotent; a failing store is logged, not raised.
    pub fn clear(&self) {
        if let Err(e) = self.store.clear() {
            log::warn!("Failed to clear stored tokens: {}", e);
        }
    }

    pub(crate) async fn lock_refresh(&self) -> MutexGuard<'_, ()> {
        self.refresh_lock.lock().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
