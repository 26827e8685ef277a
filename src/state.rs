use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{TokenService, Verifier};
use crate::images::ImageStore;
use crate::store::Store;

/// Shared handler state; read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub images: Arc<dyn ImageStore>,
    pub tokens: TokenService,
    pub verifier: Verifier,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        images: Arc<dyn ImageStore>,
        tokens: TokenService,
        bcrypt_cost: u32,
    ) -> Self {
        let verifier = Verifier::new(tokens.clone(), store.clone());
        Self {
            store,
            images,
            tokens,
            verifier,
            bcrypt_cost,
        }
    }
}

impl FromRef<AppState> for Verifier {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}
