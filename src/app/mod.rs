use std::sync::Arc;

use crate::auth::IdentityVerifier;
use crate::catalog::CatalogClient;
use crate::config::FirebaseWebConfig;

use self::saved_store::SavedRecipeStore;

pub mod error;
pub mod firestore;
pub mod model;
pub mod routes;
pub mod saved_store;
pub mod server;

/// Handles shared by every request; built once in [`server::serve`].
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogClient,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub store: Arc<dyn SavedRecipeStore>,
    pub firebase_config: Arc<FirebaseWebConfig>,
}
