//! Shared handler state.

use std::sync::Arc;

use domain::{AuthService, ProductService, PvzService, ReceptionService};

use crate::AppStore;
use crate::auth::JwtKeys;
use crate::metrics::BusinessMetrics;

/// Services and collaborators shared by all handlers.
///
/// Every service holds a clone of the same store handle.
pub struct AppState<S: AppStore> {
    pub pvz: PvzService<S>,
    pub receptions: ReceptionService<S>,
    pub products: ProductService<S>,
    pub auth: AuthService<S>,
    pub keys: Arc<JwtKeys>,
    pub metrics: Arc<dyn BusinessMetrics>,
}

impl<S: AppStore> AppState<S> {
    pub fn new(store: S, keys: JwtKeys, metrics: Arc<dyn BusinessMetrics>) -> Self {
        Self {
            pvz: PvzService::new(store.clone()),
            receptions: ReceptionService::new(store.clone()),
            products: ProductService::new(store.clone()),
            auth: AuthService::new(store),
            keys: Arc::new(keys),
            metrics,
        }
    }

    /// Sets the bcrypt work factor used for new accounts.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.auth = self.auth.with_password_cost(cost);
        self
    }
}
