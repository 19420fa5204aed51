use std::sync::Arc;

use crate::metrics::FirewallMetrics;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub secret_key: String,
    pub metrics: Arc<FirewallMetrics>,
}
