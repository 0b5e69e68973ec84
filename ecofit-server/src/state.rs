use std::sync::Arc;

use ecofit_core::service::EcoFitService;

use crate::accounts::Accounts;

#[derive(Clone)]
/// Shared handler state.
pub struct AppState {
    /// Classification and fit decisions.
    pub service: Arc<EcoFitService>,
    /// User accounts.
    pub accounts: Arc<Accounts>,
}

impl AppState {
    /// Wrap the service and accounts for sharing across handlers.
    pub fn new(service: EcoFitService, accounts: Accounts) -> Self {
        Self {
            service: Arc::new(service),
            accounts: Arc::new(accounts),
        }
    }
}
