//! Client core for the mvj land-lease back office: typed REST access,
//! global state with per-resource slices, and request routines where reads
//! take the latest and writes run to completion.

use std::sync::Arc;

use tracing::info;

pub mod config;
pub mod effects;
pub mod error;
pub mod orchestration;
pub mod resources;
pub mod selectors;
pub mod store;
pub mod transport;

pub use config::{load_settings, ClientSettings};
pub use error::{ClientError, Failure, FailureKind};
pub use orchestration::{
    FollowUp, Intent, IntentKey, Orchestrator, Routine, RoutineOutcome, RunId,
};
pub use resources::{
    comments::CommentIntent, contacts::ContactIntent, invoices::InvoiceIntent,
    leases::LeaseIntent, rent_basis::RentBasisIntent, ListQuery,
};
pub use store::{auth::AuthAction, Action, AppState, Store};
pub use transport::{ApiRequest, ApiResponse, ApiToken, ApiTransport, HttpTransport};

use effects::{Navigator, Notifier, TracingNotifier};

/// Wires store, transport and orchestrator for one session.
pub struct MvjClient {
    store: Arc<Store>,
    orchestrator: Arc<Orchestrator>,
}

impl MvjClient {
    pub fn new(
        settings: &ClientSettings,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        Self::new_with_notifier(settings, navigator, Arc::new(TracingNotifier))
    }

    pub fn new_with_notifier(
        settings: &ClientSettings,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ClientError> {
        let transport = Arc::new(HttpTransport::new(settings.api_base()?));
        let mut initial = AppState::default();
        if let Some(token) = &settings.api_token {
            initial = initial.reduce(AuthAction::ReceiveApiToken(ApiToken::new(token)).into());
        }
        info!(
            api_url = %settings.api_url,
            authenticated = settings.api_token.is_some(),
            "mvj client ready"
        );
        Ok(Self::new_with_transport(initial, transport, navigator, notifier))
    }

    pub fn new_with_transport(
        initial: AppState,
        transport: Arc<dyn ApiTransport>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let store = Arc::new(Store::new(initial));
        let orchestrator =
            Orchestrator::new_with_effects(Arc::clone(&store), transport, navigator, notifier);
        Self {
            store,
            orchestrator,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub async fn sign_in(&self, token: ApiToken) {
        self.store.dispatch(AuthAction::ReceiveApiToken(token)).await;
    }

    pub async fn sign_out(&self) {
        self.store.dispatch(AuthAction::ClearApiToken).await;
    }

    pub async fn run(&self, intent: impl Into<Intent>) -> RoutineOutcome {
        self.orchestrator.run(intent).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
