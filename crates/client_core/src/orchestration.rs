//! Request orchestration: one routine per triggered intent. Reads take the
//! latest per intent kind; writes always run to completion.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde_json::Value;
use tokio::{
    sync::Mutex,
    task::{AbortHandle, JoinHandle},
};
use tracing::{debug, error, info, warn};

use crate::{
    effects::{MissingNavigator, Navigator, Notifier, TracingNotifier},
    error::{Failure, FailureKind},
    resources::{
        comments::CommentIntent, contacts::ContactIntent, invoices::InvoiceIntent,
        leases::LeaseIntent, rent_basis::RentBasisIntent,
    },
    store::{auth::selectors::get_api_token, Action, Store},
    transport::{interpret, ApiRequest, ApiTransport},
};

/// Take-latest key: routines sharing a key supersede each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntentKey(pub &'static str);

/// Identifies one routine run. Write actions carry it so overlapping writes
/// on a slice each clear only their own pending entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for IntentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// What happens after a successful write besides the state update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowUp {
    pub notification: Option<String>,
    pub navigate_to: Option<String>,
}

impl FollowUp {
    pub fn notify(message: impl Into<String>) -> Self {
        Self {
            notification: Some(message.into()),
            navigate_to: None,
        }
    }

    pub fn and_navigate(mut self, path: impl Into<String>) -> Self {
        self.navigate_to = Some(path.into());
        self
    }
}

/// The per-intent description a routine executes.
pub trait Routine {
    fn key(&self) -> IntentKey;
    /// Whether a newer trigger with the same key abandons this routine.
    /// Writes return `false` since their request may already have been applied
    /// by the server.
    fn takes_latest(&self) -> bool {
        true
    }
    /// Dispatched before the request; sets the loading flag.
    fn started(&self, run: RunId) -> Option<Action>;
    fn request(&self) -> ApiRequest;
    /// Actions for a 2xx body. Must clear the flag set by [`Routine::started`].
    fn succeeded(&self, run: RunId, body: Value) -> Vec<Action>;
    /// The single failure action for every non-success outcome.
    fn failed(&self, run: RunId, failure: Failure) -> Action;
    fn follow_up(&self, _body: &Value) -> Option<FollowUp> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Lease(LeaseIntent),
    Contact(ContactIntent),
    Invoice(InvoiceIntent),
    RentBasis(RentBasisIntent),
    Comment(CommentIntent),
}

impl Intent {
    fn routine(&self) -> &dyn Routine {
        match self {
            Intent::Lease(intent) => intent,
            Intent::Contact(intent) => intent,
            Intent::Invoice(intent) => intent,
            Intent::RentBasis(intent) => intent,
            Intent::Comment(intent) => intent,
        }
    }
}

impl Routine for Intent {
    fn key(&self) -> IntentKey {
        self.routine().key()
    }

    fn takes_latest(&self) -> bool {
        self.routine().takes_latest()
    }

    fn started(&self, run: RunId) -> Option<Action> {
        self.routine().started(run)
    }

    fn request(&self) -> ApiRequest {
        self.routine().request()
    }

    fn succeeded(&self, run: RunId, body: Value) -> Vec<Action> {
        self.routine().succeeded(run, body)
    }

    fn failed(&self, run: RunId, failure: Failure) -> Action {
        self.routine().failed(run, failure)
    }

    fn follow_up(&self, body: &Value) -> Option<FollowUp> {
        self.routine().follow_up(body)
    }
}

macro_rules! intent_from {
    ($variant:ident, $intent:ty) => {
        impl From<$intent> for Intent {
            fn from(value: $intent) -> Self {
                Intent::$variant(value)
            }
        }
    };
}

intent_from!(Lease, LeaseIntent);
intent_from!(Contact, ContactIntent);
intent_from!(Invoice, InvoiceIntent);
intent_from!(RentBasis, RentBasisIntent);
intent_from!(Comment, CommentIntent);

#[derive(Debug, Clone, PartialEq)]
pub enum RoutineOutcome {
    Succeeded(Value),
    Failed(Failure),
    /// A newer routine with the same key took over; nothing was applied.
    Superseded,
}

struct InFlight {
    key: IntentKey,
    takes_latest: bool,
    abort: AbortHandle,
}

pub struct Orchestrator {
    store: Arc<Store>,
    transport: Arc<dyn ApiTransport>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    in_flight: Mutex<HashMap<RunId, InFlight>>,
    runs: AtomicU64,
}

impl Orchestrator {
    pub fn new(store: Arc<Store>, transport: Arc<dyn ApiTransport>) -> Arc<Self> {
        Self::new_with_effects(
            store,
            transport,
            Arc::new(MissingNavigator),
            Arc::new(TracingNotifier),
        )
    }

    pub fn new_with_effects(
        store: Arc<Store>,
        transport: Arc<dyn ApiTransport>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            transport,
            navigator,
            notifier,
            in_flight: Mutex::new(HashMap::new()),
            runs: AtomicU64::new(0),
        })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Starts the routine for `intent` in the background. A read abandons any
    /// in-flight read with the same key; writes never supersede each other.
    pub async fn trigger(
        self: &Arc<Self>,
        intent: impl Into<Intent>,
    ) -> JoinHandle<RoutineOutcome> {
        let intent = intent.into();
        let key = intent.key();
        let takes_latest = intent.takes_latest();

        let mut in_flight = self.in_flight.lock().await;
        let run = RunId(self.runs.fetch_add(1, Ordering::Relaxed) + 1);
        if takes_latest {
            in_flight.retain(|previous, entry| {
                let superseded = entry.takes_latest && entry.key == key;
                if superseded {
                    debug!(%key, superseded = %previous, %run, "superseding routine");
                    entry.abort.abort();
                }
                !superseded
            });
        }

        let orchestrator = Arc::clone(self);
        let handle = tokio::spawn(async move { orchestrator.execute(intent, run).await });
        in_flight.insert(
            run,
            InFlight {
                key,
                takes_latest,
                abort: handle.abort_handle(),
            },
        );
        handle
    }

    /// Triggers `intent` and waits for its terminal outcome.
    pub async fn run(self: &Arc<Self>, intent: impl Into<Intent>) -> RoutineOutcome {
        match self.trigger(intent).await.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() => RoutineOutcome::Superseded,
            Err(err) => {
                error!("routine task failed: {err}");
                RoutineOutcome::Failed(Failure::server(None, err.to_string()))
            }
        }
    }

    async fn execute(self: Arc<Self>, intent: Intent, run: RunId) -> RoutineOutcome {
        let key = intent.key();

        if let Some(action) = intent.started(run) {
            if !self.commit(run, vec![action], false).await {
                return RoutineOutcome::Superseded;
            }
        }

        let token = self.store.select(|state| get_api_token(state).cloned()).await;
        let request = intent.request();
        let result = match self.transport.send(&request, token.as_ref()).await {
            Ok(response) => interpret(response),
            Err(err) => {
                error!(%key, path = %request.path, "request failed: {err}");
                Err(Failure::from(err))
            }
        };

        match result {
            Ok(body) => {
                let actions = intent.succeeded(run, body.clone());
                if !self.commit(run, actions, true).await {
                    return RoutineOutcome::Superseded;
                }
                info!(%key, %run, "routine succeeded");
                if let Some(follow_up) = intent.follow_up(&body) {
                    self.apply_follow_up(follow_up);
                }
                RoutineOutcome::Succeeded(body)
            }
            Err(failure) => {
                match failure.kind {
                    FailureKind::Server => {
                        error!(%key, status = ?failure.status, "server error: {}", failure.message)
                    }
                    FailureKind::Validation => {
                        warn!(%key, fields = failure.field_errors.len(), "validation failed")
                    }
                    FailureKind::NotFound | FailureKind::Unauthorized => {
                        warn!(%key, status = ?failure.status, "{}", failure.message)
                    }
                }
                let action = intent.failed(run, failure.clone());
                if !self.commit(run, vec![action], true).await {
                    return RoutineOutcome::Superseded;
                }
                if failure.is_global() {
                    self.notifier.error(&failure.message);
                }
                RoutineOutcome::Failed(failure)
            }
        }
    }

    /// Applies `actions` only while `run` is still registered. The registry
    /// lock is held across the dispatch so a newer trigger cannot interleave.
    async fn commit(&self, run: RunId, actions: Vec<Action>, terminal: bool) -> bool {
        let mut in_flight = self.in_flight.lock().await;
        if !in_flight.contains_key(&run) {
            debug!(%run, "dropping result of superseded routine");
            return false;
        }

        for action in actions {
            self.store.dispatch(action).await;
        }
        if terminal {
            in_flight.remove(&run);
        }
        true
    }

    fn apply_follow_up(&self, follow_up: FollowUp) {
        if let Some(message) = &follow_up.notification {
            self.notifier.success(message);
        }
        if let Some(path) = &follow_up.navigate_to {
            self.navigator.navigate(path);
        }
    }

    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}

#[cfg(test)]
#[path = "tests/orchestration_tests.rs"]
mod tests;
