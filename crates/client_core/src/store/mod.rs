//! Global state: typed actions, slice reducers and the shared store.

use tokio::sync::{broadcast, RwLock};

use crate::{
    error::Failure,
    resources::{
        comments::{self, CommentAction, CommentState},
        contacts::{self, ContactAction, ContactState},
        invoices::{self, InvoiceAction, InvoiceState},
        leases::{self, LeaseAction, LeaseState},
        rent_basis::{self, RentBasisAction, RentBasisState},
    },
};

pub mod auth;
pub mod errors;

use auth::{AuthAction, AuthState};
use errors::{ErrorAction, ErrorEntry, ErrorState};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Auth(AuthAction),
    Errors(ErrorAction),
    Leases(LeaseAction),
    Contacts(ContactAction),
    Invoices(InvoiceAction),
    RentBasis(RentBasisAction),
    Comments(CommentAction),
}

impl Action {
    /// The failure carried by a terminal failure action, if any.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Action::Auth(_) | Action::Errors(_) => None,
            Action::Leases(action) => action.failure(),
            Action::Contacts(action) => action.failure(),
            Action::Invoices(action) => action.failure(),
            Action::RentBasis(action) => action.failure(),
            Action::Comments(action) => action.failure(),
        }
    }
}

macro_rules! action_from {
    ($variant:ident, $action:ty) => {
        impl From<$action> for Action {
            fn from(value: $action) -> Self {
                Action::$variant(value)
            }
        }
    };
}

action_from!(Auth, AuthAction);
action_from!(Errors, ErrorAction);
action_from!(Leases, LeaseAction);
action_from!(Contacts, ContactAction);
action_from!(Invoices, InvoiceAction);
action_from!(RentBasis, RentBasisAction);
action_from!(Comments, CommentAction);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub auth: AuthState,
    pub errors: ErrorState,
    pub leases: LeaseState,
    pub contacts: ContactState,
    pub invoices: InvoiceState,
    pub rent_basis: RentBasisState,
    pub comments: CommentState,
}

impl AppState {
    /// Root reducer. A global failure is also recorded in the error slice as
    /// part of the same reduction.
    pub fn reduce(mut self, action: Action) -> Self {
        let global_failure = action
            .failure()
            .filter(|failure| failure.is_global())
            .map(ErrorEntry::from);

        match action {
            Action::Auth(action) => self.auth = auth::reduce(self.auth, action),
            Action::Errors(action) => self.errors = errors::reduce(self.errors, action),
            Action::Leases(action) => self.leases = leases::reduce(self.leases, action),
            Action::Contacts(action) => self.contacts = contacts::reduce(self.contacts, action),
            Action::Invoices(action) => self.invoices = invoices::reduce(self.invoices, action),
            Action::RentBasis(action) => {
                self.rent_basis = rent_basis::reduce(self.rent_basis, action)
            }
            Action::Comments(action) => self.comments = comments::reduce(self.comments, action),
        }

        if let Some(entry) = global_failure {
            self.errors = errors::reduce(self.errors, ErrorAction::Record(entry));
        }
        self
    }
}

/// Owner of the global state. Mutation only happens through [`Store::dispatch`].
pub struct Store {
    state: RwLock<AppState>,
    events: broadcast::Sender<Action>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

impl Store {
    pub fn new(initial: AppState) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            state: RwLock::new(initial),
            events,
        }
    }

    pub async fn dispatch(&self, action: impl Into<Action>) {
        let action = action.into();
        {
            let mut guard = self.state.write().await;
            let current = std::mem::take(&mut *guard);
            *guard = current.reduce(action.clone());
        }
        let _ = self.events.send(action);
    }

    pub async fn select<T>(&self, selector: impl FnOnce(&AppState) -> T) -> T {
        let guard = self.state.read().await;
        selector(&guard)
    }

    pub async fn snapshot(&self) -> AppState {
        self.state.read().await.clone()
    }

    /// Receives every applied action after it has been reduced.
    pub fn subscribe(&self) -> broadcast::Receiver<Action> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "../tests/store_tests.rs"]
mod tests;
