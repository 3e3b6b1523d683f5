use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use shared::{
    domain::{LeaseId, Resource},
    protocol::{id_of, Attributes, FieldErrors, ListPage},
};

use super::ListQuery;
use crate::{
    error::{Failure, FailureKind},
    orchestration::{FollowUp, IntentKey, Routine, RunId},
    store::Action,
    transport::ApiRequest,
};

pub const LEASE_ROUTE: &str = "/vuokraukset";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaseState {
    pub attributes: Option<Attributes>,
    pub list: Option<ListPage>,
    pub by_id: HashMap<LeaseId, Value>,
    pub current: Option<LeaseId>,
    pub is_fetching_list: bool,
    pub is_fetching_single: bool,
    pub is_fetching_attributes: bool,
    /// Writes that have not reached a terminal outcome yet.
    pub saving: BTreeSet<RunId>,
    pub form_errors: FieldErrors,
    pub is_edit_mode: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeaseAction {
    FetchAttributes,
    ReceiveAttributes(Attributes),
    AttributesNotFound(Failure),
    FetchAll(ListQuery),
    ReceiveAll(ListPage),
    ListNotFound(Failure),
    FetchSingle(LeaseId),
    ReceiveSingle { id: LeaseId, lease: Value },
    NotFound(Failure),
    Create { run: RunId, lease: Value },
    ReceiveCreated { run: RunId, lease: Value },
    Patch { run: RunId, id: LeaseId, changes: Value },
    ReceiveUpdated { run: RunId, id: LeaseId, lease: Value },
    SaveFailed { run: RunId, failure: Failure },
    ShowEditMode,
    HideEditMode,
}

impl LeaseAction {
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            LeaseAction::AttributesNotFound(failure)
            | LeaseAction::ListNotFound(failure)
            | LeaseAction::NotFound(failure)
            | LeaseAction::SaveFailed { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

pub fn reduce(mut state: LeaseState, action: LeaseAction) -> LeaseState {
    match action {
        LeaseAction::FetchAttributes => state.is_fetching_attributes = true,
        LeaseAction::ReceiveAttributes(attributes) => {
            state.attributes = Some(attributes);
            state.is_fetching_attributes = false;
        }
        LeaseAction::AttributesNotFound(_) => state.is_fetching_attributes = false,
        LeaseAction::FetchAll(_) => state.is_fetching_list = true,
        LeaseAction::ReceiveAll(page) => {
            state.list = Some(page);
            state.is_fetching_list = false;
        }
        LeaseAction::ListNotFound(_) => state.is_fetching_list = false,
        LeaseAction::FetchSingle(_) => state.is_fetching_single = true,
        LeaseAction::ReceiveSingle { id, lease } => {
            state.by_id.insert(id, lease);
            state.current = Some(id);
            state.is_fetching_single = false;
        }
        LeaseAction::NotFound(_) => state.is_fetching_single = false,
        LeaseAction::Create { run, .. } | LeaseAction::Patch { run, .. } => {
            state.saving.insert(run);
            state.form_errors = FieldErrors::default();
        }
        LeaseAction::ReceiveCreated { run, lease } => {
            if let Some(id) = id_of(&lease).map(LeaseId) {
                state.by_id.insert(id, lease);
                state.current = Some(id);
            }
            state.saving.remove(&run);
        }
        LeaseAction::ReceiveUpdated { run, id, lease } => {
            state.by_id.insert(id, lease);
            state.current = Some(id);
            state.saving.remove(&run);
        }
        LeaseAction::SaveFailed { run, failure } => {
            if failure.kind == FailureKind::Validation {
                state.form_errors = failure.field_errors;
            }
            state.saving.remove(&run);
        }
        LeaseAction::ShowEditMode => state.is_edit_mode = true,
        LeaseAction::HideEditMode => state.is_edit_mode = false,
    }
    state
}

pub mod selectors {
    use serde_json::Value;
    use shared::{
        domain::LeaseId,
        protocol::{Attributes, FieldErrors, ListPage},
    };

    use crate::store::AppState;

    pub fn get_lease_attributes(state: &AppState) -> Option<&Attributes> {
        state.leases.attributes.as_ref()
    }

    pub fn get_lease_list(state: &AppState) -> Option<&ListPage> {
        state.leases.list.as_ref()
    }

    /// Rows of the last fetched page; empty before the first fetch.
    pub fn get_lease_rows(state: &AppState) -> &[Value] {
        state
            .leases
            .list
            .as_ref()
            .map(|page| page.results.as_slice())
            .unwrap_or_default()
    }

    pub fn get_lease_by_id(state: &AppState, id: LeaseId) -> Option<&Value> {
        state.leases.by_id.get(&id)
    }

    pub fn get_current_lease(state: &AppState) -> Option<&Value> {
        state
            .leases
            .current
            .and_then(|id| state.leases.by_id.get(&id))
    }

    /// Any lease read in flight, list or single.
    pub fn get_is_fetching_leases(state: &AppState) -> bool {
        state.leases.is_fetching_list || state.leases.is_fetching_single
    }

    pub fn get_is_fetching_lease_list(state: &AppState) -> bool {
        state.leases.is_fetching_list
    }

    pub fn get_is_fetching_lease(state: &AppState) -> bool {
        state.leases.is_fetching_single
    }

    pub fn get_is_saving_lease(state: &AppState) -> bool {
        !state.leases.saving.is_empty()
    }

    pub fn get_is_fetching_lease_attributes(state: &AppState) -> bool {
        state.leases.is_fetching_attributes
    }

    pub fn get_lease_form_errors(state: &AppState) -> &FieldErrors {
        &state.leases.form_errors
    }

    pub fn get_is_lease_edit_mode(state: &AppState) -> bool {
        state.leases.is_edit_mode
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeaseIntent {
    FetchAttributes,
    FetchAll(ListQuery),
    FetchSingle(LeaseId),
    Create(Value),
    Patch { id: LeaseId, changes: Value },
}

impl Routine for LeaseIntent {
    fn key(&self) -> IntentKey {
        IntentKey(match self {
            LeaseIntent::FetchAttributes => "leases/fetch_attributes",
            LeaseIntent::FetchAll(_) => "leases/fetch_all",
            LeaseIntent::FetchSingle(_) => "leases/fetch_single",
            LeaseIntent::Create(_) => "leases/create",
            LeaseIntent::Patch { .. } => "leases/patch",
        })
    }

    fn takes_latest(&self) -> bool {
        !matches!(self, LeaseIntent::Create(_) | LeaseIntent::Patch { .. })
    }

    fn started(&self, run: RunId) -> Option<Action> {
        let action = match self {
            LeaseIntent::FetchAttributes => LeaseAction::FetchAttributes,
            LeaseIntent::FetchAll(query) => LeaseAction::FetchAll(query.clone()),
            LeaseIntent::FetchSingle(id) => LeaseAction::FetchSingle(*id),
            LeaseIntent::Create(lease) => LeaseAction::Create {
                run,
                lease: lease.clone(),
            },
            LeaseIntent::Patch { id, changes } => LeaseAction::Patch {
                run,
                id: *id,
                changes: changes.clone(),
            },
        };
        Some(action.into())
    }

    fn request(&self) -> ApiRequest {
        let collection = Resource::Lease.collection_path();
        match self {
            LeaseIntent::FetchAttributes => ApiRequest::options(collection),
            LeaseIntent::FetchAll(query) => query.apply(ApiRequest::get(collection)),
            LeaseIntent::FetchSingle(id) => ApiRequest::get(Resource::Lease.item_path(id.0)),
            LeaseIntent::Create(lease) => ApiRequest::post(collection).json(lease.clone()),
            LeaseIntent::Patch { id, changes } => {
                ApiRequest::patch(Resource::Lease.item_path(id.0)).json(changes.clone())
            }
        }
    }

    fn succeeded(&self, run: RunId, body: Value) -> Vec<Action> {
        match self {
            LeaseIntent::FetchAttributes => {
                vec![LeaseAction::ReceiveAttributes(Attributes::from_options_body(&body)).into()]
            }
            LeaseIntent::FetchAll(_) => {
                vec![LeaseAction::ReceiveAll(ListPage::from_body(&body)).into()]
            }
            LeaseIntent::FetchSingle(id) => {
                vec![LeaseAction::ReceiveSingle { id: *id, lease: body }.into()]
            }
            LeaseIntent::Create(_) => {
                vec![LeaseAction::ReceiveCreated { run, lease: body }.into()]
            }
            LeaseIntent::Patch { id, .. } => vec![
                LeaseAction::ReceiveUpdated {
                    run,
                    id: *id,
                    lease: body,
                }
                .into(),
                LeaseAction::HideEditMode.into(),
            ],
        }
    }

    fn failed(&self, run: RunId, failure: Failure) -> Action {
        let action = match self {
            LeaseIntent::FetchAttributes => LeaseAction::AttributesNotFound(failure),
            LeaseIntent::FetchAll(_) => LeaseAction::ListNotFound(failure),
            LeaseIntent::FetchSingle(_) => LeaseAction::NotFound(failure),
            LeaseIntent::Create(_) | LeaseIntent::Patch { .. } => {
                LeaseAction::SaveFailed { run, failure }
            }
        };
        action.into()
    }

    fn follow_up(&self, body: &Value) -> Option<FollowUp> {
        match self {
            LeaseIntent::Create(_) => {
                let follow_up = FollowUp::notify("Lease created");
                Some(match id_of(body) {
                    Some(id) => follow_up.and_navigate(format!("{LEASE_ROUTE}/{id}")),
                    None => follow_up,
                })
            }
            LeaseIntent::Patch { .. } => Some(FollowUp::notify("Lease saved")),
            _ => None,
        }
    }
}
