use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use shared::{
    domain::{RentBasisId, Resource},
    protocol::{id_of, Attributes, FieldErrors, ListPage},
};

use super::ListQuery;
use crate::{
    error::{Failure, FailureKind},
    orchestration::{FollowUp, IntentKey, Routine, RunId},
    store::Action,
    transport::ApiRequest,
};

pub const RENT_BASIS_ROUTE: &str = "/vuokrausperusteet";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RentBasisState {
    pub attributes: Option<Attributes>,
    pub list: Option<ListPage>,
    pub by_id: HashMap<RentBasisId, Value>,
    pub current: Option<RentBasisId>,
    pub is_fetching_list: bool,
    pub is_fetching_single: bool,
    pub is_fetching_attributes: bool,
    pub saving: BTreeSet<RunId>,
    pub form_errors: FieldErrors,
    pub is_edit_mode: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RentBasisAction {
    FetchAttributes,
    ReceiveAttributes(Attributes),
    AttributesNotFound(Failure),
    FetchAll(ListQuery),
    ReceiveAll(ListPage),
    ListNotFound(Failure),
    FetchSingle(RentBasisId),
    ReceiveSingle {
        id: RentBasisId,
        rent_basis: Value,
    },
    NotFound(Failure),
    Create {
        run: RunId,
        rent_basis: Value,
    },
    ReceiveCreated {
        run: RunId,
        rent_basis: Value,
    },
    Edit {
        run: RunId,
        id: RentBasisId,
        changes: Value,
    },
    ReceiveUpdated {
        run: RunId,
        id: RentBasisId,
        rent_basis: Value,
    },
    SaveFailed {
        run: RunId,
        failure: Failure,
    },
    ShowEditMode,
    HideEditMode,
}

impl RentBasisAction {
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            RentBasisAction::AttributesNotFound(failure)
            | RentBasisAction::ListNotFound(failure)
            | RentBasisAction::NotFound(failure)
            | RentBasisAction::SaveFailed { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

pub fn reduce(mut state: RentBasisState, action: RentBasisAction) -> RentBasisState {
    match action {
        RentBasisAction::FetchAttributes => state.is_fetching_attributes = true,
        RentBasisAction::ReceiveAttributes(attributes) => {
            state.attributes = Some(attributes);
            state.is_fetching_attributes = false;
        }
        RentBasisAction::AttributesNotFound(_) => state.is_fetching_attributes = false,
        RentBasisAction::FetchAll(_) => state.is_fetching_list = true,
        RentBasisAction::ReceiveAll(page) => {
            state.list = Some(page);
            state.is_fetching_list = false;
        }
        RentBasisAction::ListNotFound(_) => state.is_fetching_list = false,
        RentBasisAction::FetchSingle(_) => state.is_fetching_single = true,
        RentBasisAction::ReceiveSingle { id, rent_basis } => {
            state.by_id.insert(id, rent_basis);
            state.current = Some(id);
            state.is_fetching_single = false;
        }
        RentBasisAction::NotFound(_) => state.is_fetching_single = false,
        RentBasisAction::Create { run, .. } | RentBasisAction::Edit { run, .. } => {
            state.saving.insert(run);
            state.form_errors = FieldErrors::default();
        }
        RentBasisAction::ReceiveCreated { run, rent_basis } => {
            if let Some(id) = id_of(&rent_basis).map(RentBasisId) {
                state.by_id.insert(id, rent_basis);
                state.current = Some(id);
            }
            state.saving.remove(&run);
        }
        RentBasisAction::ReceiveUpdated {
            run,
            id,
            rent_basis,
        } => {
            state.by_id.insert(id, rent_basis);
            state.current = Some(id);
            state.saving.remove(&run);
        }
        RentBasisAction::SaveFailed { run, failure } => {
            if failure.kind == FailureKind::Validation {
                state.form_errors = failure.field_errors;
            }
            state.saving.remove(&run);
        }
        RentBasisAction::ShowEditMode => state.is_edit_mode = true,
        RentBasisAction::HideEditMode => state.is_edit_mode = false,
    }
    state
}

pub mod selectors {
    use serde_json::Value;
    use shared::{
        domain::RentBasisId,
        protocol::{Attributes, FieldErrors, ListPage},
    };

    use crate::store::AppState;

    pub fn get_rent_basis_attributes(state: &AppState) -> Option<&Attributes> {
        state.rent_basis.attributes.as_ref()
    }

    pub fn get_rent_basis_list(state: &AppState) -> Option<&ListPage> {
        state.rent_basis.list.as_ref()
    }

    pub fn get_rent_basis_rows(state: &AppState) -> &[Value] {
        state
            .rent_basis
            .list
            .as_ref()
            .map(|page| page.results.as_slice())
            .unwrap_or_default()
    }

    pub fn get_rent_basis_by_id(state: &AppState, id: RentBasisId) -> Option<&Value> {
        state.rent_basis.by_id.get(&id)
    }

    pub fn get_current_rent_basis(state: &AppState) -> Option<&Value> {
        state
            .rent_basis
            .current
            .and_then(|id| state.rent_basis.by_id.get(&id))
    }

    pub fn get_is_fetching_rent_basis(state: &AppState) -> bool {
        state.rent_basis.is_fetching_list || state.rent_basis.is_fetching_single
    }

    pub fn get_is_fetching_rent_basis_list(state: &AppState) -> bool {
        state.rent_basis.is_fetching_list
    }

    pub fn get_is_saving_rent_basis(state: &AppState) -> bool {
        !state.rent_basis.saving.is_empty()
    }

    pub fn get_rent_basis_form_errors(state: &AppState) -> &FieldErrors {
        &state.rent_basis.form_errors
    }

    pub fn get_is_rent_basis_edit_mode(state: &AppState) -> bool {
        state.rent_basis.is_edit_mode
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RentBasisIntent {
    FetchAttributes,
    FetchAll(ListQuery),
    FetchSingle(RentBasisId),
    Create(Value),
    Edit { id: RentBasisId, changes: Value },
}

impl Routine for RentBasisIntent {
    fn key(&self) -> IntentKey {
        IntentKey(match self {
            RentBasisIntent::FetchAttributes => "rent_basis/fetch_attributes",
            RentBasisIntent::FetchAll(_) => "rent_basis/fetch_all",
            RentBasisIntent::FetchSingle(_) => "rent_basis/fetch_single",
            RentBasisIntent::Create(_) => "rent_basis/create",
            RentBasisIntent::Edit { .. } => "rent_basis/edit",
        })
    }

    fn takes_latest(&self) -> bool {
        !matches!(self, RentBasisIntent::Create(_) | RentBasisIntent::Edit { .. })
    }

    fn started(&self, run: RunId) -> Option<Action> {
        let action = match self {
            RentBasisIntent::FetchAttributes => RentBasisAction::FetchAttributes,
            RentBasisIntent::FetchAll(query) => RentBasisAction::FetchAll(query.clone()),
            RentBasisIntent::FetchSingle(id) => RentBasisAction::FetchSingle(*id),
            RentBasisIntent::Create(rent_basis) => RentBasisAction::Create {
                run,
                rent_basis: rent_basis.clone(),
            },
            RentBasisIntent::Edit { id, changes } => RentBasisAction::Edit {
                run,
                id: *id,
                changes: changes.clone(),
            },
        };
        Some(action.into())
    }

    fn request(&self) -> ApiRequest {
        let collection = Resource::RentBasis.collection_path();
        match self {
            RentBasisIntent::FetchAttributes => ApiRequest::options(collection),
            RentBasisIntent::FetchAll(query) => query.apply(ApiRequest::get(collection)),
            RentBasisIntent::FetchSingle(id) => {
                ApiRequest::get(Resource::RentBasis.item_path(id.0))
            }
            RentBasisIntent::Create(rent_basis) => {
                ApiRequest::post(collection).json(rent_basis.clone())
            }
            RentBasisIntent::Edit { id, changes } => {
                ApiRequest::patch(Resource::RentBasis.item_path(id.0)).json(changes.clone())
            }
        }
    }

    fn succeeded(&self, run: RunId, body: Value) -> Vec<Action> {
        match self {
            RentBasisIntent::FetchAttributes => vec![RentBasisAction::ReceiveAttributes(
                Attributes::from_options_body(&body),
            )
            .into()],
            RentBasisIntent::FetchAll(_) => {
                vec![RentBasisAction::ReceiveAll(ListPage::from_body(&body)).into()]
            }
            RentBasisIntent::FetchSingle(id) => vec![RentBasisAction::ReceiveSingle {
                id: *id,
                rent_basis: body,
            }
            .into()],
            RentBasisIntent::Create(_) => vec![RentBasisAction::ReceiveCreated {
                run,
                rent_basis: body,
            }
            .into()],
            RentBasisIntent::Edit { id, .. } => vec![
                RentBasisAction::ReceiveUpdated {
                    run,
                    id: *id,
                    rent_basis: body,
                }
                .into(),
                RentBasisAction::HideEditMode.into(),
            ],
        }
    }

    fn failed(&self, run: RunId, failure: Failure) -> Action {
        let action = match self {
            RentBasisIntent::FetchAttributes => RentBasisAction::AttributesNotFound(failure),
            RentBasisIntent::FetchAll(_) => RentBasisAction::ListNotFound(failure),
            RentBasisIntent::FetchSingle(_) => RentBasisAction::NotFound(failure),
            RentBasisIntent::Create(_) | RentBasisIntent::Edit { .. } => {
                RentBasisAction::SaveFailed { run, failure }
            }
        };
        action.into()
    }

    fn follow_up(&self, body: &Value) -> Option<FollowUp> {
        match self {
            RentBasisIntent::Create(_) => {
                let follow_up = FollowUp::notify("Rent basis created");
                Some(match id_of(body) {
                    Some(id) => follow_up.and_navigate(format!("{RENT_BASIS_ROUTE}/{id}")),
                    None => follow_up,
                })
            }
            RentBasisIntent::Edit { .. } => Some(FollowUp::notify("Rent basis saved")),
            _ => None,
        }
    }
}
