use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use shared::{
    domain::{InvoiceId, LeaseId, Resource},
    protocol::{results_of, Attributes, FieldErrors},
};

use super::{upsert_by_id, with_field};
use crate::{
    error::{Failure, FailureKind},
    orchestration::{FollowUp, IntentKey, Routine, RunId},
    store::Action,
    transport::ApiRequest,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceState {
    pub attributes: Option<Attributes>,
    pub by_lease: HashMap<LeaseId, Vec<Value>>,
    pub is_fetching: bool,
    pub is_fetching_attributes: bool,
    pub saving: BTreeSet<RunId>,
    pub form_errors: FieldErrors,
    pub selected_invoice: Option<InvoiceId>,
    pub is_panel_open: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvoiceAction {
    FetchAttributes,
    ReceiveAttributes(Attributes),
    AttributesNotFound(Failure),
    FetchByLease(LeaseId),
    ReceiveByLease {
        lease_id: LeaseId,
        invoices: Vec<Value>,
    },
    NotFound(Failure),
    Create {
        run: RunId,
        lease_id: LeaseId,
        invoice: Value,
    },
    Patch {
        run: RunId,
        lease_id: LeaseId,
        id: InvoiceId,
        changes: Value,
    },
    ReceiveCreated {
        run: RunId,
        lease_id: LeaseId,
        invoice: Value,
    },
    ReceiveUpdated {
        run: RunId,
        lease_id: LeaseId,
        invoice: Value,
    },
    SaveFailed {
        run: RunId,
        failure: Failure,
    },
    SelectInvoice(InvoiceId),
    ClosePanel,
}

impl InvoiceAction {
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            InvoiceAction::AttributesNotFound(failure)
            | InvoiceAction::NotFound(failure)
            | InvoiceAction::SaveFailed { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

pub fn reduce(mut state: InvoiceState, action: InvoiceAction) -> InvoiceState {
    match action {
        InvoiceAction::FetchAttributes => state.is_fetching_attributes = true,
        InvoiceAction::ReceiveAttributes(attributes) => {
            state.attributes = Some(attributes);
            state.is_fetching_attributes = false;
        }
        InvoiceAction::AttributesNotFound(_) => state.is_fetching_attributes = false,
        InvoiceAction::FetchByLease(_) => state.is_fetching = true,
        InvoiceAction::ReceiveByLease { lease_id, invoices } => {
            state.by_lease.insert(lease_id, invoices);
            state.is_fetching = false;
        }
        InvoiceAction::NotFound(_) => state.is_fetching = false,
        InvoiceAction::Create { run, .. } | InvoiceAction::Patch { run, .. } => {
            state.saving.insert(run);
            state.form_errors = FieldErrors::default();
        }
        // Both merge into the lease's list by id.
        InvoiceAction::ReceiveCreated {
            run,
            lease_id,
            invoice,
        }
        | InvoiceAction::ReceiveUpdated {
            run,
            lease_id,
            invoice,
        } => {
            upsert_by_id(state.by_lease.entry(lease_id).or_default(), invoice);
            state.saving.remove(&run);
        }
        InvoiceAction::SaveFailed { run, failure } => {
            if failure.kind == FailureKind::Validation {
                state.form_errors = failure.field_errors;
            }
            state.saving.remove(&run);
        }
        InvoiceAction::SelectInvoice(id) => {
            state.selected_invoice = Some(id);
            state.is_panel_open = true;
        }
        InvoiceAction::ClosePanel => {
            state.selected_invoice = None;
            state.is_panel_open = false;
            state.form_errors = FieldErrors::default();
        }
    }
    state
}

pub mod selectors {
    use serde_json::Value;
    use shared::{
        domain::{InvoiceId, LeaseId},
        protocol::{id_of, Attributes, FieldErrors},
    };

    use crate::store::AppState;

    pub fn get_invoice_attributes(state: &AppState) -> Option<&Attributes> {
        state.invoices.attributes.as_ref()
    }

    /// Invoices of a lease; empty until they have been fetched.
    pub fn get_invoices_by_lease(state: &AppState, lease_id: LeaseId) -> &[Value] {
        state
            .invoices
            .by_lease
            .get(&lease_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get_selected_invoice_id(state: &AppState) -> Option<InvoiceId> {
        state.invoices.selected_invoice
    }

    /// The selected invoice, looked up across every fetched lease.
    pub fn get_selected_invoice(state: &AppState) -> Option<&Value> {
        let id = state.invoices.selected_invoice?;
        state
            .invoices
            .by_lease
            .values()
            .flatten()
            .find(|invoice| id_of(invoice) == Some(id.0))
    }

    pub fn get_is_fetching_invoices(state: &AppState) -> bool {
        state.invoices.is_fetching
    }

    pub fn get_is_saving_invoice(state: &AppState) -> bool {
        !state.invoices.saving.is_empty()
    }

    pub fn get_is_invoice_panel_open(state: &AppState) -> bool {
        state.invoices.is_panel_open
    }

    pub fn get_invoice_form_errors(state: &AppState) -> &FieldErrors {
        &state.invoices.form_errors
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvoiceIntent {
    FetchAttributes,
    FetchByLease(LeaseId),
    Create {
        lease_id: LeaseId,
        invoice: Value,
    },
    Patch {
        lease_id: LeaseId,
        id: InvoiceId,
        changes: Value,
    },
}

impl Routine for InvoiceIntent {
    fn key(&self) -> IntentKey {
        IntentKey(match self {
            InvoiceIntent::FetchAttributes => "invoices/fetch_attributes",
            InvoiceIntent::FetchByLease(_) => "invoices/fetch_by_lease",
            InvoiceIntent::Create { .. } => "invoices/create",
            InvoiceIntent::Patch { .. } => "invoices/patch",
        })
    }

    fn takes_latest(&self) -> bool {
        !matches!(self, InvoiceIntent::Create { .. } | InvoiceIntent::Patch { .. })
    }

    fn started(&self, run: RunId) -> Option<Action> {
        let action = match self {
            InvoiceIntent::FetchAttributes => InvoiceAction::FetchAttributes,
            InvoiceIntent::FetchByLease(lease_id) => InvoiceAction::FetchByLease(*lease_id),
            InvoiceIntent::Create { lease_id, invoice } => InvoiceAction::Create {
                run,
                lease_id: *lease_id,
                invoice: invoice.clone(),
            },
            InvoiceIntent::Patch {
                lease_id,
                id,
                changes,
            } => InvoiceAction::Patch {
                run,
                lease_id: *lease_id,
                id: *id,
                changes: changes.clone(),
            },
        };
        Some(action.into())
    }

    fn request(&self) -> ApiRequest {
        let collection = Resource::Invoice.collection_path();
        match self {
            InvoiceIntent::FetchAttributes => ApiRequest::options(collection),
            InvoiceIntent::FetchByLease(lease_id) => {
                ApiRequest::get(collection).query("lease", lease_id)
            }
            InvoiceIntent::Create { lease_id, invoice } => {
                ApiRequest::post(collection).json(with_field(invoice.clone(), "lease", lease_id.0))
            }
            InvoiceIntent::Patch { id, changes, .. } => {
                ApiRequest::patch(Resource::Invoice.item_path(id.0)).json(changes.clone())
            }
        }
    }

    fn succeeded(&self, run: RunId, body: Value) -> Vec<Action> {
        match self {
            InvoiceIntent::FetchAttributes => vec![InvoiceAction::ReceiveAttributes(
                Attributes::from_options_body(&body),
            )
            .into()],
            InvoiceIntent::FetchByLease(lease_id) => vec![InvoiceAction::ReceiveByLease {
                lease_id: *lease_id,
                invoices: results_of(&body),
            }
            .into()],
            InvoiceIntent::Create { lease_id, .. } => vec![
                InvoiceAction::ReceiveCreated {
                    run,
                    lease_id: *lease_id,
                    invoice: body,
                }
                .into(),
                InvoiceAction::ClosePanel.into(),
            ],
            InvoiceIntent::Patch { lease_id, .. } => vec![InvoiceAction::ReceiveUpdated {
                run,
                lease_id: *lease_id,
                invoice: body,
            }
            .into()],
        }
    }

    fn failed(&self, run: RunId, failure: Failure) -> Action {
        let action = match self {
            InvoiceIntent::FetchAttributes => InvoiceAction::AttributesNotFound(failure),
            InvoiceIntent::FetchByLease(_) => InvoiceAction::NotFound(failure),
            InvoiceIntent::Create { .. } | InvoiceIntent::Patch { .. } => {
                InvoiceAction::SaveFailed { run, failure }
            }
        };
        action.into()
    }

    fn follow_up(&self, _body: &Value) -> Option<FollowUp> {
        match self {
            InvoiceIntent::Create { .. } => Some(FollowUp::notify("Invoice created")),
            InvoiceIntent::Patch { .. } => Some(FollowUp::notify("Invoice saved")),
            _ => None,
        }
    }
}
