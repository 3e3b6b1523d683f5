use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use shared::{
    domain::{ContactId, Resource},
    protocol::{id_of, Attributes, FieldErrors, ListPage},
};

use super::ListQuery;
use crate::{
    error::{Failure, FailureKind},
    orchestration::{FollowUp, IntentKey, Routine, RunId},
    store::Action,
    transport::{ApiRequest, Method},
};

pub const CONTACT_ROUTE: &str = "/asiakkaat";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactState {
    pub attributes: Option<Attributes>,
    pub list: Option<ListPage>,
    pub by_id: HashMap<ContactId, Value>,
    pub current: Option<ContactId>,
    pub is_fetching_list: bool,
    pub is_fetching_single: bool,
    pub is_fetching_attributes: bool,
    pub saving: BTreeSet<RunId>,
    pub form_errors: FieldErrors,
    pub is_edit_mode: bool,
    pub is_contact_form_open: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContactAction {
    FetchAttributes,
    ReceiveAttributes(Attributes),
    AttributesNotFound(Failure),
    FetchAll(ListQuery),
    ReceiveAll(ListPage),
    ListNotFound(Failure),
    FetchSingle(ContactId),
    ReceiveSingle { id: ContactId, contact: Value },
    NotFound(Failure),
    Create { run: RunId, contact: Value },
    ReceiveCreated { run: RunId, contact: Value },
    Edit { run: RunId, id: ContactId, contact: Value },
    ReceiveUpdated { run: RunId, id: ContactId, contact: Value },
    SaveFailed { run: RunId, failure: Failure },
    ShowEditMode,
    HideEditMode,
    OpenContactForm,
    CloseContactForm,
}

impl ContactAction {
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ContactAction::AttributesNotFound(failure)
            | ContactAction::ListNotFound(failure)
            | ContactAction::NotFound(failure)
            | ContactAction::SaveFailed { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

pub fn reduce(mut state: ContactState, action: ContactAction) -> ContactState {
    match action {
        ContactAction::FetchAttributes => state.is_fetching_attributes = true,
        ContactAction::ReceiveAttributes(attributes) => {
            state.attributes = Some(attributes);
            state.is_fetching_attributes = false;
        }
        ContactAction::AttributesNotFound(_) => state.is_fetching_attributes = false,
        ContactAction::FetchAll(_) => state.is_fetching_list = true,
        ContactAction::ReceiveAll(page) => {
            state.list = Some(page);
            state.is_fetching_list = false;
        }
        ContactAction::ListNotFound(_) => state.is_fetching_list = false,
        ContactAction::FetchSingle(_) => state.is_fetching_single = true,
        ContactAction::ReceiveSingle { id, contact } => {
            state.by_id.insert(id, contact);
            state.current = Some(id);
            state.is_fetching_single = false;
        }
        ContactAction::NotFound(_) => state.is_fetching_single = false,
        ContactAction::Create { run, .. } | ContactAction::Edit { run, .. } => {
            state.saving.insert(run);
            state.form_errors = FieldErrors::default();
        }
        ContactAction::ReceiveCreated { run, contact } => {
            if let Some(id) = id_of(&contact).map(ContactId) {
                state.by_id.insert(id, contact);
                state.current = Some(id);
            }
            state.saving.remove(&run);
            state.is_contact_form_open = false;
        }
        ContactAction::ReceiveUpdated { run, id, contact } => {
            state.by_id.insert(id, contact);
            state.current = Some(id);
            state.saving.remove(&run);
        }
        ContactAction::SaveFailed { run, failure } => {
            if failure.kind == FailureKind::Validation {
                state.form_errors = failure.field_errors;
            }
            state.saving.remove(&run);
        }
        ContactAction::ShowEditMode => state.is_edit_mode = true,
        ContactAction::HideEditMode => state.is_edit_mode = false,
        ContactAction::OpenContactForm => state.is_contact_form_open = true,
        ContactAction::CloseContactForm => {
            state.is_contact_form_open = false;
            state.form_errors = FieldErrors::default();
        }
    }
    state
}

pub mod selectors {
    use serde_json::Value;
    use shared::{
        domain::ContactId,
        protocol::{Attributes, FieldErrors, ListPage},
    };

    use crate::store::AppState;

    pub fn get_contact_attributes(state: &AppState) -> Option<&Attributes> {
        state.contacts.attributes.as_ref()
    }

    pub fn get_contact_list(state: &AppState) -> Option<&ListPage> {
        state.contacts.list.as_ref()
    }

    pub fn get_contact_rows(state: &AppState) -> &[Value] {
        state
            .contacts
            .list
            .as_ref()
            .map(|page| page.results.as_slice())
            .unwrap_or_default()
    }

    pub fn get_contact_by_id(state: &AppState, id: ContactId) -> Option<&Value> {
        state.contacts.by_id.get(&id)
    }

    pub fn get_current_contact(state: &AppState) -> Option<&Value> {
        state
            .contacts
            .current
            .and_then(|id| state.contacts.by_id.get(&id))
    }

    pub fn get_is_fetching_contacts(state: &AppState) -> bool {
        state.contacts.is_fetching_list || state.contacts.is_fetching_single
    }

    pub fn get_is_fetching_contact_list(state: &AppState) -> bool {
        state.contacts.is_fetching_list
    }

    pub fn get_is_fetching_contact(state: &AppState) -> bool {
        state.contacts.is_fetching_single
    }

    pub fn get_is_saving_contact(state: &AppState) -> bool {
        !state.contacts.saving.is_empty()
    }

    pub fn get_contact_form_errors(state: &AppState) -> &FieldErrors {
        &state.contacts.form_errors
    }

    pub fn get_is_contact_edit_mode(state: &AppState) -> bool {
        state.contacts.is_edit_mode
    }

    pub fn get_is_contact_form_open(state: &AppState) -> bool {
        state.contacts.is_contact_form_open
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContactIntent {
    FetchAttributes,
    FetchAll(ListQuery),
    FetchSingle(ContactId),
    Create(Value),
    /// Full replacement of the contact record.
    Edit { id: ContactId, contact: Value },
}

impl Routine for ContactIntent {
    fn key(&self) -> IntentKey {
        IntentKey(match self {
            ContactIntent::FetchAttributes => "contacts/fetch_attributes",
            ContactIntent::FetchAll(_) => "contacts/fetch_all",
            ContactIntent::FetchSingle(_) => "contacts/fetch_single",
            ContactIntent::Create(_) => "contacts/create",
            ContactIntent::Edit { .. } => "contacts/edit",
        })
    }

    fn takes_latest(&self) -> bool {
        !matches!(self, ContactIntent::Create(_) | ContactIntent::Edit { .. })
    }

    fn started(&self, run: RunId) -> Option<Action> {
        let action = match self {
            ContactIntent::FetchAttributes => ContactAction::FetchAttributes,
            ContactIntent::FetchAll(query) => ContactAction::FetchAll(query.clone()),
            ContactIntent::FetchSingle(id) => ContactAction::FetchSingle(*id),
            ContactIntent::Create(contact) => ContactAction::Create {
                run,
                contact: contact.clone(),
            },
            ContactIntent::Edit { id, contact } => ContactAction::Edit {
                run,
                id: *id,
                contact: contact.clone(),
            },
        };
        Some(action.into())
    }

    fn request(&self) -> ApiRequest {
        let collection = Resource::Contact.collection_path();
        match self {
            ContactIntent::FetchAttributes => ApiRequest::options(collection),
            ContactIntent::FetchAll(query) => query.apply(ApiRequest::get(collection)),
            ContactIntent::FetchSingle(id) => ApiRequest::get(Resource::Contact.item_path(id.0)),
            ContactIntent::Create(contact) => ApiRequest::post(collection).json(contact.clone()),
            ContactIntent::Edit { id, contact } => {
                ApiRequest::new(Method::Put, Resource::Contact.item_path(id.0))
                    .json(contact.clone())
            }
        }
    }

    fn succeeded(&self, run: RunId, body: Value) -> Vec<Action> {
        match self {
            ContactIntent::FetchAttributes => vec![ContactAction::ReceiveAttributes(
                Attributes::from_options_body(&body),
            )
            .into()],
            ContactIntent::FetchAll(_) => {
                vec![ContactAction::ReceiveAll(ListPage::from_body(&body)).into()]
            }
            ContactIntent::FetchSingle(id) => vec![ContactAction::ReceiveSingle {
                id: *id,
                contact: body,
            }
            .into()],
            ContactIntent::Create(_) => {
                vec![ContactAction::ReceiveCreated { run, contact: body }.into()]
            }
            ContactIntent::Edit { id, .. } => vec![
                ContactAction::ReceiveUpdated {
                    run,
                    id: *id,
                    contact: body,
                }
                .into(),
                ContactAction::HideEditMode.into(),
            ],
        }
    }

    fn failed(&self, run: RunId, failure: Failure) -> Action {
        let action = match self {
            ContactIntent::FetchAttributes => ContactAction::AttributesNotFound(failure),
            ContactIntent::FetchAll(_) => ContactAction::ListNotFound(failure),
            ContactIntent::FetchSingle(_) => ContactAction::NotFound(failure),
            ContactIntent::Create(_) | ContactIntent::Edit { .. } => {
                ContactAction::SaveFailed { run, failure }
            }
        };
        action.into()
    }

    fn follow_up(&self, body: &Value) -> Option<FollowUp> {
        match self {
            ContactIntent::Create(_) => {
                let follow_up = FollowUp::notify("Contact created");
                Some(match id_of(body) {
                    Some(id) => follow_up.and_navigate(format!("{CONTACT_ROUTE}/{id}")),
                    None => follow_up,
                })
            }
            ContactIntent::Edit { .. } => Some(FollowUp::notify("Contact saved")),
            _ => None,
        }
    }
}
