use std::collections::{BTreeSet, HashMap};

use serde_json::{json, Value};
use shared::{
    domain::{CommentId, LeaseId, Resource},
    protocol::{results_of, Attributes, FieldErrors},
};

use super::{remove_by_id, upsert_by_id, with_field};
use crate::{
    error::{Failure, FailureKind},
    orchestration::{FollowUp, IntentKey, Routine, RunId},
    store::Action,
    transport::ApiRequest,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentState {
    pub attributes: Option<Attributes>,
    pub by_lease: HashMap<LeaseId, Vec<Value>>,
    pub is_fetching: bool,
    pub is_fetching_attributes: bool,
    pub saving: BTreeSet<RunId>,
    pub form_errors: FieldErrors,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommentAction {
    FetchAttributes,
    ReceiveAttributes(Attributes),
    AttributesNotFound(Failure),
    FetchByLease(LeaseId),
    ReceiveByLease {
        lease_id: LeaseId,
        comments: Vec<Value>,
    },
    NotFound(Failure),
    Create {
        run: RunId,
        lease_id: LeaseId,
        comment: Value,
    },
    Edit {
        run: RunId,
        lease_id: LeaseId,
        id: CommentId,
        changes: Value,
    },
    Delete {
        run: RunId,
        lease_id: LeaseId,
        id: CommentId,
    },
    ReceiveCreated {
        run: RunId,
        lease_id: LeaseId,
        comment: Value,
    },
    ReceiveEdited {
        run: RunId,
        lease_id: LeaseId,
        comment: Value,
    },
    ReceiveDeleted {
        run: RunId,
        lease_id: LeaseId,
        id: CommentId,
    },
    SaveFailed {
        run: RunId,
        failure: Failure,
    },
}

impl CommentAction {
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            CommentAction::AttributesNotFound(failure)
            | CommentAction::NotFound(failure)
            | CommentAction::SaveFailed { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

pub fn reduce(mut state: CommentState, action: CommentAction) -> CommentState {
    match action {
        CommentAction::FetchAttributes => state.is_fetching_attributes = true,
        CommentAction::ReceiveAttributes(attributes) => {
            state.attributes = Some(attributes);
            state.is_fetching_attributes = false;
        }
        CommentAction::AttributesNotFound(_) => state.is_fetching_attributes = false,
        CommentAction::FetchByLease(_) => state.is_fetching = true,
        CommentAction::ReceiveByLease { lease_id, comments } => {
            state.by_lease.insert(lease_id, comments);
            state.is_fetching = false;
        }
        CommentAction::NotFound(_) => state.is_fetching = false,
        CommentAction::Create { run, .. }
        | CommentAction::Edit { run, .. }
        | CommentAction::Delete { run, .. } => {
            state.saving.insert(run);
            state.form_errors = FieldErrors::default();
        }
        CommentAction::ReceiveCreated {
            run,
            lease_id,
            comment,
        }
        | CommentAction::ReceiveEdited {
            run,
            lease_id,
            comment,
        } => {
            upsert_by_id(state.by_lease.entry(lease_id).or_default(), comment);
            state.saving.remove(&run);
        }
        CommentAction::ReceiveDeleted { run, lease_id, id } => {
            if let Some(comments) = state.by_lease.get_mut(&lease_id) {
                remove_by_id(comments, id.0);
            }
            state.saving.remove(&run);
        }
        CommentAction::SaveFailed { run, failure } => {
            if failure.kind == FailureKind::Validation {
                state.form_errors = failure.field_errors;
            }
            state.saving.remove(&run);
        }
    }
    state
}

pub mod selectors {
    use serde_json::Value;
    use shared::{
        domain::LeaseId,
        protocol::{Attributes, FieldErrors},
    };

    use crate::store::AppState;

    pub fn get_comment_attributes(state: &AppState) -> Option<&Attributes> {
        state.comments.attributes.as_ref()
    }

    /// Comments of a lease; empty until they have been fetched.
    pub fn get_comments_by_lease(state: &AppState, lease_id: LeaseId) -> &[Value] {
        state
            .comments
            .by_lease
            .get(&lease_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get_is_fetching_comments(state: &AppState) -> bool {
        state.comments.is_fetching
    }

    pub fn get_is_saving_comment(state: &AppState) -> bool {
        !state.comments.saving.is_empty()
    }

    pub fn get_comment_form_errors(state: &AppState) -> &FieldErrors {
        &state.comments.form_errors
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommentIntent {
    FetchAttributes,
    FetchByLease(LeaseId),
    Create {
        lease_id: LeaseId,
        text: String,
        topic: Option<i64>,
    },
    Edit {
        lease_id: LeaseId,
        id: CommentId,
        text: String,
    },
    Delete {
        lease_id: LeaseId,
        id: CommentId,
    },
}

impl Routine for CommentIntent {
    fn key(&self) -> IntentKey {
        IntentKey(match self {
            CommentIntent::FetchAttributes => "comments/fetch_attributes",
            CommentIntent::FetchByLease(_) => "comments/fetch_by_lease",
            CommentIntent::Create { .. } => "comments/create",
            CommentIntent::Edit { .. } => "comments/edit",
            CommentIntent::Delete { .. } => "comments/delete",
        })
    }

    fn takes_latest(&self) -> bool {
        matches!(
            self,
            CommentIntent::FetchAttributes | CommentIntent::FetchByLease(_)
        )
    }

    fn started(&self, run: RunId) -> Option<Action> {
        let action = match self {
            CommentIntent::FetchAttributes => CommentAction::FetchAttributes,
            CommentIntent::FetchByLease(lease_id) => CommentAction::FetchByLease(*lease_id),
            CommentIntent::Create { lease_id, .. } => CommentAction::Create {
                run,
                lease_id: *lease_id,
                comment: self.payload(),
            },
            CommentIntent::Edit { lease_id, id, .. } => CommentAction::Edit {
                run,
                lease_id: *lease_id,
                id: *id,
                changes: self.payload(),
            },
            CommentIntent::Delete { lease_id, id } => CommentAction::Delete {
                run,
                lease_id: *lease_id,
                id: *id,
            },
        };
        Some(action.into())
    }

    fn request(&self) -> ApiRequest {
        let collection = Resource::Comment.collection_path();
        match self {
            CommentIntent::FetchAttributes => ApiRequest::options(collection),
            CommentIntent::FetchByLease(lease_id) => {
                ApiRequest::get(collection).query("lease", lease_id)
            }
            CommentIntent::Create { .. } => ApiRequest::post(collection).json(self.payload()),
            CommentIntent::Edit { id, .. } => {
                ApiRequest::patch(Resource::Comment.item_path(id.0)).json(self.payload())
            }
            CommentIntent::Delete { id, .. } => {
                ApiRequest::delete(Resource::Comment.item_path(id.0))
            }
        }
    }

    fn succeeded(&self, run: RunId, body: Value) -> Vec<Action> {
        let action = match self {
            CommentIntent::FetchAttributes => {
                CommentAction::ReceiveAttributes(Attributes::from_options_body(&body))
            }
            CommentIntent::FetchByLease(lease_id) => CommentAction::ReceiveByLease {
                lease_id: *lease_id,
                comments: results_of(&body),
            },
            CommentIntent::Create { lease_id, .. } => CommentAction::ReceiveCreated {
                run,
                lease_id: *lease_id,
                comment: body,
            },
            CommentIntent::Edit { lease_id, .. } => CommentAction::ReceiveEdited {
                run,
                lease_id: *lease_id,
                comment: body,
            },
            CommentIntent::Delete { lease_id, id } => CommentAction::ReceiveDeleted {
                run,
                lease_id: *lease_id,
                id: *id,
            },
        };
        vec![action.into()]
    }

    fn failed(&self, run: RunId, failure: Failure) -> Action {
        let action = match self {
            CommentIntent::FetchAttributes => CommentAction::AttributesNotFound(failure),
            CommentIntent::FetchByLease(_) => CommentAction::NotFound(failure),
            CommentIntent::Create { .. }
            | CommentIntent::Edit { .. }
            | CommentIntent::Delete { .. } => CommentAction::SaveFailed { run, failure },
        };
        action.into()
    }

    fn follow_up(&self, _body: &Value) -> Option<FollowUp> {
        match self {
            CommentIntent::Create { .. } | CommentIntent::Edit { .. } => {
                Some(FollowUp::notify("Comment saved"))
            }
            CommentIntent::Delete { .. } => Some(FollowUp::notify("Comment deleted")),
            _ => None,
        }
    }
}

impl CommentIntent {
    fn payload(&self) -> Value {
        match self {
            CommentIntent::Create {
                lease_id,
                text,
                topic,
            } => {
                let comment = with_field(json!({ "text": text }), "lease", lease_id.0);
                match topic {
                    Some(topic) => with_field(comment, "topic", *topic),
                    None => comment,
                }
            }
            CommentIntent::Edit { text, .. } => json!({ "text": text }),
            _ => Value::Null,
        }
    }
}
