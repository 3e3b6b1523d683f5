//! Command handlers. Each one triggers intents on the injected orchestrator and
//! renders the resulting store through the connected views.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use client_core::{
    selectors::*, AppState, CommentIntent, ContactIntent, FailureKind, InvoiceIntent,
    LeaseIntent, ListQuery, Orchestrator, RentBasisIntent, RoutineOutcome,
};
use serde_json::Value;
use shared::{
    domain::{CommentId, ContactId, LeaseId, RentBasisId},
    error::ApiError,
    protocol::FieldErrors,
};

use crate::{
    views::{self, EntityProps},
    CommentCommand, ContactCommand, InvoiceCommand, LeaseCommand, RentBasisCommand,
};

type FormErrors = for<'a> fn(&'a AppState) -> &'a FieldErrors;

fn list_query(search: Option<String>, page: Option<u32>, page_size: u32) -> ListQuery {
    let query = ListQuery {
        search,
        ..ListQuery::default()
    }
    .with_page_size(page_size);
    match page {
        Some(page) => query.with_page(page),
        None => query,
    }
}

fn parse_payload(raw: &str) -> Result<Value> {
    let payload: Value = serde_json::from_str(raw).context("payload is not valid JSON")?;
    if !payload.is_object() {
        bail!("payload must be a JSON object");
    }
    Ok(payload)
}

/// Turns a non-success outcome into an error carrying what the store recorded.
fn settle(outcome: &RoutineOutcome, state: &AppState, form_errors: FormErrors) -> Result<()> {
    match outcome {
        RoutineOutcome::Succeeded(_) => Ok(()),
        RoutineOutcome::Superseded => bail!("request was superseded by a newer one"),
        RoutineOutcome::Failed(failure) => match failure.kind {
            FailureKind::Validation if !form_errors(state).is_empty() => {
                bail!("{}", views::render_form_errors(form_errors(state)))
            }
            FailureKind::Server => match get_latest_error(state) {
                Some(entry) => bail!("{}", views::render_errors(std::slice::from_ref(entry))),
                None => bail!("{}", failure.message),
            },
            _ => Err(ApiError::from(failure).into()),
        },
    }
}

async fn run_and_settle(
    orchestrator: &Arc<Orchestrator>,
    intent: impl Into<client_core::Intent>,
    form_errors: FormErrors,
) -> Result<AppState> {
    let outcome = orchestrator.run(intent).await;
    let state = orchestrator.store().snapshot().await;
    settle(&outcome, &state, form_errors)?;
    Ok(state)
}

pub async fn leases(
    command: LeaseCommand,
    orchestrator: &Arc<Orchestrator>,
    page_size: u32,
) -> Result<String> {
    match command {
        LeaseCommand::List { search, page } => {
            let query = list_query(search, page, page_size);
            let state = run_and_settle(
                orchestrator,
                LeaseIntent::FetchAll(query),
                get_lease_form_errors,
            )
            .await?;
            Ok(views::render_lease_list(&views::lease_list_props(&state)))
        }
        LeaseCommand::Show { id } => {
            let lease_id = LeaseId(id);
            let (lease, comments, invoices) = futures::join!(
                orchestrator.run(LeaseIntent::FetchSingle(lease_id)),
                orchestrator.run(CommentIntent::FetchByLease(lease_id)),
                orchestrator.run(InvoiceIntent::FetchByLease(lease_id)),
            );
            let state = orchestrator.store().snapshot().await;
            settle(&lease, &state, get_lease_form_errors)?;
            let partial = [
                (&comments, get_comment_form_errors as FormErrors),
                (&invoices, get_invoice_form_errors),
            ];
            for (outcome, form_errors) in partial {
                if let Err(err) = settle(outcome, &state, form_errors) {
                    tracing::warn!("lease {lease_id} loaded partially: {err}");
                }
            }
            Ok(views::render_lease_detail(&views::lease_detail_props(
                &state, lease_id,
            )))
        }
        LeaseCommand::Attributes => {
            let state = run_and_settle(
                orchestrator,
                LeaseIntent::FetchAttributes,
                get_lease_form_errors,
            )
            .await?;
            Ok(views::render_attributes(
                "Lease fields",
                get_lease_attributes(&state),
            ))
        }
        LeaseCommand::Create { payload } => {
            let intent = LeaseIntent::Create(parse_payload(&payload)?);
            let state = run_and_settle(orchestrator, intent, get_lease_form_errors).await?;
            Ok(views::render_entity(&EntityProps {
                title: "Created lease".into(),
                entity: get_current_lease(&state),
            }))
        }
        LeaseCommand::Patch { id, payload } => {
            let intent = LeaseIntent::Patch {
                id: LeaseId(id),
                changes: parse_payload(&payload)?,
            };
            let state = run_and_settle(orchestrator, intent, get_lease_form_errors).await?;
            Ok(views::render_entity(&EntityProps {
                title: format!("Lease {id}"),
                entity: get_lease_by_id(&state, LeaseId(id)),
            }))
        }
    }
}

pub async fn contacts(
    command: ContactCommand,
    orchestrator: &Arc<Orchestrator>,
    page_size: u32,
) -> Result<String> {
    match command {
        ContactCommand::List { search, page } => {
            let query = list_query(search, page, page_size);
            let state = run_and_settle(
                orchestrator,
                ContactIntent::FetchAll(query),
                get_contact_form_errors,
            )
            .await?;
            Ok(views::render_table(&views::contact_list_props(&state)))
        }
        ContactCommand::Show { id } => {
            let state = run_and_settle(
                orchestrator,
                ContactIntent::FetchSingle(ContactId(id)),
                get_contact_form_errors,
            )
            .await?;
            Ok(views::render_entity(&EntityProps {
                title: format!("Contact {id}"),
                entity: get_contact_by_id(&state, ContactId(id)),
            }))
        }
        ContactCommand::Create { payload } => {
            let intent = ContactIntent::Create(parse_payload(&payload)?);
            let state = run_and_settle(orchestrator, intent, get_contact_form_errors).await?;
            Ok(views::render_entity(&EntityProps {
                title: "Created contact".into(),
                entity: get_current_contact(&state),
            }))
        }
        ContactCommand::Edit { id, payload } => {
            let intent = ContactIntent::Edit {
                id: ContactId(id),
                contact: parse_payload(&payload)?,
            };
            let state = run_and_settle(orchestrator, intent, get_contact_form_errors).await?;
            Ok(views::render_entity(&EntityProps {
                title: format!("Contact {id}"),
                entity: get_contact_by_id(&state, ContactId(id)),
            }))
        }
    }
}

pub async fn invoices(command: InvoiceCommand, orchestrator: &Arc<Orchestrator>) -> Result<String> {
    match command {
        InvoiceCommand::ByLease { lease_id } => {
            let lease_id = LeaseId(lease_id);
            let state = run_and_settle(
                orchestrator,
                InvoiceIntent::FetchByLease(lease_id),
                get_invoice_form_errors,
            )
            .await?;
            Ok(views::render_invoices(get_invoices_by_lease(
                &state, lease_id,
            )))
        }
    }
}

pub async fn rent_basis(
    command: RentBasisCommand,
    orchestrator: &Arc<Orchestrator>,
    page_size: u32,
) -> Result<String> {
    match command {
        RentBasisCommand::List { search, page } => {
            let query = list_query(search, page, page_size);
            let state = run_and_settle(
                orchestrator,
                RentBasisIntent::FetchAll(query),
                get_rent_basis_form_errors,
            )
            .await?;
            Ok(views::render_table(&views::rent_basis_list_props(&state)))
        }
        RentBasisCommand::Show { id } => {
            let state = run_and_settle(
                orchestrator,
                RentBasisIntent::FetchSingle(RentBasisId(id)),
                get_rent_basis_form_errors,
            )
            .await?;
            Ok(views::render_entity(&EntityProps {
                title: format!("Rent basis {id}"),
                entity: get_rent_basis_by_id(&state, RentBasisId(id)),
            }))
        }
    }
}

pub async fn comments(command: CommentCommand, orchestrator: &Arc<Orchestrator>) -> Result<String> {
    let (lease_id, intent) = match command {
        CommentCommand::ByLease { lease_id } => {
            (LeaseId(lease_id), CommentIntent::FetchByLease(LeaseId(lease_id)))
        }
        CommentCommand::Add {
            lease_id,
            text,
            topic,
        } => (
            LeaseId(lease_id),
            CommentIntent::Create {
                lease_id: LeaseId(lease_id),
                text,
                topic,
            },
        ),
        CommentCommand::Edit { lease_id, id, text } => (
            LeaseId(lease_id),
            CommentIntent::Edit {
                lease_id: LeaseId(lease_id),
                id: CommentId(id),
                text,
            },
        ),
        CommentCommand::Delete { lease_id, id } => (
            LeaseId(lease_id),
            CommentIntent::Delete {
                lease_id: LeaseId(lease_id),
                id: CommentId(id),
            },
        ),
    };

    let state = run_and_settle(orchestrator, intent, get_comment_form_errors).await?;
    Ok(views::render_comments(get_comments_by_lease(
        &state, lease_id,
    )))
}
