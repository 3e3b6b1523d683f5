use std::{collections::VecDeque, sync::Mutex as StdMutex, time::Duration};

use async_trait::async_trait;
use serde_json::json;
use shared::domain::{CommentId, LeaseId};
use tokio::sync::oneshot;

use super::*;
use crate::{
    error::ClientError,
    resources::{comments::CommentAction, ListQuery},
    selectors::*,
    store::{auth::AuthAction, AppState},
    transport::{ApiResponse, ApiToken, Method},
};

enum Scripted {
    Respond(ApiResponse),
    Gate(oneshot::Receiver<ApiResponse>),
    Broken,
}

#[derive(Default)]
struct ScriptedTransport {
    script: StdMutex<VecDeque<Scripted>>,
    seen: StdMutex<Vec<(ApiRequest, Option<ApiToken>)>>,
}

impl ScriptedTransport {
    fn new(script: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: StdMutex::new(script.into_iter().collect()),
            seen: StdMutex::new(Vec::new()),
        })
    }

    fn respond(status: u16, body: Value) -> Arc<Self> {
        Self::new([Scripted::Respond(ApiResponse::new(status, body))])
    }

    fn seen(&self) -> Vec<(ApiRequest, Option<ApiToken>)> {
        self.seen.lock().expect("seen").clone()
    }

    async fn wait_for_requests(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.seen.lock().expect("seen").len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("requests should arrive");
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<&ApiToken>,
    ) -> Result<ApiResponse, ClientError> {
        self.seen
            .lock()
            .expect("seen")
            .push((request.clone(), token.cloned()));
        let next = self.script.lock().expect("script").pop_front();
        match next {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Gate(rx)) => rx
                .await
                .map_err(|_| ClientError::Settings("gate dropped".into())),
            Some(Scripted::Broken) | None => {
                Err(ClientError::InvalidUrl(url::ParseError::EmptyHost))
            }
        }
    }
}

#[derive(Default)]
struct RecordingEffects {
    navigations: StdMutex<Vec<String>>,
    successes: StdMutex<Vec<String>>,
    errors: StdMutex<Vec<String>>,
}

impl Navigator for RecordingEffects {
    fn navigate(&self, path: &str) {
        self.navigations.lock().expect("nav").push(path.to_string());
    }
}

impl Notifier for RecordingEffects {
    fn success(&self, message: &str) {
        self.successes.lock().expect("ok").push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().expect("err").push(message.to_string());
    }
}

fn orchestrator_with(
    transport: Arc<ScriptedTransport>,
) -> (Arc<Orchestrator>, Arc<RecordingEffects>) {
    let effects = Arc::new(RecordingEffects::default());
    let orchestrator = Orchestrator::new_with_effects(
        Arc::new(Store::default()),
        transport,
        effects.clone(),
        effects.clone(),
    );
    (orchestrator, effects)
}

#[tokio::test]
async fn fetch_success_sets_then_clears_loading_flag() {
    let transport = ScriptedTransport::respond(200, json!([{"id": 1, "text": "x"}]));
    let (orchestrator, _) = orchestrator_with(transport.clone());
    let mut rx = orchestrator.store().subscribe();

    let outcome = orchestrator
        .run(CommentIntent::FetchByLease(LeaseId(42)))
        .await;
    assert!(matches!(outcome, RoutineOutcome::Succeeded(_)));

    assert_eq!(
        rx.recv().await.expect("start"),
        Action::Comments(CommentAction::FetchByLease(LeaseId(42)))
    );
    assert!(matches!(
        rx.recv().await.expect("receive"),
        Action::Comments(CommentAction::ReceiveByLease { .. })
    ));

    let state = orchestrator.store().snapshot().await;
    assert!(!get_is_fetching_comments(&state));
    assert_eq!(
        get_comments_by_lease(&state, LeaseId(42)),
        [json!({"id": 1, "text": "x"})]
    );

    let (request, token) = &transport.seen()[0];
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.path, "comment/");
    assert_eq!(request.query, vec![("lease".to_string(), "42".to_string())]);
    assert!(token.is_none());
    assert_eq!(orchestrator.in_flight_count().await, 0);
}

#[tokio::test]
async fn token_from_auth_slice_reaches_transport() {
    let transport = ScriptedTransport::respond(200, json!({"count": 0, "results": []}));
    let (orchestrator, _) = orchestrator_with(transport.clone());
    orchestrator
        .store()
        .dispatch(AuthAction::ReceiveApiToken(ApiToken::new("secret-token")))
        .await;

    orchestrator
        .run(LeaseIntent::FetchAll(ListQuery::search("Kallio")))
        .await;

    let (request, token) = &transport.seen()[0];
    assert_eq!(token.as_ref(), Some(&ApiToken::new("secret-token")));
    assert_eq!(
        request.query,
        vec![("search".to_string(), "Kallio".to_string())]
    );
}

#[tokio::test]
async fn latest_trigger_wins_over_slower_earlier_one() {
    let (tx_a, rx_a) = oneshot::channel();
    let (tx_b, rx_b) = oneshot::channel();
    let transport = ScriptedTransport::new([Scripted::Gate(rx_a), Scripted::Gate(rx_b)]);
    let (orchestrator, _) = orchestrator_with(transport.clone());

    let first = orchestrator
        .trigger(CommentIntent::FetchByLease(LeaseId(42)))
        .await;
    transport.wait_for_requests(1).await;
    let second = orchestrator
        .trigger(CommentIntent::FetchByLease(LeaseId(42)))
        .await;
    transport.wait_for_requests(2).await;

    tx_b.send(ApiResponse::new(200, json!([{"id": 2, "text": "from B"}])))
        .expect("deliver B");
    let outcome = second.await.expect("second routine");
    assert!(matches!(outcome, RoutineOutcome::Succeeded(_)));

    // The first routine's response shows up late and must be ignored.
    let _ = tx_a.send(ApiResponse::new(200, json!([{"id": 1, "text": "from A"}])));
    let first = first.await;
    assert!(first.map_or_else(|err| err.is_cancelled(), |outcome| outcome
        == RoutineOutcome::Superseded));

    let state = orchestrator.store().snapshot().await;
    assert!(!get_is_fetching_comments(&state));
    assert_eq!(
        get_comments_by_lease(&state, LeaseId(42)),
        [json!({"id": 2, "text": "from B"})]
    );
    assert_eq!(orchestrator.in_flight_count().await, 0);
}

#[tokio::test]
async fn stale_run_never_touches_state() {
    let (_tx, rx) = oneshot::channel();
    let transport = ScriptedTransport::new([Scripted::Gate(rx)]);
    let (orchestrator, _) = orchestrator_with(transport.clone());

    let _current = orchestrator
        .trigger(CommentIntent::FetchByLease(LeaseId(1)))
        .await;
    transport.wait_for_requests(1).await;
    let before = orchestrator.store().snapshot().await;

    let outcome = Arc::clone(&orchestrator)
        .execute(CommentIntent::FetchByLease(LeaseId(1)).into(), RunId(0))
        .await;
    assert_eq!(outcome, RoutineOutcome::Superseded);
    assert_eq!(orchestrator.store().snapshot().await, before);
    assert_eq!(transport.seen().len(), 1);
}

#[tokio::test]
async fn different_intent_kinds_do_not_supersede_each_other() {
    let (tx_a, rx_a) = oneshot::channel();
    let transport = ScriptedTransport::new([
        Scripted::Gate(rx_a),
        Scripted::Respond(ApiResponse::new(200, json!({"actions": {"POST": {"text": {}}}}))),
    ]);
    let (orchestrator, _) = orchestrator_with(transport.clone());

    let fetch = orchestrator
        .trigger(CommentIntent::FetchByLease(LeaseId(5)))
        .await;
    transport.wait_for_requests(1).await;
    let attributes = orchestrator.run(CommentIntent::FetchAttributes).await;
    assert!(matches!(attributes, RoutineOutcome::Succeeded(_)));

    tx_a.send(ApiResponse::new(200, json!([]))).expect("deliver");
    assert!(matches!(
        fetch.await.expect("fetch"),
        RoutineOutcome::Succeeded(_)
    ));

    let state = orchestrator.store().snapshot().await;
    assert!(get_comment_attributes(&state).is_some());
    assert_eq!(transport.seen()[1].0.method, Method::Options);
    assert!(get_comments_by_lease(&state, LeaseId(5)).is_empty());
    assert!(state.comments.by_lease.contains_key(&LeaseId(5)));
}

#[tokio::test]
async fn list_flag_survives_a_single_fetch_finishing_first() {
    let (tx_list, rx_list) = oneshot::channel();
    let transport = ScriptedTransport::new([
        Scripted::Gate(rx_list),
        Scripted::Respond(ApiResponse::new(200, json!({"id": 4, "identifier": "A1"}))),
    ]);
    let (orchestrator, _) = orchestrator_with(transport.clone());

    let list = orchestrator
        .trigger(LeaseIntent::FetchAll(ListQuery::default()))
        .await;
    transport.wait_for_requests(1).await;
    let single = orchestrator.run(LeaseIntent::FetchSingle(LeaseId(4))).await;
    assert!(matches!(single, RoutineOutcome::Succeeded(_)));

    let state = orchestrator.store().snapshot().await;
    assert_eq!(orchestrator.in_flight_count().await, 1);
    assert!(get_is_fetching_lease_list(&state));
    assert!(!get_is_fetching_lease(&state));
    assert!(get_is_fetching_leases(&state), "list fetch is still in flight");

    tx_list
        .send(ApiResponse::new(200, json!({"count": 1, "results": [{"id": 4}]})))
        .expect("deliver list");
    assert!(matches!(list.await.expect("list"), RoutineOutcome::Succeeded(_)));

    let state = orchestrator.store().snapshot().await;
    assert!(!get_is_fetching_leases(&state));
    assert_eq!(get_lease_rows(&state), [json!({"id": 4})]);
}

#[tokio::test]
async fn overlapping_deletes_of_different_comments_both_apply() {
    let (tx_first, rx_first) = oneshot::channel();
    let (tx_second, rx_second) = oneshot::channel();
    let transport = ScriptedTransport::new([Scripted::Gate(rx_first), Scripted::Gate(rx_second)]);
    let (orchestrator, effects) = orchestrator_with(transport.clone());
    orchestrator
        .store()
        .dispatch(CommentAction::ReceiveByLease {
            lease_id: LeaseId(2),
            comments: vec![json!({"id": 5}), json!({"id": 6})],
        })
        .await;

    let first = orchestrator
        .trigger(CommentIntent::Delete {
            lease_id: LeaseId(2),
            id: CommentId(5),
        })
        .await;
    transport.wait_for_requests(1).await;
    let second = orchestrator
        .trigger(CommentIntent::Delete {
            lease_id: LeaseId(2),
            id: CommentId(6),
        })
        .await;
    transport.wait_for_requests(2).await;
    assert_eq!(orchestrator.in_flight_count().await, 2);

    tx_second
        .send(ApiResponse::new(204, Value::Null))
        .expect("deliver second");
    assert_eq!(
        second.await.expect("second"),
        RoutineOutcome::Succeeded(Value::Null)
    );
    assert!(get_is_saving_comment(&orchestrator.store().snapshot().await));

    tx_first
        .send(ApiResponse::new(204, Value::Null))
        .expect("deliver first");
    assert_eq!(
        first.await.expect("first"),
        RoutineOutcome::Succeeded(Value::Null)
    );

    let state = orchestrator.store().snapshot().await;
    assert!(get_comments_by_lease(&state, LeaseId(2)).is_empty());
    assert!(!get_is_saving_comment(&state));
    assert_eq!(orchestrator.in_flight_count().await, 0);
    assert_eq!(
        effects.successes.lock().expect("ok").as_slice(),
        ["Comment deleted", "Comment deleted"]
    );
}

#[test]
fn only_reads_take_latest() {
    let reads: Vec<Intent> = vec![
        LeaseIntent::FetchAll(ListQuery::default()).into(),
        ContactIntent::FetchAttributes.into(),
        InvoiceIntent::FetchByLease(LeaseId(1)).into(),
        RentBasisIntent::FetchSingle(shared::domain::RentBasisId(1)).into(),
        CommentIntent::FetchByLease(LeaseId(1)).into(),
    ];
    let writes: Vec<Intent> = vec![
        LeaseIntent::Patch {
            id: LeaseId(1),
            changes: json!({}),
        }
        .into(),
        ContactIntent::Create(json!({})).into(),
        InvoiceIntent::Create {
            lease_id: LeaseId(1),
            invoice: json!({}),
        }
        .into(),
        RentBasisIntent::Create(json!({})).into(),
        CommentIntent::Delete {
            lease_id: LeaseId(1),
            id: CommentId(1),
        }
        .into(),
    ];
    assert!(reads.iter().all(|intent| intent.takes_latest()));
    assert!(!writes.iter().any(|intent| intent.takes_latest()));
}

#[tokio::test]
async fn server_error_clears_flag_and_records_global_error() {
    let transport = ScriptedTransport::new([
        Scripted::Respond(ApiResponse::new(200, json!([{"id": 1, "text": "x"}]))),
        Scripted::Respond(ApiResponse::new(500, json!({"detail": "database unavailable"}))),
    ]);
    let (orchestrator, effects) = orchestrator_with(transport);

    orchestrator
        .run(CommentIntent::FetchByLease(LeaseId(42)))
        .await;
    let outcome = orchestrator
        .run(CommentIntent::FetchByLease(LeaseId(42)))
        .await;

    let RoutineOutcome::Failed(failure) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(failure.kind, FailureKind::Server);

    let state = orchestrator.store().snapshot().await;
    assert!(!get_is_fetching_comments(&state));
    assert_eq!(
        get_comments_by_lease(&state, LeaseId(42)),
        [json!({"id": 1, "text": "x"})]
    );
    let errors = get_errors(&state);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].status, Some(500));
    assert_eq!(errors[0].message, "database unavailable");
    assert_eq!(
        effects.errors.lock().expect("errors").as_slice(),
        ["database unavailable"]
    );
}

#[tokio::test]
async fn transport_error_is_treated_like_server_error() {
    let transport = ScriptedTransport::new([Scripted::Broken]);
    let (orchestrator, _) = orchestrator_with(transport);

    let outcome = orchestrator.run(LeaseIntent::FetchSingle(LeaseId(9))).await;
    assert!(matches!(
        outcome,
        RoutineOutcome::Failed(Failure {
            kind: FailureKind::Server,
            ..
        })
    ));

    let state = orchestrator.store().snapshot().await;
    assert!(!get_is_fetching_leases(&state));
    assert!(get_lease_by_id(&state, LeaseId(9)).is_none());
    assert_eq!(get_errors(&state).len(), 1);
}

#[tokio::test]
async fn validation_error_is_kept_on_the_form() {
    let transport =
        ScriptedTransport::respond(400, json!({"text": ["This field may not be blank."]}));
    let (orchestrator, effects) = orchestrator_with(transport);

    let outcome = orchestrator
        .run(CommentIntent::Create {
            lease_id: LeaseId(3),
            text: String::new(),
            topic: None,
        })
        .await;
    assert!(matches!(
        outcome,
        RoutineOutcome::Failed(Failure {
            kind: FailureKind::Validation,
            ..
        })
    ));

    let state = orchestrator.store().snapshot().await;
    assert!(!get_is_saving_comment(&state));
    assert_eq!(
        get_comment_form_errors(&state).get("text"),
        ["This field may not be blank."]
    );
    assert!(get_errors(&state).is_empty());
    assert!(effects.errors.lock().expect("errors").is_empty());
    assert!(effects.successes.lock().expect("ok").is_empty());
}

#[tokio::test]
async fn not_found_keeps_previous_entity() {
    let transport = ScriptedTransport::new([
        Scripted::Respond(ApiResponse::new(200, json!({"id": 4, "identifier": "A1"}))),
        Scripted::Respond(ApiResponse::new(404, json!({"detail": "Not found."}))),
    ]);
    let (orchestrator, _) = orchestrator_with(transport);

    orchestrator.run(LeaseIntent::FetchSingle(LeaseId(4))).await;
    orchestrator.run(LeaseIntent::FetchSingle(LeaseId(4))).await;

    let state = orchestrator.store().snapshot().await;
    assert!(!get_is_fetching_leases(&state));
    assert_eq!(
        get_lease_by_id(&state, LeaseId(4)),
        Some(&json!({"id": 4, "identifier": "A1"}))
    );
    assert!(get_errors(&state).is_empty());
}

#[tokio::test]
async fn create_lease_notifies_and_navigates() {
    let transport = ScriptedTransport::respond(201, json!({"id": 77, "type": 1}));
    let (orchestrator, effects) = orchestrator_with(transport.clone());

    orchestrator
        .run(LeaseIntent::Create(json!({"type": 1})))
        .await;

    let state = orchestrator.store().snapshot().await;
    assert_eq!(get_current_lease(&state), Some(&json!({"id": 77, "type": 1})));
    assert_eq!(
        effects.navigations.lock().expect("nav").as_slice(),
        ["/vuokraukset/77"]
    );
    assert_eq!(
        effects.successes.lock().expect("ok").as_slice(),
        ["Lease created"]
    );
    let (request, _) = &transport.seen()[0];
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.body, Some(json!({"type": 1})));
}

#[tokio::test]
async fn patch_lease_hides_edit_mode_on_success() {
    let transport = ScriptedTransport::respond(200, json!({"id": 8, "note": "updated"}));
    let (orchestrator, effects) = orchestrator_with(transport.clone());
    orchestrator
        .store()
        .dispatch(crate::resources::leases::LeaseAction::ShowEditMode)
        .await;

    orchestrator
        .run(LeaseIntent::Patch {
            id: LeaseId(8),
            changes: json!({"note": "updated"}),
        })
        .await;

    let state = orchestrator.store().snapshot().await;
    assert!(!get_is_lease_edit_mode(&state));
    assert_eq!(
        get_lease_by_id(&state, LeaseId(8)),
        Some(&json!({"id": 8, "note": "updated"}))
    );
    assert!(effects.navigations.lock().expect("nav").is_empty());
    assert_eq!(transport.seen()[0].0.method, Method::Patch);
    assert_eq!(transport.seen()[0].0.path, "lease/8/");
}

#[tokio::test]
async fn delete_comment_accepts_empty_body() {
    let transport = ScriptedTransport::respond(204, Value::Null);
    let (orchestrator, effects) = orchestrator_with(transport.clone());
    orchestrator
        .store()
        .dispatch(CommentAction::ReceiveByLease {
            lease_id: LeaseId(2),
            comments: vec![json!({"id": 5, "text": "gone"}), json!({"id": 6})],
        })
        .await;

    let outcome = orchestrator
        .run(CommentIntent::Delete {
            lease_id: LeaseId(2),
            id: CommentId(5),
        })
        .await;
    assert_eq!(outcome, RoutineOutcome::Succeeded(Value::Null));

    let state = orchestrator.store().snapshot().await;
    assert_eq!(get_comments_by_lease(&state, LeaseId(2)), [json!({"id": 6})]);
    assert_eq!(transport.seen()[0].0.method, Method::Delete);
    assert_eq!(transport.seen()[0].0.path, "comment/5/");
    assert_eq!(
        effects.successes.lock().expect("ok").as_slice(),
        ["Comment deleted"]
    );
}

#[test]
fn intent_requests_target_resource_paths() {
    let request = Intent::from(InvoiceIntent::Create {
        lease_id: LeaseId(12),
        invoice: json!({"due_date": "2024-05-01"}),
    })
    .request();
    assert_eq!(request.path, "invoice/");
    assert_eq!(
        request.body,
        Some(json!({"due_date": "2024-05-01", "lease": 12}))
    );

    let request = Intent::from(ContactIntent::Edit {
        id: shared::domain::ContactId(3),
        contact: json!({"name": "Oy Ab"}),
    })
    .request();
    assert_eq!(request.method, Method::Put);
    assert_eq!(request.path, "contact/3/");

    let request = Intent::from(RentBasisIntent::FetchAttributes).request();
    assert_eq!(request.method, Method::Options);
    assert_eq!(request.path, "rent_basis/");

    let request = Intent::from(CommentIntent::Create {
        lease_id: LeaseId(1),
        text: "hello".into(),
        topic: Some(3),
    })
    .request();
    assert_eq!(
        request.body,
        Some(json!({"text": "hello", "lease": 1, "topic": 3}))
    );
}

#[test]
fn every_start_action_has_a_flag_clearing_failure() {
    let intents: Vec<Intent> = vec![
        LeaseIntent::FetchAttributes.into(),
        LeaseIntent::FetchAll(ListQuery::default()).into(),
        LeaseIntent::Create(json!({})).into(),
        ContactIntent::FetchSingle(shared::domain::ContactId(1)).into(),
        InvoiceIntent::FetchByLease(LeaseId(1)).into(),
        RentBasisIntent::FetchAll(ListQuery::default()).into(),
        CommentIntent::Delete {
            lease_id: LeaseId(1),
            id: CommentId(1),
        }
        .into(),
    ];

    for intent in intents {
        let run = RunId(1);
        let started = intent.started(run).expect("start action");
        let state = AppState::default().reduce(started);
        let failed = state.reduce(intent.failed(run, Failure::server(Some(500), "boom")));
        assert_eq!(
            AppState {
                errors: Default::default(),
                ..failed
            },
            AppState::default(),
            "{:?} left a flag set",
            intent.key()
        );
    }
}
