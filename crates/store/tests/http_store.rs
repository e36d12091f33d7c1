use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use confidant_core::config::{CrmBackend, CrmConfig};
use confidant_core::domain::{ContactFieldTypeId, ContactId, ConversationId, NewMessage, TagId};
use confidant_core::errors::StoreError;
use confidant_core::store::CrmStore;
use confidant_store::HttpCrmStore;
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<Value>>>,
}

impl Recorded {
    fn push(&self, entry: Value) {
        self.requests.lock().expect("recorder lock").push(entry);
    }

    fn all(&self) -> Vec<Value> {
        self.requests.lock().expect("recorder lock").clone()
    }
}

async fn search(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    recorded.push(json!({
        "authorization": headers.get("authorization").and_then(|value| value.to_str().ok()),
        "query": params.get("query"),
        "limit": params.get("limit"),
    }));
    Json(json!({
        "data": [
            { "id": 7, "first_name": "Jane", "last_name": "Doe", "hash_id": "h:abc" }
        ],
        "meta": { "total": 1 }
    }))
}

async fn remove_contact(Path(id): Path<i64>, State(recorded): State<Recorded>) -> StatusCode {
    recorded.push(json!({ "deleted": id }));
    StatusCode::NO_CONTENT
}

async fn create_note() -> impl IntoResponse {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": { "message": "The body field is required.", "error_code": 32 } })),
    )
}

async fn genders() -> &'static str {
    "<html>maintenance</html>"
}

async fn slow_tags() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({ "data": [] }))
}

async fn add_message(
    Path(id): Path<i64>,
    State(recorded): State<Recorded>,
    Json(body): Json<Value>,
) -> Json<Value> {
    recorded.push(json!({ "conversation": id, "body": body }));
    Json(json!({
        "data": {
            "id": id,
            "contact": { "id": body["contact_id"] },
            "contact_field_type_id": 1,
            "messages": [
                { "id": 1, "content": body["content"], "written_by_me": body["written_by_me"] }
            ]
        }
    }))
}

async fn unset_tag(
    Path(id): Path<i64>,
    State(recorded): State<Recorded>,
    Json(body): Json<Value>,
) -> Json<Value> {
    recorded.push(json!({ "contact": id, "body": body }));
    Json(json!({ "data": { "id": id, "first_name": "Jane" } }))
}

async fn spawn_stub(recorded: Recorded) -> String {
    let router = Router::new()
        .route("/api/contacts", get(search))
        .route("/api/contacts/{id}", delete(remove_contact))
        .route("/api/contacts/{id}/unsetTag", post(unset_tag))
        .route("/api/notes", post(create_note))
        .route("/api/genders", get(genders))
        .route("/api/tags", get(slow_tags))
        .route("/api/conversations/{id}/messages", post(add_message))
        .with_state(recorded);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let address = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{address}/api/")
}

fn store(base_url: String, timeout_secs: u64) -> HttpCrmStore {
    HttpCrmStore::new(&CrmConfig {
        backend: CrmBackend::Http,
        base_url,
        api_token: "stub-token".to_string().into(),
        timeout_secs,
        search_limit: 5,
    })
    .expect("http store")
}

#[tokio::test]
async fn search_sends_bearer_token_and_unwraps_data() {
    let recorded = Recorded::default();
    let store = store(spawn_stub(recorded.clone()).await, 5);

    let contacts = store.search_contacts("Jane").await.expect("search");

    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].id, ContactId(7));
    assert_eq!(contacts[0].full_name(), "Jane Doe");
    assert_eq!(contacts[0].extra.get("hash_id"), Some(&json!("h:abc")));
    assert_eq!(
        recorded.all(),
        vec![json!({ "authorization": "Bearer stub-token", "query": "Jane", "limit": "5" })]
    );
}

#[tokio::test]
async fn no_content_is_an_empty_success() {
    let recorded = Recorded::default();
    let store = store(spawn_stub(recorded.clone()).await, 5);

    store.delete_contact(ContactId(42)).await.expect("delete");

    assert_eq!(recorded.all(), vec![json!({ "deleted": 42 })]);
}

#[tokio::test]
async fn rejected_request_carries_the_store_message() {
    let store = store(spawn_stub(Recorded::default()).await, 5);

    let error = store
        .create_note(confidant_core::domain::NewNote {
            contact_id: ContactId(7),
            body: String::new(),
            is_favorited: false,
        })
        .await
        .expect_err("validation failure");

    assert_eq!(
        error,
        StoreError::Status { status: 422, message: "The body field is required.".to_string() }
    );
}

#[tokio::test]
async fn undecodable_body_is_malformed() {
    let store = store(spawn_stub(Recorded::default()).await, 5);

    let error = store.list_genders().await.expect_err("html is not json");

    assert!(matches!(error, StoreError::MalformedBody(_)), "{error:?}");
}

#[tokio::test]
async fn slow_response_times_out() {
    let store = store(spawn_stub(Recorded::default()).await, 1);

    let error = store.list_tags().await.expect_err("timeout");

    assert!(matches!(error, StoreError::Timeout(_)), "{error:?}");
}

#[tokio::test]
async fn message_is_posted_under_its_conversation() {
    let recorded = Recorded::default();
    let store = store(spawn_stub(recorded.clone()).await, 5);

    let conversation = store
        .add_message(
            ConversationId(12),
            NewMessage {
                contact_id: ContactId(7),
                written_at: "2024-05-01".to_string(),
                written_by_me: true,
                content: "See you Friday".to_string(),
            },
        )
        .await
        .expect("message");

    assert_eq!(conversation.contact.id, ContactId(7));
    assert_eq!(conversation.contact_field_type_id, Some(ContactFieldTypeId(1)));
    assert!(conversation.messages[0].written_by_me);
    assert_eq!(recorded.all()[0]["conversation"], 12);
    assert_eq!(recorded.all()[0]["body"]["written_at"], "2024-05-01");
}

#[tokio::test]
async fn unset_tag_sends_tag_ids() {
    let recorded = Recorded::default();
    let store = store(spawn_stub(recorded.clone()).await, 5);

    store.unset_tags(ContactId(7), &[TagId(3), TagId(9)]).await.expect("unset");

    assert_eq!(recorded.all(), vec![json!({ "contact": 7, "body": { "tags": [3, 9] } })]);
}
