use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use wom_leaders_client::WomClient;
use wom_leaders_core::error::AppError;
use wom_leaders_core::metric::{self, Metric};
use wom_leaders_core::models::PlayerRankEntry;
use wom_leaders_core::traits::LeaderboardClient;

use crate::integration::common::spawn_server;

const GROUP_ID: i64 = 4242;
const VERIFICATION_CODE: &str = "123-456-789";

#[derive(Debug, Clone)]
struct RecordedCall {
    method: &'static str,
    path: String,
    body: Value,
    api_key: Option<String>,
    user_agent: Option<String>,
}

/// Stand-in for the WOM group endpoints. Group names are unique, as on WOM.
struct FakeWom {
    create_status: StatusCode,
    update_status: StatusCode,
    update_message: &'static str,
    failing_deletes: Mutex<u32>,
    groups: Mutex<HashMap<i64, String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeWom {
    fn new() -> Self {
        Self {
            create_status: StatusCode::CREATED,
            update_status: StatusCode::OK,
            update_message: "2 outdated (updated > 24h ago) players are being updated.",
            failing_deletes: Mutex::new(0),
            groups: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn create_fails_with(mut self, status: StatusCode) -> Self {
        self.create_status = status;
        self
    }

    fn fail_deletes(self, count: u32) -> Self {
        *self.failing_deletes.lock().unwrap() = count;
        self
    }

    fn update_answers(mut self, status: StatusCode, message: &'static str) -> Self {
        self.update_status = status;
        self.update_message = message;
        self
    }

    fn record(&self, method: &'static str, path: String, headers: &HeaderMap, body: Value) {
        let value = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path,
            body,
            api_key: value("x-api-key"),
            user_agent: value(header::USER_AGENT.as_str()),
        });
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn created_names(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|c| c.method == "POST" && c.path == "/groups")
            .filter_map(|c| c.body["name"].as_str().map(str::to_string))
            .collect()
    }
}

async fn create_group(
    State(wom): State<Arc<FakeWom>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    wom.record("POST", "/groups".to_string(), &headers, body.clone());

    if wom.create_status != StatusCode::CREATED {
        return (wom.create_status, Json(json!({ "message": "Invalid API key." }))).into_response();
    }

    let name = body["name"].as_str().unwrap_or_default().to_string();
    let id = {
        let mut groups = wom.groups.lock().unwrap();
        if groups.values().any(|existing| *existing == name) {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Group name is already taken." })),
            )
                .into_response();
        }
        let id = groups.keys().max().map_or(GROUP_ID, |last| last + 1);
        groups.insert(id, name.clone());
        id
    };

    let members = body["members"].as_array().map(Vec::len).unwrap_or(0);
    (
        StatusCode::CREATED,
        Json(json!({
            "group": { "id": id, "name": name, "memberCount": members },
            "verificationCode": VERIFICATION_CODE,
        })),
    )
        .into_response()
}

async fn update_all(
    State(wom): State<Arc<FakeWom>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    wom.record("POST", format!("/groups/{id}/update-all"), &headers, body);
    (wom.update_status, Json(json!({ "message": wom.update_message }))).into_response()
}

async fn delete_group(
    State(wom): State<Arc<FakeWom>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    wom.record("DELETE", format!("/groups/{id}"), &headers, body);

    {
        let mut failing = wom.failing_deletes.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Failed to delete group." })),
            )
                .into_response();
        }
    }
    wom.groups.lock().unwrap().remove(&id);

    Json(json!({ "message": format!("Successfully deleted group: {id}") })).into_response()
}

async fn client_for(wom: Arc<FakeWom>) -> WomClient {
    let router = Router::new()
        .route("/groups", post(create_group))
        .route("/groups/{id}/update-all", post(update_all))
        .route("/groups/{id}", delete(delete_group))
        .with_state(wom);
    let base_url = spawn_server(router).await;

    WomClient::with_base_url(&base_url)
        .unwrap()
        .with_step_delay(Duration::ZERO)
}

fn zulrah() -> Metric {
    metric::find("Zulrah", false).unwrap()
}

fn leaders() -> Vec<PlayerRankEntry> {
    vec![
        PlayerRankEntry::new("Alice", 1, 500),
        PlayerRankEntry::new("Bob", 2, 400),
    ]
}

#[tokio::test]
async fn submission_creates_updates_and_deletes_group() -> anyhow::Result<()> {
    let wom = Arc::new(FakeWom::new());
    let client = client_for(wom.clone()).await.with_api_key("secret");

    let receipt = client
        .submit_leaders("League Leaders", zulrah(), &leaders())
        .await?;

    assert_eq!(receipt.members, 2);
    assert!(receipt.message.contains("being updated"));

    let calls = wom.calls();
    let steps: Vec<(&str, &str)> = calls
        .iter()
        .map(|c| (c.method, c.path.as_str()))
        .collect();
    assert_eq!(
        steps,
        vec![
            ("POST", "/groups"),
            ("POST", "/groups/4242/update-all"),
            ("DELETE", "/groups/4242"),
        ]
    );

    let name = calls[0].body["name"].as_str().unwrap();
    assert!(name.starts_with("League Leaders "), "unexpected name {name}");
    assert_eq!(
        calls[0].body["members"],
        json!([{ "username": "Alice" }, { "username": "Bob" }])
    );
    assert_eq!(calls[1].body, json!({ "verificationCode": VERIFICATION_CODE }));
    assert_eq!(calls[2].body, json!({ "verificationCode": VERIFICATION_CODE }));

    for call in &calls {
        assert_eq!(call.api_key.as_deref(), Some("secret"));
        assert_eq!(call.user_agent.as_deref(), Some("WOM Leagues Scraper"));
    }
    Ok(())
}

#[tokio::test]
async fn api_key_header_is_omitted_without_key() {
    let wom = Arc::new(FakeWom::new());
    let client = client_for(wom.clone()).await;

    client
        .submit_leaders("League Leaders", zulrah(), &leaders())
        .await
        .unwrap();

    assert!(wom.calls().iter().all(|c| c.api_key.is_none()));
}

#[tokio::test]
async fn no_outdated_members_counts_as_success() {
    let wom = Arc::new(FakeWom::new().update_answers(
        StatusCode::BAD_REQUEST,
        "Nothing to update: there are no outdated members in this group.",
    ));
    let client = client_for(wom.clone()).await;

    let receipt = client
        .submit_leaders("League Leaders", zulrah(), &leaders())
        .await
        .unwrap();

    assert!(receipt.message.contains("no outdated members"));
    assert_eq!(wom.calls().len(), 3);
}

#[tokio::test]
async fn failed_update_still_deletes_group() {
    let wom = Arc::new(FakeWom::new().update_answers(StatusCode::INTERNAL_SERVER_ERROR, "boom"));
    let client = client_for(wom.clone()).await;

    let err = client
        .submit_leaders("League Leaders", zulrah(), &leaders())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::LeaderboardError { status_code: 500, ref message } if message == "boom"
    ));
    let calls = wom.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].method, "DELETE");
}

#[tokio::test]
async fn rejected_api_key_is_unauthorized() {
    let wom = Arc::new(FakeWom::new().create_fails_with(StatusCode::FORBIDDEN));
    let client = client_for(wom.clone()).await.with_api_key("wrong");

    let err = client
        .submit_leaders("League Leaders", zulrah(), &leaders())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthorized(msg) if msg == "Invalid API key."));
    assert!(!AppError::Unauthorized(String::new()).is_retryable());
    assert_eq!(wom.calls().len(), 1);
}

#[tokio::test]
async fn rate_limited_creation_is_retryable() {
    let wom = Arc::new(FakeWom::new().create_fails_with(StatusCode::TOO_MANY_REQUESTS));
    let client = client_for(wom).await;

    let err = client
        .submit_leaders("League Leaders", zulrah(), &leaders())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::RateLimitExceeded));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn orphaned_group_does_not_block_later_submissions() {
    let wom = Arc::new(FakeWom::new().fail_deletes(1));
    let client = client_for(wom.clone()).await;

    let err = client
        .submit_leaders("League Leaders", zulrah(), &leaders())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::LeaderboardError { status_code: 500, .. }));
    assert_eq!(wom.groups.lock().unwrap().len(), 1, "first group is left behind");

    let receipt = client
        .submit_leaders("League Leaders", zulrah(), &leaders())
        .await
        .unwrap();
    assert_eq!(receipt.members, 2);

    let names = wom.created_names();
    assert_eq!(names.len(), 2);
    assert_ne!(names[0], names[1]);
    for name in &names {
        assert!(name.starts_with("League Leaders "));
        assert!(name.chars().count() <= 30);
    }
}
