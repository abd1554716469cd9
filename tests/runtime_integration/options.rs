use serde_json::{Value, json};
use slack_options_gateway::storage::SqliteStore;

use super::support::{
    REFRESHED_ACCESS_TOKEN, UpstreamBehavior, VERIFICATION_TOKEN, callback, members_payload,
    post_options, projects_payload, seed_linked_team, seed_team, seed_token, seed_user,
    spawn_server_for, spawn_server_with, spawn_upstream, spawn_upstream_with,
};

fn two_projects() -> Value {
    projects_payload(&[("p1", "Alpha"), ("p2", "Beta")], None)
}

#[tokio::test]
async fn projects_callback_returns_all_options_for_empty_search() {
    let mut upstream = spawn_upstream(two_projects(), members_payload(&[])).await;
    let server = spawn_server_for(&upstream).await;
    seed_linked_team(&server.store, "TEAM1", "access-1").await;

    let response = post_options(&server, &callback("projects", "TEAM1", "")).await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let payload: Value = response.json().await.expect("response should be json");
    assert_eq!(
        payload,
        json!({"options": [
            {"text": "Alpha", "value": "p1"},
            {"text": "Beta", "value": "p2"}
        ]})
    );

    let call = upstream
        .graphql_calls
        .recv()
        .await
        .expect("graphql call should be recorded");
    assert_eq!(call.authorization.as_deref(), Some("Bearer access-1"));
    assert!(call.query.contains("projects"));

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn projects_callback_filters_by_search_value() {
    let upstream = spawn_upstream(two_projects(), members_payload(&[])).await;
    let server = spawn_server_for(&upstream).await;
    seed_linked_team(&server.store, "TEAM1", "access-1").await;

    let response = post_options(&server, &callback("projects", "TEAM1", "alp")).await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let payload: Value = response.json().await.expect("response should be json");
    assert_eq!(payload, json!({"options": [{"text": "Alpha", "value": "p1"}]}));

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn projects_shared_with_company_appear_once() {
    let projects = projects_payload(
        &[("p1", "Alpha")],
        Some(&[("p1", "Alpha"), ("p3", "Gamma")][..]),
    );
    let upstream = spawn_upstream(projects, members_payload(&[])).await;
    let server = spawn_server_for(&upstream).await;
    seed_linked_team(&server.store, "TEAM1", "access-1").await;

    let response = post_options(&server, &callback("projects", "TEAM1", "")).await;
    let payload: Value = response.json().await.expect("response should be json");
    let values: Vec<&str> = payload["options"]
        .as_array()
        .expect("options should be an array")
        .iter()
        .filter_map(|option| option["value"].as_str())
        .collect();
    assert_eq!(values, vec!["p1", "p3"]);

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn company_members_are_filtered_by_username() {
    let members = members_payload(&[
        ("maxime", "max@example.com"),
        ("jules", "jules@example.com"),
        ("Maxine", "maxine@example.com"),
    ]);
    let upstream = spawn_upstream(two_projects(), members).await;
    let server = spawn_server_for(&upstream).await;
    seed_linked_team(&server.store, "TEAM1", "access-1").await;

    let response = post_options(&server, &callback("company-members", "TEAM1", "MAX")).await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let payload: Value = response.json().await.expect("response should be json");
    assert_eq!(
        payload,
        json!({"options": [
            {"text": "maxime", "value": "max@example.com"},
            {"text": "Maxine", "value": "maxine@example.com"}
        ]})
    );

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn form_encoded_payload_is_accepted() {
    let upstream = spawn_upstream(two_projects(), members_payload(&[])).await;
    let server = spawn_server_for(&upstream).await;
    seed_linked_team(&server.store, "TEAM1", "access-1").await;

    let payload = callback("projects", "TEAM1", "bet").to_string();
    let response = reqwest::Client::new()
        .post(server.options_url())
        .form(&[("payload", payload.as_str())])
        .send()
        .await
        .expect("options request should return");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let payload: Value = response.json().await.expect("response should be json");
    assert_eq!(payload, json!({"options": [{"text": "Beta", "value": "p2"}]}));

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn unknown_team_returns_structured_error() {
    let upstream = spawn_upstream(two_projects(), members_payload(&[])).await;
    let server = spawn_server_for(&upstream).await;

    let response = post_options(&server, &callback("projects", "MISSING", "")).await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let payload: Value = response.json().await.expect("response should be json");
    assert_eq!(payload["ok"], false);
    assert_eq!(payload["error"]["code"], "teamNotFound");

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn team_without_owner_returns_user_not_found() {
    let upstream = spawn_upstream(two_projects(), members_payload(&[])).await;
    let server = spawn_server_for(&upstream).await;
    seed_team(&server.store, "TEAM1", "ghost").await;

    let response = post_options(&server, &callback("company-members", "TEAM1", "")).await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let payload: Value = response.json().await.expect("response should be json");
    assert_eq!(payload["error"]["code"], "userNotFound");

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn owner_without_token_returns_no_upstream_token() {
    let upstream = spawn_upstream(two_projects(), members_payload(&[])).await;
    let server = spawn_server_for(&upstream).await;
    seed_user(&server.store, "owner-1").await;
    seed_team(&server.store, "TEAM1", "owner-1").await;

    let response = post_options(&server, &callback("projects", "TEAM1", "")).await;
    let payload: Value = response.json().await.expect("response should be json");
    assert_eq!(payload["error"]["code"], "noUpstreamToken");

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn expired_token_without_refresh_token_returns_no_upstream_token() {
    let upstream = spawn_upstream(two_projects(), members_payload(&[])).await;
    let server = spawn_server_for(&upstream).await;
    seed_user(&server.store, "owner-1").await;
    seed_team(&server.store, "TEAM1", "owner-1").await;
    seed_token(&server.store, "owner-1", "stale", None, Some(1)).await;

    let response = post_options(&server, &callback("projects", "TEAM1", "")).await;
    let payload: Value = response.json().await.expect("response should be json");
    assert_eq!(payload["error"]["code"], "noUpstreamToken");

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let mut upstream = spawn_upstream(two_projects(), members_payload(&[])).await;
    let server = spawn_server_for(&upstream).await;
    seed_user(&server.store, "owner-1").await;
    seed_team(&server.store, "TEAM1", "owner-1").await;
    seed_token(&server.store, "owner-1", "stale", Some("refresh-1"), Some(1)).await;

    let response = post_options(&server, &callback("projects", "TEAM1", "")).await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let payload: Value = response.json().await.expect("response should be json");
    assert_eq!(payload["options"].as_array().map(Vec::len), Some(2));

    let form = upstream
        .refresh_calls
        .recv()
        .await
        .expect("refresh call should be recorded");
    assert_eq!(form.get("grant_type").map(String::as_str), Some("refresh_token"));
    assert_eq!(form.get("refresh_token").map(String::as_str), Some("refresh-1"));
    assert_eq!(form.get("client_id").map(String::as_str), Some("client-id"));

    let call = upstream
        .graphql_calls
        .recv()
        .await
        .expect("graphql call should be recorded");
    let expected = format!("Bearer {REFRESHED_ACCESS_TOKEN}");
    assert_eq!(call.authorization.as_deref(), Some(expected.as_str()));

    assert_persisted_refresh(&server.store).await;

    server.stop().await;
    upstream.stop().await;
}

async fn assert_persisted_refresh(store: &SqliteStore) {
    let token = store
        .get_upstream_token("owner-1")
        .await
        .expect("token lookup should succeed")
        .expect("token should exist");
    assert_eq!(token.access_token, REFRESHED_ACCESS_TOKEN);
    assert_eq!(token.refresh_token.as_deref(), Some("rotated-refresh-token"));
    assert!(token.expires_at_ms.is_some_and(|expires_at| expires_at > 1));
}

async fn assert_stale_token_kept(store: &SqliteStore) {
    let token = store
        .get_upstream_token("owner-1")
        .await
        .expect("token lookup should succeed")
        .expect("token should exist");
    assert_eq!(token.access_token, "stale");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(token.expires_at_ms, Some(1));
}

async fn assert_no_upstream_token(response: reqwest::Response) {
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let payload: Value = response.json().await.expect("response should be json");
    assert_eq!(payload["ok"], false);
    assert_eq!(payload["error"]["code"], "noUpstreamToken");
}

#[tokio::test]
async fn rejected_refresh_returns_no_upstream_token() {
    let mut behavior = UpstreamBehavior::new(two_projects(), members_payload(&[]));
    behavior.token_status = reqwest::StatusCode::INTERNAL_SERVER_ERROR;
    let mut upstream = spawn_upstream_with(behavior).await;
    let server = spawn_server_for(&upstream).await;
    seed_user(&server.store, "owner-1").await;
    seed_team(&server.store, "TEAM1", "owner-1").await;
    seed_token(&server.store, "owner-1", "stale", Some("refresh-1"), Some(1)).await;

    let response = post_options(&server, &callback("projects", "TEAM1", "")).await;
    assert_no_upstream_token(response).await;

    upstream
        .refresh_calls
        .recv()
        .await
        .expect("refresh call should be recorded");
    assert!(upstream.graphql_calls.try_recv().is_err());
    assert_stale_token_kept(&server.store).await;

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn expired_token_without_oauth_client_returns_no_upstream_token() {
    let mut upstream = spawn_upstream(two_projects(), members_payload(&[])).await;
    let upstream_addr = upstream.addr;
    let server = spawn_server_with(move |config| {
        config.upstream_graphql_url = format!("http://{upstream_addr}/graphql");
        config.upstream_token_url = format!("http://{upstream_addr}/oauth/token");
        config.upstream_credentials = None;
    })
    .await;
    seed_user(&server.store, "owner-1").await;
    seed_team(&server.store, "TEAM1", "owner-1").await;
    seed_token(&server.store, "owner-1", "stale", Some("refresh-1"), Some(1)).await;

    let response = post_options(&server, &callback("projects", "TEAM1", "")).await;
    assert_no_upstream_token(response).await;

    assert!(upstream.refresh_calls.try_recv().is_err());
    assert!(upstream.graphql_calls.try_recv().is_err());
    assert_stale_token_kept(&server.store).await;

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn concurrent_requests_share_one_refresh() {
    let mut upstream = spawn_upstream(two_projects(), members_payload(&[])).await;
    let server = spawn_server_for(&upstream).await;
    seed_user(&server.store, "owner-1").await;
    seed_team(&server.store, "TEAM1", "owner-1").await;
    seed_token(&server.store, "owner-1", "stale", Some("refresh-1"), Some(1)).await;

    let payload = callback("projects", "TEAM1", "");
    let (first, second) = tokio::join!(
        post_options(&server, &payload),
        post_options(&server, &payload)
    );
    for response in [first, second] {
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.expect("response should be json");
        assert_eq!(body["options"].as_array().map(Vec::len), Some(2));
    }

    let form = upstream
        .refresh_calls
        .try_recv()
        .expect("one refresh call should be recorded");
    assert_eq!(form.get("refresh_token").map(String::as_str), Some("refresh-1"));
    assert!(upstream.refresh_calls.try_recv().is_err());

    for _ in 0..2 {
        let call = upstream
            .graphql_calls
            .try_recv()
            .expect("graphql call should be recorded");
        let expected = format!("Bearer {REFRESHED_ACCESS_TOKEN}");
        assert_eq!(call.authorization.as_deref(), Some(expected.as_str()));
    }
    assert_persisted_refresh(&server.store).await;

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn token_mismatch_is_bad_request_for_any_name() {
    let upstream = spawn_upstream(two_projects(), members_payload(&[])).await;
    let server = spawn_server_for(&upstream).await;
    seed_linked_team(&server.store, "TEAM1", "access-1").await;

    for name in ["projects", "company-members", "nope"] {
        let mut payload = callback(name, "TEAM1", "");
        payload["token"] = json!(format!("{VERIFICATION_TOKEN}-forged"));

        let response = post_options(&server, &payload).await;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.expect("response should be json");
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    }

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn unknown_callback_name_is_bad_request() {
    let upstream = spawn_upstream(two_projects(), members_payload(&[])).await;
    let server = spawn_server_for(&upstream).await;
    seed_linked_team(&server.store, "TEAM1", "access-1").await;

    let response = post_options(&server, &callback("channels", "TEAM1", "")).await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn missing_search_fields_are_bad_requests() {
    let upstream = spawn_upstream(two_projects(), members_payload(&[])).await;
    let server = spawn_server_for(&upstream).await;

    let response = post_options(
        &server,
        &json!({"token": VERIFICATION_TOKEN, "name": "projects", "value": ""}),
    )
    .await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let response = post_options(
        &server,
        &json!({"token": VERIFICATION_TOKEN, "name": "projects", "team": {"id": "TEAM1"}}),
    )
    .await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let response = reqwest::Client::new()
        .post(server.options_url())
        .body("{not json")
        .send()
        .await
        .expect("options request should return");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn malformed_upstream_response_is_bad_request() {
    let upstream = spawn_upstream(json!({"data": {"user": null}}), json!({"data": {}})).await;
    let server = spawn_server_for(&upstream).await;
    seed_linked_team(&server.store, "TEAM1", "access-1").await;

    let response = post_options(&server, &callback("projects", "TEAM1", "")).await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let response = post_options(&server, &callback("company-members", "TEAM1", "")).await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn graphql_errors_without_data_are_bad_requests() {
    let errors = json!({"errors": [{"message": "boom"}]});
    let upstream = spawn_upstream(errors.clone(), errors).await;
    let server = spawn_server_for(&upstream).await;
    seed_linked_team(&server.store, "TEAM1", "access-1").await;

    for name in ["projects", "company-members"] {
        let response = post_options(&server, &callback(name, "TEAM1", "")).await;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.expect("response should be json");
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
        let message = body["error"]["message"].as_str().unwrap_or_default();
        assert!(!message.contains("boom"), "message leaked upstream errors: {message}");
    }

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn upstream_failure_status_is_bad_request_without_body_detail() {
    let detail = json!({"secret": "internal detail"});
    let mut behavior = UpstreamBehavior::new(detail.clone(), detail);
    behavior.graphql_status = reqwest::StatusCode::BAD_GATEWAY;
    let upstream = spawn_upstream_with(behavior).await;
    let server = spawn_server_for(&upstream).await;
    seed_linked_team(&server.store, "TEAM1", "access-1").await;

    let response = post_options(&server, &callback("projects", "TEAM1", "")).await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("response should be json");
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    let message = body["error"]["message"].as_str().unwrap_or_default();
    assert!(message.contains("502"), "unexpected message: {message}");
    assert!(!message.contains("internal detail"));
    assert!(!message.contains("secret"));

    server.stop().await;
    upstream.stop().await;
}
