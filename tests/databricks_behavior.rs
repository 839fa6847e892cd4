//! Behaviour tests for the Databricks-backed server.
//!
//! The warehouse and the Files API are replaced by a scripted HTTP client, so
//! these journeys check the requests the server sends and how it reports the
//! answers.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{json, Value};
use shelfsight_core::config::{
    CLIENT_ID_VAR, CLIENT_SECRET_VAR, HOSTNAME_VAR, HTTP_PATH_VAR, TOKEN_VAR,
};
use shelfsight_core::{HttpMethod, HttpResponse, Settings, StubHttpClient};
use shelfsight_tests::{get_json, post_file, post_json, uri};
use shelfsight_web::{build_router, AppState};

const HOST: &str = "adb-7.azuredatabricks.net";

fn settings(pairs: &[(&'static str, &'static str)]) -> Settings {
    let pairs = pairs.to_vec();
    Settings::from_lookup(move |name| {
        pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| (*value).to_string())
    })
    .expect("settings")
}

fn token_settings() -> Settings {
    settings(&[
        (HOSTNAME_VAR, HOST),
        (HTTP_PATH_VAR, "/sql/1.0/warehouses/abc123"),
        (TOKEN_VAR, "dapi-secret"),
    ])
}

fn router(settings: Settings, http: &StubHttpClient) -> axum::Router {
    let state = AppState::from_settings(settings, Arc::new(http.clone())).expect("state");
    build_router(state)
}

fn body_json(http: &StubHttpClient, index: usize) -> Value {
    let requests = http.requests();
    serde_json::from_str(requests[index].body_text().expect("body")).expect("JSON body")
}

#[tokio::test]
async fn when_token_is_configured_then_health_reports_token_mode() {
    let http = StubHttpClient::new();
    let router = router(token_settings(), &http);

    let (status, body) = get_json(&router, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["databricksConfigured"], json!(true));
    assert_eq!(body["configStatus"], json!("ok"));
    assert_eq!(body["missingVariables"], json!([]));
    assert_eq!(body["authMode"], json!("token"));
    assert!(http.requests().is_empty(), "health never calls the warehouse");
}

#[tokio::test]
async fn when_user_runs_sql_then_statement_goes_to_the_configured_warehouse() {
    // Given: a warehouse that answers immediately
    let http = StubHttpClient::new().with_response(HttpResponse::ok_json(
        r#"{"statement_id":"st-9","status":{"state":"SUCCEEDED"},
            "manifest":{"schema":{"columns":[
              {"name":"retailer","type_name":"STRING","position":0},
              {"name":"clicks","type_name":"LONG","position":1}]}},
            "result":{"data_array":[["Acme","12"]]}}"#,
    ));
    let router = router(token_settings(), &http);

    // When: the user submits SQL
    let (status, body) = post_json(
        &router,
        "/api/query",
        &json!({"query": "SELECT retailer, clicks FROM fact"}),
    )
    .await;

    // Then: typed rows come back
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rows"], json!([{"retailer": "Acme", "clicks": 12}]));

    // And: the statement was posted with the bearer token and warehouse id
    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(
        requests[0].url,
        format!("https://{HOST}/api/2.0/sql/statements")
    );
    assert_eq!(
        requests[0].headers.get("authorization").map(String::as_str),
        Some("Bearer dapi-secret")
    );
    let submitted = body_json(&http, 0);
    assert_eq!(submitted["warehouse_id"], json!("abc123"));
    assert_eq!(submitted["statement"], json!("SELECT retailer, clicks FROM fact"));
}

#[tokio::test]
async fn when_oauth_is_configured_then_a_token_is_fetched_before_the_statement() {
    let http = StubHttpClient::new()
        .with_response(HttpResponse::ok_json(
            r#"{"access_token":"oauth-token","token_type":"Bearer","expires_in":3600}"#,
        ))
        .with_response(HttpResponse::ok_json(
            r#"{"statement_id":"st-1","status":{"state":"SUCCEEDED"},
                "manifest":{"schema":{"columns":[{"name":"n","type_name":"INT","position":0}]}},
                "result":{"data_array":[["1"]]}}"#,
        ));
    let router = router(
        settings(&[
            (HOSTNAME_VAR, HOST),
            (HTTP_PATH_VAR, "/sql/1.0/warehouses/abc123"),
            (CLIENT_ID_VAR, "svc-principal"),
            (CLIENT_SECRET_VAR, "shh"),
        ]),
        &http,
    );

    let (status, body) = post_json(&router, "/api/query", &json!({"query": "SELECT 1 AS n"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rows"], json!([{"n": 1}]));
    let requests = http.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, format!("https://{HOST}/oidc/v1/token"));
    assert_eq!(
        requests[0].body_text(),
        Some("grant_type=client_credentials&scope=all-apis")
    );
    assert_eq!(
        requests[1].headers.get("authorization").map(String::as_str),
        Some("Bearer oauth-token")
    );
}

#[tokio::test]
async fn when_dashboard_filters_are_applied_then_values_travel_as_named_parameters() {
    let http = StubHttpClient::new().with_response(HttpResponse::ok_json(
        r#"{"statement_id":"st-2","status":{"state":"SUCCEEDED"},
            "manifest":{"schema":{"columns":[{"name":"id","type_name":"STRING","position":0}]}},
            "result":{"data_array":[["O'Brien"]]}}"#,
    ));
    let router = router(token_settings(), &http);

    let (status, body) = get_json(
        &router,
        &uri("/api/dashboard/filters/retailers", &[("campaigns", "303")]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([{"id": "O'Brien", "name": "O'Brien"}]));
    let submitted = body_json(&http, 0);
    let statement = submitted["statement"].as_str().expect("statement");
    assert!(statement.contains(":p0"), "{statement}");
    assert!(!statement.contains("303"), "values are never inlined: {statement}");
    assert_eq!(submitted["parameters"][0]["value"], json!("303"));
}

#[tokio::test]
async fn when_warehouse_reports_failure_then_user_sees_its_message() {
    let http = StubHttpClient::new().with_response(HttpResponse::ok_json(
        r#"{"statement_id":"st-3","status":{"state":"FAILED",
            "error":{"error_code":"BAD_REQUEST","message":"[TABLE_OR_VIEW_NOT_FOUND] fact"}}}"#,
    ));
    let router = router(token_settings(), &http);

    let (status, body) = post_json(&router, "/api/query", &json!({"query": "SELECT * FROM fact"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("TABLE_OR_VIEW_NOT_FOUND"));
    assert_eq!(body["details"], json!("BAD_REQUEST"));
}

#[tokio::test]
async fn when_credentials_are_missing_then_query_fails_without_network_calls() {
    let http = StubHttpClient::new();
    let router = router(settings(&[(HOSTNAME_VAR, HOST)]), &http);

    let (status, body) = post_json(&router, "/api/query", &json!({"query": "SELECT 1"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("DATABRICKS_HTTP_PATH"));
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn when_user_uploads_csv_then_it_is_put_into_the_volume() {
    let http = StubHttpClient::new();
    let router = router(token_settings(), &http);

    let (status, body) = post_file(
        &router,
        "/api/upload",
        "week 2.csv",
        b"retailer,clicks\nAcme,1\n",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["path"],
        json!("/Volumes/main/default/uploads/week 2.csv")
    );
    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Put);
    assert_eq!(
        requests[0].url,
        format!("https://{HOST}/api/2.0/fs/files/Volumes/main/default/uploads/week%202.csv?overwrite=true")
    );
    assert_eq!(
        requests[0].body.as_deref(),
        Some(b"retailer,clicks\nAcme,1\n".as_slice())
    );
}

#[tokio::test]
async fn when_volume_rejects_upload_then_remote_message_is_surfaced() {
    let http = StubHttpClient::new().with_response(HttpResponse::new(
        403,
        r#"{"error_code":"PERMISSION_DENIED","message":"no write access to volume"}"#,
    ));
    let router = router(token_settings(), &http);

    let (status, body) =
        post_file(&router, "/api/upload", "weekly.csv", b"retailer\nAcme\n").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("upload failed: no write access to volume"));
}
