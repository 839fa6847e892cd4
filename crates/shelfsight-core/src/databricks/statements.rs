//! Databricks SQL statement execution API.
//!
//! One call to [`DatabricksExecutor::execute`] is one session: resolve
//! credentials, obtain a token, submit the statement, poll until it reaches a
//! terminal state, then page through result chunks. A [`StatementHandle`]
//! guard cancels the remote statement if the call is abandoned before the
//! statement finishes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Number, Value};
use shelfsight_warehouse::{
    number_from_f64, ParamStyle, QueryExecutor, QueryResult, Statement, WarehouseError,
};

use crate::config::{ConnectionCredentials, Settings};
use crate::error::ConfigurationError;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse};

use super::{bearer_token, failure_message};

const STATEMENTS_PATH: &str = "/api/2.0/sql/statements";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Executes statements on a Databricks SQL warehouse over REST.
#[derive(Clone)]
pub struct DatabricksExecutor {
    credentials: Result<ConnectionCredentials, ConfigurationError>,
    http: Arc<dyn HttpClient>,
    poll_interval: Duration,
}

impl DatabricksExecutor {
    pub fn new(settings: &Settings, http: Arc<dyn HttpClient>) -> Self {
        Self {
            credentials: settings.credentials(),
            http,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn credentials(&self) -> Result<&ConnectionCredentials, WarehouseError> {
        self.credentials.as_ref().map_err(|error| match error {
            ConfigurationError::Missing { missing } => WarehouseError::NotConfigured {
                missing: missing.clone(),
            },
            other => WarehouseError::Connection(other.to_string()),
        })
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, WarehouseError> {
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|error| WarehouseError::Connection(error.to_string()))?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(WarehouseError::Statement {
                message: failure_message(response.status, &response.body),
                details: Some(response.body),
            })
        }
    }
}

#[async_trait]
impl QueryExecutor for DatabricksExecutor {
    fn param_style(&self) -> ParamStyle {
        ParamStyle::Named
    }

    async fn execute(&self, statement: &Statement) -> Result<QueryResult, WarehouseError> {
        let credentials = self.credentials()?;
        let warehouse_id = credentials
            .warehouse_id()
            .map_err(|error| WarehouseError::Connection(error.to_string()))?;
        let base_url = credentials.base_url();
        let token = bearer_token(self.http.as_ref(), credentials)
            .await
            .map_err(|error| WarehouseError::Connection(error.to_string()))?;
        let auth = HttpAuth::BearerToken(token);
        let started = Instant::now();

        let body = json!({
            "statement": statement.sql(),
            "warehouse_id": warehouse_id,
            "parameters": statement.params(),
            "disposition": "INLINE",
            "format": "JSON_ARRAY",
            "wait_timeout": "30s",
            "on_wait_timeout": "CONTINUE",
        });
        let response = self
            .send(
                HttpRequest::post(format!("{base_url}{STATEMENTS_PATH}"))
                    .with_auth(&auth)
                    .with_json(&body),
            )
            .await?;
        let mut state = parse::<StatementResponse>(&response.body)?;

        let mut handle = StatementHandle::new(
            Arc::clone(&self.http),
            format!("{base_url}{STATEMENTS_PATH}/{}", state.statement_id),
            auth.clone(),
        );
        tracing::debug!(
            statement_id = %state.statement_id,
            state = %state.status.state,
            params = statement.params().len(),
            "statement submitted"
        );

        while state.status.is_running() {
            tokio::time::sleep(self.poll_interval).await;
            let response = self
                .send(HttpRequest::get(handle.url()).with_auth(&auth))
                .await?;
            state = parse::<StatementResponse>(&response.body)?;
        }
        handle.finish();

        if state.status.state != "SUCCEEDED" {
            let message = state
                .status
                .error
                .as_ref()
                .and_then(|error| error.message.clone())
                .unwrap_or_else(|| format!("statement ended in state {}", state.status.state));
            let details = state
                .status
                .error
                .as_ref()
                .and_then(|error| error.error_code.clone());
            return Err(WarehouseError::Statement { message, details });
        }

        let columns = state
            .manifest
            .as_ref()
            .map(|manifest| manifest.schema.columns.clone())
            .unwrap_or_default();
        let mut arrays = Vec::new();
        let mut next = None;
        if let Some(chunk) = state.result {
            arrays.extend(chunk.data_array);
            next = chunk.next_chunk_internal_link;
        }
        while let Some(link) = next {
            let response = self
                .send(HttpRequest::get(format!("{base_url}{link}")).with_auth(&auth))
                .await?;
            let chunk = parse::<ResultChunk>(&response.body)?;
            arrays.extend(chunk.data_array);
            next = chunk.next_chunk_internal_link;
        }

        let names = columns.iter().map(|column| column.name.clone()).collect();
        let arrays = arrays
            .into_iter()
            .map(|cells| {
                cells
                    .into_iter()
                    .enumerate()
                    .map(|(index, cell)| {
                        let type_name = columns
                            .get(index)
                            .map(|column| column.type_name.as_str())
                            .unwrap_or("STRING");
                        convert_cell(type_name, cell)
                    })
                    .collect()
            })
            .collect();

        let result = QueryResult::from_arrays(names, arrays);
        tracing::debug!(
            statement_id = %state.statement_id,
            rows = result.row_count,
            elapsed = ?started.elapsed(),
            "statement finished"
        );
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "databricks"
    }
}

/// Cancels the remote statement on drop unless it reached a terminal state.
struct StatementHandle {
    http: Arc<dyn HttpClient>,
    url: String,
    auth: HttpAuth,
    finished: bool,
}

impl StatementHandle {
    fn new(http: Arc<dyn HttpClient>, url: String, auth: HttpAuth) -> Self {
        Self {
            http,
            url,
            auth,
            finished: false,
        }
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for StatementHandle {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(url = %self.url, "no runtime to cancel abandoned statement");
            return;
        };
        let http = Arc::clone(&self.http);
        let request = HttpRequest::post(format!("{}/cancel", self.url)).with_auth(&self.auth);
        runtime.spawn(async move {
            match http.execute(request).await {
                Ok(response) if response.is_success() => {
                    tracing::debug!("abandoned statement cancelled");
                }
                Ok(response) => {
                    tracing::warn!(status = response.status, "statement cancel rejected");
                }
                Err(error) => tracing::warn!(error = %error, "statement cancel failed"),
            }
        });
    }
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    statement_id: String,
    status: StatementStatus,
    #[serde(default)]
    manifest: Option<Manifest>,
    #[serde(default)]
    result: Option<ResultChunk>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<ServiceError>,
}

impl StatementStatus {
    fn is_running(&self) -> bool {
        matches!(self.state.as_str(), "PENDING" | "RUNNING")
    }
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    schema: Schema,
}

#[derive(Debug, Default, Deserialize)]
struct Schema {
    #[serde(default)]
    columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, Deserialize)]
struct ColumnInfo {
    name: String,
    #[serde(default)]
    type_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResultChunk {
    #[serde(default)]
    data_array: Vec<Vec<Option<String>>>,
    #[serde(default)]
    next_chunk_internal_link: Option<String>,
}

fn parse<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, WarehouseError> {
    serde_json::from_str(body).map_err(|error| WarehouseError::Statement {
        message: format!("unexpected statement response: {error}"),
        details: None,
    })
}

/// Convert a `JSON_ARRAY` cell (always text) to a typed JSON value.
fn convert_cell(type_name: &str, cell: Option<String>) -> Value {
    let Some(text) = cell else {
        return Value::Null;
    };
    match type_name {
        "BYTE" | "SHORT" | "INT" | "LONG" => text
            .parse::<i64>()
            .map(|value| Value::Number(Number::from(value)))
            .unwrap_or(Value::String(text)),
        "FLOAT" | "DOUBLE" | "DECIMAL" => text
            .parse::<f64>()
            .map(number_from_f64)
            .unwrap_or(Value::String(text)),
        "BOOLEAN" => match text.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(text),
        },
        _ => Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HOSTNAME_VAR, HTTP_PATH_VAR, TOKEN_VAR};
    use crate::http_client::{HttpError, HttpMethod, StubHttpClient};
    use shelfsight_warehouse::{ParamType, StatementBuilder};

    fn configured_settings() -> Settings {
        Settings::from_lookup(|name| match name {
            HOSTNAME_VAR => Some(String::from("adb-1.azuredatabricks.net")),
            HTTP_PATH_VAR => Some(String::from("/sql/1.0/warehouses/wh42")),
            TOKEN_VAR => Some(String::from("dapi-1")),
            _ => None,
        })
        .expect("settings")
    }

    fn executor(http: &StubHttpClient) -> DatabricksExecutor {
        DatabricksExecutor::new(&configured_settings(), Arc::new(http.clone()))
            .with_poll_interval(Duration::ZERO)
    }

    const MANIFEST: &str = r#""manifest":{"schema":{"columns":[
        {"name":"retailer","type_name":"STRING","position":0},
        {"name":"clicks","type_name":"LONG","position":1},
        {"name":"spend","type_name":"DOUBLE","position":2}]}}"#;

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let http = StubHttpClient::new();
        let settings = Settings::from_lookup(|_| None).expect("settings");
        let executor = DatabricksExecutor::new(&settings, Arc::new(http.clone()));

        let error = executor
            .execute(&Statement::raw("SELECT 1"))
            .await
            .expect_err("should fail");

        assert!(matches!(error, WarehouseError::NotConfigured { .. }));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn submits_named_parameters_and_converts_cells() {
        let http = StubHttpClient::new().with_response(HttpResponse::ok_json(format!(
            r#"{{"statement_id":"st-1","status":{{"state":"SUCCEEDED"}},{MANIFEST},
               "result":{{"data_array":[["Acme","12","3.5"],["O'Brien",null,"1"]]}}}}"#
        )));
        let executor = executor(&http);

        let mut builder = StatementBuilder::new(executor.param_style());
        builder.push("SELECT retailer, clicks, spend FROM fact WHERE retailer = ");
        builder.push_bind("O'Brien", ParamType::String);
        let result = executor.execute(&builder.build()).await.expect("result");

        assert_eq!(result.columns, vec!["retailer", "clicks", "spend"]);
        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows[0]["clicks"], json!(12));
        assert_eq!(result.rows[0]["spend"], json!(3.5));
        assert_eq!(result.rows[1]["clicks"], Value::Null);

        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            "https://adb-1.azuredatabricks.net/api/2.0/sql/statements"
        );
        let body: Value =
            serde_json::from_str(requests[0].body_text().expect("body")).expect("json body");
        assert_eq!(body["warehouse_id"], json!("wh42"));
        assert_eq!(
            body["statement"],
            json!("SELECT retailer, clicks, spend FROM fact WHERE retailer = :p0")
        );
        assert_eq!(
            body["parameters"],
            json!([{"name": "p0", "value": "O'Brien", "type": "STRING"}])
        );
    }

    #[tokio::test]
    async fn polls_running_statements_and_follows_chunks() {
        let http = StubHttpClient::new()
            .with_response(HttpResponse::ok_json(
                r#"{"statement_id":"st-2","status":{"state":"PENDING"}}"#,
            ))
            .with_response(HttpResponse::ok_json(format!(
                r#"{{"statement_id":"st-2","status":{{"state":"SUCCEEDED"}},{MANIFEST},
                   "result":{{"data_array":[["A","1","1.0"]],
                   "next_chunk_internal_link":"/api/2.0/sql/statements/st-2/result/chunks/1"}}}}"#
            )))
            .with_response(HttpResponse::ok_json(
                r#"{"data_array":[["B","2","2.0"]]}"#,
            ));
        let executor = executor(&http);

        let result = executor
            .execute(&Statement::raw("SELECT retailer, clicks, spend FROM fact"))
            .await
            .expect("result");

        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows[1]["retailer"], json!("B"));
        let requests = http.requests();
        assert_eq!(requests[1].method, HttpMethod::Get);
        assert!(requests[1].url.ends_with("/api/2.0/sql/statements/st-2"));
        assert!(requests[2].url.ends_with("/result/chunks/1"));
    }

    #[tokio::test]
    async fn failed_statement_carries_remote_message() {
        let http = StubHttpClient::new().with_response(HttpResponse::ok_json(
            r#"{"statement_id":"st-3","status":{"state":"FAILED",
                "error":{"error_code":"BAD_REQUEST","message":"[TABLE_OR_VIEW_NOT_FOUND] nope"}}}"#,
        ));

        let error = executor(&http)
            .execute(&Statement::raw("SELECT * FROM nope"))
            .await
            .expect_err("should fail");

        match error {
            WarehouseError::Statement { message, details } => {
                assert!(message.contains("TABLE_OR_VIEW_NOT_FOUND"));
                assert_eq!(details.as_deref(), Some("BAD_REQUEST"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(http.requests().len(), 1, "terminal statements are not cancelled");
    }

    #[tokio::test]
    async fn abandoned_statement_is_cancelled() {
        let http = StubHttpClient::new()
            .with_response(HttpResponse::ok_json(
                r#"{"statement_id":"st-4","status":{"state":"RUNNING"}}"#,
            ))
            .with_error(HttpError::new("connection reset"));

        let error = executor(&http)
            .execute(&Statement::raw("SELECT 1"))
            .await
            .expect_err("poll should fail");
        assert!(matches!(error, WarehouseError::Connection(_)));

        for _ in 0..10 {
            if http.requests().len() >= 3 {
                break;
            }
            tokio::task::yield_now().await;
        }
        let requests = http.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[2].url.ends_with("/api/2.0/sql/statements/st-4/cancel"));
        assert_eq!(requests[2].method, HttpMethod::Post);
    }

    #[test]
    fn cells_convert_by_declared_type() {
        assert_eq!(convert_cell("INT", Some(String::from("7"))), json!(7));
        assert_eq!(convert_cell("DECIMAL", Some(String::from("1.25"))), json!(1.25));
        assert_eq!(convert_cell("BOOLEAN", Some(String::from("true"))), json!(true));
        assert_eq!(
            convert_cell("DATE", Some(String::from("2024-01-05"))),
            json!("2024-01-05")
        );
        assert_eq!(convert_cell("LONG", None), Value::Null);
    }
}
