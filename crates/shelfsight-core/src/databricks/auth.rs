//! Bearer tokens for the Databricks REST API.

use serde::Deserialize;
use thiserror::Error;

use crate::config::{ConnectionCredentials, WarehouseAuth};
use crate::http_client::{HttpAuth, HttpClient, HttpError, HttpRequest};

use super::failure_message;

const TOKEN_PATH: &str = "/oidc/v1/token";
const TOKEN_FORM: &str = "grant_type=client_credentials&scope=all-apis";

/// Failure to obtain a bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token endpoint unreachable: {0}")]
    Transport(#[from] HttpError),
    #[error("token exchange rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("token response malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Resolve a bearer token for one session.
///
/// A personal access token is used directly. Client credentials are exchanged
/// on every call; tokens are not cached across sessions.
pub async fn bearer_token(
    http: &dyn HttpClient,
    credentials: &ConnectionCredentials,
) -> Result<String, AuthError> {
    match &credentials.auth {
        WarehouseAuth::AccessToken(token) => Ok(token.clone()),
        WarehouseAuth::OAuth {
            client_id,
            client_secret,
        } => {
            let request = HttpRequest::post(format!("{}{TOKEN_PATH}", credentials.base_url()))
                .with_header("content-type", "application/x-www-form-urlencoded")
                .with_auth(&HttpAuth::Basic {
                    username: client_id.clone(),
                    password: client_secret.clone(),
                })
                .with_body(TOKEN_FORM);

            let response = http.execute(request).await?;
            if !response.is_success() {
                return Err(AuthError::Rejected {
                    status: response.status,
                    message: failure_message(response.status, &response.body),
                });
            }

            let token = serde_json::from_str::<TokenResponse>(&response.body)
                .map_err(|error| AuthError::Malformed(error.to_string()))?;
            tracing::debug!(client_id = %client_id, "exchanged client credentials for token");
            Ok(token.access_token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpResponse, StubHttpClient};

    fn oauth_credentials() -> ConnectionCredentials {
        ConnectionCredentials {
            hostname: String::from("adb-1.azuredatabricks.net"),
            http_path: String::from("/sql/1.0/warehouses/abc"),
            auth: WarehouseAuth::OAuth {
                client_id: String::from("client"),
                client_secret: String::from("secret"),
            },
        }
    }

    #[tokio::test]
    async fn access_token_is_used_without_network() {
        let http = StubHttpClient::new();
        let credentials = ConnectionCredentials {
            auth: WarehouseAuth::AccessToken(String::from("dapi-1")),
            ..oauth_credentials()
        };

        let token = bearer_token(&http, &credentials).await.expect("token");
        assert_eq!(token, "dapi-1");
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn client_credentials_are_exchanged_at_token_endpoint() {
        let http = StubHttpClient::new().with_response(HttpResponse::ok_json(
            r#"{"access_token":"oauth-1","token_type":"Bearer","expires_in":3600}"#,
        ));

        let token = bearer_token(&http, &oauth_credentials())
            .await
            .expect("token");
        assert_eq!(token, "oauth-1");

        let requests = http.requests();
        assert_eq!(
            requests[0].url,
            "https://adb-1.azuredatabricks.net/oidc/v1/token"
        );
        assert_eq!(requests[0].body_text(), Some(TOKEN_FORM));
        assert!(requests[0]
            .headers
            .get("authorization")
            .is_some_and(|value| value.starts_with("Basic ")));
    }

    #[tokio::test]
    async fn rejected_exchange_reports_remote_message() {
        let http = StubHttpClient::new().with_response(HttpResponse::new(
            401,
            r#"{"error":"invalid_client","error_description":"Client authentication failed"}"#,
        ));

        let error = bearer_token(&http, &oauth_credentials())
            .await
            .expect_err("should fail");
        assert!(error.to_string().contains("Client authentication failed"));
    }
}
