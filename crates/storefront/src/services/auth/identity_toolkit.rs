//! Firebase Identity Toolkit REST client.
//!
//! Email/password sign-in and sign-up go through
//! `accounts:signInWithPassword` and `accounts:signUp`. The returned id token
//! is stored in the shared [`SessionToken`] so the document store client sends
//! it with every request.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Response;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use url::Url;

use zona_gamer_core::UserUid;

use super::{AuthError, AuthProvider};
use crate::config::FirebaseConfig;
use crate::models::{AuthSession, CurrentUser, SessionToken};

/// Client for the Identity Toolkit REST API.
#[derive(Clone)]
pub struct IdentityToolkitClient {
    inner: Arc<IdentityToolkitClientInner>,
}

struct IdentityToolkitClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    token: SessionToken,
}

impl std::fmt::Debug for IdentityToolkitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityToolkitClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl IdentityToolkitClient {
    #[must_use]
    pub fn new(config: &FirebaseConfig, token: SessionToken) -> Self {
        Self {
            inner: Arc::new(IdentityToolkitClientInner {
                client: reqwest::Client::new(),
                base_url: config.identity_toolkit_base_url.clone(),
                api_key: config.api_key.clone(),
                token,
            }),
        }
    }

    fn endpoint(&self, method: &str) -> Result<Url, AuthError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AuthError::Provider(format!(
                    "base url {} cannot hold a path",
                    self.inner.base_url
                ))
            })?
            .pop_if_empty()
            .push(&format!("accounts:{method}"));
        url.query_pairs_mut()
            .append_pair("key", self.inner.api_key.expose_secret());
        Ok(url)
    }

    async fn password_call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let response = self
            .inner
            .client
            .post(self.endpoint(method)?)
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let body: PasswordResponse = check(response).await?.json().await?;
        let id_token = SecretString::from(body.id_token);
        self.inner.token.set(id_token.clone());

        Ok(AuthSession {
            user: CurrentUser {
                uid: UserUid::new(body.local_id),
                email: body.email,
                display_name: body.display_name.filter(|n| !n.is_empty()),
            },
            id_token,
        })
    }
}

#[async_trait]
impl AuthProvider for IdentityToolkitClient {
    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.password_call("signInWithPassword", email, password)
            .await
    }

    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.password_call("signUp", email, password).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.inner.token.clear();
        Ok(())
    }
}

/// Map an Identity Toolkit error response onto `AuthError`.
async fn check(response: Response) -> Result<Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let code = serde_json::from_str::<ErrorEnvelope>(&body).map_or_else(
        |_| body.chars().take(200).collect::<String>(),
        |envelope| envelope.error.message,
    );

    let err = map_error_code(&code);
    if matches!(err, AuthError::Provider(_)) {
        error!(status = %status, error = %err, "Identity Toolkit returned non-success status");
    } else {
        debug!(status = %status, error = %err, "Identity Toolkit rejected the request");
    }
    Err(err)
}

/// Error codes look like `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should
/// be at least 6 characters`.
fn map_error_code(code: &str) -> AuthError {
    let (name, detail) = code
        .split_once(" : ")
        .map_or((code.trim(), ""), |(name, detail)| (name.trim(), detail.trim()));

    match name {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AuthError::InvalidCredentials
        }
        "EMAIL_EXISTS" => AuthError::EmailAlreadyExists,
        "WEAK_PASSWORD" => AuthError::WeakPassword(if detail.is_empty() {
            "La contraseña es demasiado débil".to_string()
        } else {
            detail.to_string()
        }),
        _ => AuthError::Provider(code.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> FirebaseConfig {
        FirebaseConfig {
            project_id: "zona-gamer".into(),
            api_key: SecretString::from("AIzaSyTestKey123"),
            database: "(default)".into(),
            firestore_base_url: Url::parse("https://firestore.googleapis.com/v1/").unwrap(),
            identity_toolkit_base_url: Url::parse("https://identitytoolkit.googleapis.com/v1/")
                .unwrap(),
        }
    }

    #[test]
    fn test_endpoint_carries_key() {
        let client = IdentityToolkitClient::new(&config(), SessionToken::new());
        let url = client.endpoint("signInWithPassword").unwrap();
        assert_eq!(
            url.as_str(),
            "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword?key=AIzaSyTestKey123"
        );
    }

    #[test]
    fn test_error_codes() {
        assert!(matches!(
            map_error_code("INVALID_LOGIN_CREDENTIALS"),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            map_error_code("EMAIL_EXISTS"),
            AuthError::EmailAlreadyExists
        ));
        let AuthError::WeakPassword(detail) =
            map_error_code("WEAK_PASSWORD : Password should be at least 6 characters")
        else {
            panic!("expected weak password");
        };
        assert_eq!(detail, "Password should be at least 6 characters");
        assert!(matches!(
            map_error_code("TOO_MANY_ATTEMPTS_TRY_LATER"),
            AuthError::Provider(_)
        ));
    }

    #[tokio::test]
    async fn test_sign_out_clears_shared_token() {
        let token = SessionToken::new();
        token.set(SecretString::from("id-token"));
        let client = IdentityToolkitClient::new(&config(), token.clone());

        client.sign_out().await.unwrap();

        assert!(token.get().is_none());
    }
}
