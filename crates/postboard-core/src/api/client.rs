//! API client for the postboard backend.
//!
//! Every request goes through [`ApiClient::send`], which stamps it with the
//! bearer credential held by the [`SessionStore`] and clears the session
//! when the backend rejects that credential.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::SessionStore;
use crate::models::{AuthResponse, Identity, LoginRequest, NewPost, Post, RegisterRequest};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the postboard backend.
/// Clone is cheap - reqwest::Client and SessionStore are both shared handles.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url` (e.g. `http://localhost:3000/api`)
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request against a path under the base URL. Dispatch it with
    /// [`ApiClient::send`] so it passes through the authorization pipeline.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    // ===== Pipeline =====

    /// Attach the current credential, if any.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request through the pipeline.
    ///
    /// A 401 response logs the session out before the error is returned.
    /// Everything else, including transport failures, is returned as is.
    /// Nothing is retried.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorize(request).send().await?;
        self.inspect(response).await
    }

    async fn inspect(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_status(status, &body);

        if error.is_unauthorized() {
            warn!(url = %url, "Credential rejected, clearing session");
            self.session.logout();
        } else {
            debug!(url = %url, status = status.as_u16(), "Request failed");
        }
        Err(error)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let url = response.url().path().to_string();
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", url, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        Self::parse(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::POST, path).json(body)).await?;
        Self::parse(response).await
    }

    // ===== Authentication =====

    /// Exchange credentials for a session and install it in the store.
    pub async fn login(&self, email_or_username: &str, password: &str) -> Result<Identity, ApiError> {
        let auth: AuthResponse = self
            .post(
                "auth/login",
                &LoginRequest {
                    email_or_username,
                    password,
                },
            )
            .await?;

        let identity = auth.user.clone();
        self.session.login(auth.user, auth.access_token);
        Ok(identity)
    }

    /// Create an account, then log in with the new email and password.
    pub async fn register(&self, email: &str, username: &str, password: &str) -> Result<Identity, ApiError> {
        let request = self.request(Method::POST, "auth/register").json(&RegisterRequest {
            email,
            username,
            password,
        });
        self.send(request).await?;
        debug!(username = username, "Account registered");

        self.login(email, password).await
    }

    // ===== Posts =====

    pub async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        self.get("posts").await
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Post, ApiError> {
        self.post("posts", post).await
    }

    pub async fn delete_post(&self, id: i64) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, &format!("posts/{}", id)))
            .await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
