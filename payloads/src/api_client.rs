use crate::{
    ApiResponse, RecordId, requests,
    responses::{LoginResponse, RegisterResponse},
};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::{Arc, PoisonError, RwLock};

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// Bearer token shared between the client and whoever owns the session.
///
/// Cloning yields a handle to the same slot, so a login performed through one
/// handle is visible to every client built with it.
#[derive(Clone, Default)]
pub struct SharedToken(Arc<RwLock<Option<SecretString>>>);

impl SharedToken {
    pub fn set(&self, token: SecretString) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn clear(&self) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_set(&self) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        let guard = self.0.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }
}

impl std::fmt::Debug for SharedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedToken")
            .field(&if self.is_set() { "[set]" } else { "[unset]" })
            .finish()
    }
}

/// An API client for interfacing with the CMS backend.
#[derive(Clone, Debug)]
pub struct APIClient {
    pub address: String,
    pub inner_client: reqwest::Client,
    pub token: SharedToken,
}

/// Helper methods for http actions
impl APIClient {
    pub fn new(
        address: impl Into<String>,
        inner_client: reqwest::Client,
    ) -> Self {
        Self {
            address: address.into(),
            inner_client,
            token: SharedToken::default(),
        }
    }

    fn format_url(&self, path: &str) -> String {
        format!("{}/api/{path}", &self.address)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .inner_client
            .request(method, self.format_url(path))
            .header(reqwest::header::ACCEPT, "application/json");
        self.token.apply(request)
    }

    async fn send(&self, request: RequestBuilder) -> ReqwestResult {
        request.send().await
    }

    async fn empty_get(&self, path: &str) -> ReqwestResult {
        self.send(self.request(Method::GET, path)).await
    }

    async fn query_get(
        &self,
        path: &str,
        query: &impl Serialize,
    ) -> ReqwestResult {
        self.send(self.request(Method::GET, path).query(query)).await
    }

    async fn with_body(
        &self,
        method: Method,
        path: &str,
        body: &impl Serialize,
    ) -> ReqwestResult {
        self.send(self.request(method, path).json(body)).await
    }

    async fn empty(&self, method: Method, path: &str) -> ReqwestResult {
        self.send(self.request(method, path)).await
    }
}

/// Generic REST verbs against `/api/{path}`. Every body is wrapped in an
/// [`ApiResponse`] envelope; callers decide what a missing `data` means.
impl APIClient {
    /// `GET` with optional query parameters. A missing `data` is an empty
    /// list.
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &impl Serialize,
    ) -> Result<Vec<T>, ClientError> {
        tracing::debug!(path, "GET list");
        let response = self.query_get(path, query).await?;
        let envelope: ApiResponse<Vec<T>> = ok_body(response).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ClientError> {
        tracing::debug!(path, "GET");
        let response = self.empty_get(path).await?;
        let envelope: ApiResponse<T> = ok_body(response).await?;
        Ok(envelope.data)
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<Option<T>, ClientError> {
        tracing::debug!(path, "POST");
        let response = self.with_body(Method::POST, path, body).await?;
        let envelope: ApiResponse<T> = ok_body(response).await?;
        Ok(envelope.data)
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<Option<T>, ClientError> {
        tracing::debug!(path, "PUT");
        let response = self.with_body(Method::PUT, path, body).await?;
        let envelope: ApiResponse<T> = ok_body(response).await?;
        Ok(envelope.data)
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<Option<T>, ClientError> {
        tracing::debug!(path, "PATCH");
        let response = self.with_body(Method::PATCH, path, body).await?;
        let envelope: ApiResponse<T> = ok_body(response).await?;
        Ok(envelope.data)
    }

    /// `PATCH` without a body, for state toggles.
    pub async fn empty_patch(&self, path: &str) -> Result<(), ClientError> {
        tracing::debug!(path, "PATCH");
        let response = self.empty(Method::PATCH, path).await?;
        ok_empty(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        tracing::debug!(path, "DELETE");
        let response = self.empty(Method::DELETE, path).await?;
        ok_empty(response).await
    }

    /// `DELETE` for endpoints that answer with the modified record.
    pub async fn delete_returning<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ClientError> {
        tracing::debug!(path, "DELETE");
        let response = self.empty(Method::DELETE, path).await?;
        let envelope: ApiResponse<T> = ok_body(response).await?;
        Ok(envelope.data)
    }
}

/// Methods on the auth endpoints
impl APIClient {
    pub async fn login(
        &self,
        details: &requests::LoginRequest,
    ) -> Result<LoginResponse, ClientError> {
        let response =
            self.with_body(Method::POST, "auth/login", details).await?;
        ok_body(response).await
    }

    pub async fn register(
        &self,
        details: &requests::RegisterRequest,
    ) -> Result<RegisterResponse, ClientError> {
        let response =
            self.with_body(Method::POST, "auth/register", details).await?;
        ok_body(response).await
    }
}

/// Path of a single record below a collection, e.g. `cms/events/7`.
pub fn record_path(collection: &str, id: RecordId) -> String {
    format!("{collection}/{id}")
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A non-success status, with the `message` of the error body when the
    /// backend sent one.
    #[error("{}", .1.as_deref().unwrap_or("Request failed"))]
    APIError(StatusCode, Option<String>),
    #[error("The request took too long")]
    Timeout(#[source] reqwest::Error),
    #[error("Network error. Please check your connection.")]
    Network(#[source] reqwest::Error),
    #[error("Unexpected response from the server")]
    Decode(#[source] reqwest::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e)
        } else if e.is_decode() {
            Self::Decode(e)
        } else {
            Self::Network(e)
        }
    }
}

/// Deserialize a successful request into the desired type, or return an
/// appropriate error.
pub async fn ok_body<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is OK, returning a ClientError if not.
pub async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    Ok(())
}

/// Build an [`ClientError::APIError`], pulling `message` out of the error
/// envelope when the body is one.
async fn api_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let message = match response.text().await {
        Ok(text) => error_message(&text),
        Err(e) => return e.into(),
    };
    ClientError::APIError(status, message)
}

fn error_message(body: &str) -> Option<String> {
    let envelope: ApiResponse<serde_json::Value> =
        serde_json::from_str(body).ok()?;
    envelope
        .message
        .or(envelope.error)
        .filter(|message| !message.trim().is_empty())
}
