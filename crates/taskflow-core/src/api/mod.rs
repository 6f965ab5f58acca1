//! Remote task/auth API contract.
//!
//! [`TaskApi`] is the seam between the state core and the transport;
//! [`HttpApiClient`] is the reqwest implementation used by the front ends.

use std::fmt;
use std::future::Future;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::models::{AuthGrant, Credential, Task, TaskDraft, TaskId, TaskPatch};

mod http;

pub use http::HttpApiClient;

pub const NETWORK_FAILURE_MESSAGE: &str = "Network error. Please check your connection.";
pub const NOT_FOUND_MESSAGE: &str = "Task not found.";
pub const PERMISSION_DENIED_MESSAGE: &str = "Permission denied. You cannot modify this task.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API configuration: {0}")]
    Configuration(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Credential rejected by server")]
    Unauthorized,
    #[error("Permission denied: {0}")]
    Forbidden(String),
    #[error("Not found")]
    NotFound,
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },
    #[error("Malformed response payload: {0}")]
    MalformedPayload(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// The server rejected the credential of an authenticated request.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Human-readable text for a failure notification.
    ///
    /// `fallback` names the operation and is used when the error carries no
    /// better description of its own.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Network(_) => NETWORK_FAILURE_MESSAGE.to_string(),
            Self::NotFound => NOT_FOUND_MESSAGE.to_string(),
            Self::Forbidden(_) => PERMISSION_DENIED_MESSAGE.to_string(),
            Self::Rejected(message) if !message.trim().is_empty() => message.clone(),
            Self::Unauthorized
            | Self::Rejected(_)
            | Self::Server { .. }
            | Self::MalformedPayload(_)
            | Self::Configuration(_) => fallback.to_string(),
        }
    }
}

/// Body of `POST users/register/`.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST users/login/`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Operations the client consumes from the remote API.
pub trait TaskApi: Send + Sync + 'static {
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = ApiResult<AuthGrant>> + Send;

    fn login(&self, request: &LoginRequest) -> impl Future<Output = ApiResult<AuthGrant>> + Send;

    fn list_tasks(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = ApiResult<Vec<Task>>> + Send;

    fn create_task(
        &self,
        credential: &Credential,
        draft: &TaskDraft,
    ) -> impl Future<Output = ApiResult<Task>> + Send;

    /// `PATCH tasks/{id}/` with `{is_completed}`.
    fn set_completion(
        &self,
        credential: &Credential,
        id: TaskId,
        is_completed: bool,
    ) -> impl Future<Output = ApiResult<TaskPatch>> + Send;

    /// `PUT tasks/{id}/` with title and description.
    fn replace_task(
        &self,
        credential: &Credential,
        id: TaskId,
        draft: &TaskDraft,
    ) -> impl Future<Output = ApiResult<TaskPatch>> + Send;

    fn delete_task(
        &self,
        credential: &Credential,
        id: TaskId,
    ) -> impl Future<Output = ApiResult<()>> + Send;
}

/// Map a non-success response to an [`ApiError`].
///
/// On auth endpoints a 401 means the submitted username/password was wrong,
/// not that a session expired, so it is reported as a rejection.
pub fn classify_failure(status: StatusCode, body: &str, auth_endpoint: bool) -> ApiError {
    let message = parse_error_message(body);
    match status {
        StatusCode::UNAUTHORIZED if auth_endpoint => {
            ApiError::Rejected(message.unwrap_or_else(|| "Invalid credentials".to_string()))
        }
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => {
            ApiError::Forbidden(message.unwrap_or_else(|| "Permission denied".to_string()))
        }
        StatusCode::NOT_FOUND => ApiError::NotFound,
        status if status.is_client_error() => ApiError::Rejected(
            message.unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
        ),
        status => ApiError::Server {
            status: status.as_u16(),
            message: message.unwrap_or_else(|| compact_body(body)),
        },
    }
}

/// Raw body for error messages, capped at 180 characters.
fn compact_body(body: &str) -> String {
    body.trim().chars().take(180).collect()
}

/// Extract a readable message from a structured error payload.
///
/// Prefers an `error` or `detail` string; otherwise joins every field's
/// messages with ", " (the shape of a field-validation payload).
pub fn parse_error_message(body: &str) -> Option<String> {
    let payload = serde_json::from_str::<serde_json::Value>(body).ok()?;
    let object = payload.as_object()?;

    for key in ["error", "detail"] {
        if let Some(message) = object.get(key).and_then(serde_json::Value::as_str) {
            let message = message.trim();
            if !message.is_empty() {
                return Some(message.to_string());
            }
        }
    }

    let mut messages = Vec::new();
    for value in object.values() {
        collect_messages(value, &mut messages);
    }
    if messages.is_empty() {
        None
    } else {
        Some(messages.join(", "))
    }
}

fn collect_messages(value: &serde_json::Value, messages: &mut Vec<String>) {
    match value {
        serde_json::Value::String(message) if !message.trim().is_empty() => {
            messages.push(message.trim().to_string());
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_messages(item, messages);
            }
        }
        _ => {}
    }
}
