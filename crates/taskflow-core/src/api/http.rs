//! reqwest implementation of [`TaskApi`].

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{classify_failure, ApiError, ApiResult, LoginRequest, RegisterRequest, TaskApi};
use crate::config::{normalize_base_url, AuthScheme, ClientConfig};
use crate::models::{AuthGrant, Credential, Task, TaskDraft, TaskId, TaskPatch};

const REGISTER_ROUTE: &str = "/users/register/";
const LOGIN_ROUTE: &str = "/users/login/";
const TASKS_ROUTE: &str = "/tasks/";

/// HTTP client for the TaskFlow REST API.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    base_url: String,
    auth_scheme: AuthScheme,
    client: Client,
}

impl HttpApiClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let base_url = normalize_base_url(&config.api_base_url).map_err(ApiError::Configuration)?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| {
                ApiError::Configuration(format!("Failed to construct HTTP client: {error}"))
            })?;
        Ok(Self {
            base_url,
            auth_scheme: config.auth_scheme,
            client,
        })
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    fn task_url(&self, id: TaskId) -> String {
        format!("{}{TASKS_ROUTE}{id}/", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        request
            .header(
                reqwest::header::AUTHORIZATION,
                format!("{} {}", self.auth_scheme.keyword(), credential.expose()),
            )
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(request: RequestBuilder, auth_endpoint: bool) -> ApiResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|error| ApiError::Network(error.to_string()))?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &body, auth_endpoint))
    }

    async fn send_json<T: DeserializeOwned>(
        request: RequestBuilder,
        auth_endpoint: bool,
    ) -> ApiResult<T> {
        let response = Self::send(request, auth_endpoint).await?;
        let body = response
            .text()
            .await
            .map_err(|error| ApiError::Network(error.to_string()))?;
        serde_json::from_str(&body).map_err(|error| ApiError::MalformedPayload(error.to_string()))
    }
}

impl TaskApi for HttpApiClient {
    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthGrant> {
        let builder = self.client.post(self.url(REGISTER_ROUTE)).json(request);
        Self::send_json(builder, true).await
    }

    async fn login(&self, request: &LoginRequest) -> ApiResult<AuthGrant> {
        let builder = self.client.post(self.url(LOGIN_ROUTE)).json(request);
        Self::send_json(builder, true).await
    }

    async fn list_tasks(&self, credential: &Credential) -> ApiResult<Vec<Task>> {
        let builder = self.authorized(self.client.get(self.url(TASKS_ROUTE)), credential);
        Self::send_json(builder, false).await
    }

    async fn create_task(&self, credential: &Credential, draft: &TaskDraft) -> ApiResult<Task> {
        let builder = self.authorized(
            self.client.post(self.url(TASKS_ROUTE)).json(draft),
            credential,
        );
        Self::send_json(builder, false).await
    }

    async fn set_completion(
        &self,
        credential: &Credential,
        id: TaskId,
        is_completed: bool,
    ) -> ApiResult<TaskPatch> {
        let payload = serde_json::json!({ "is_completed": is_completed });
        let builder = self.authorized(
            self.client.patch(self.task_url(id)).json(&payload),
            credential,
        );
        Self::send_json(builder, false).await
    }

    async fn replace_task(
        &self,
        credential: &Credential,
        id: TaskId,
        draft: &TaskDraft,
    ) -> ApiResult<TaskPatch> {
        let builder = self.authorized(self.client.put(self.task_url(id)).json(draft), credential);
        Self::send_json(builder, false).await
    }

    async fn delete_task(&self, credential: &Credential, id: TaskId) -> ApiResult<()> {
        let builder = self.authorized(self.client.delete(self.task_url(id)), credential);
        Self::send(builder, false).await?;
        Ok(())
    }
}
