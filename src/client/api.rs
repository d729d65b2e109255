//! HTTP access to the task service.
//!
//! [`TaskApi`] is the seam the controller talks through; [`HttpTaskApi`]
//! implements it with a blocking `ureq` agent. No retries and no explicit
//! timeouts: a request either works or the caller falls back.

use serde::Deserialize;

use crate::models::{NewTask, Task, TaskId, TaskPatch};

/// Why a service call did not produce a usable answer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, broken socket, bad URL
    #[error("request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The body did not have the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The service said its store is down and clients should use their copy.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ApiError::Status { status: 503, .. })
    }
}

/// Store status as reported by the health endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreStatus {
    pub connected: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub store: StoreStatus,
}

/// Operations the client needs from the task service.
pub trait TaskApi {
    fn list(&self) -> Result<Vec<Task>, ApiError>;
    fn create(&self, new_task: &NewTask) -> Result<Task, ApiError>;
    fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, ApiError>;
    fn delete(&self, id: &TaskId) -> Result<(), ApiError>;
    /// Returns the tasks that survived.
    fn clear_completed(&self) -> Result<Vec<Task>, ApiError>;
    fn health(&self) -> Result<HealthReport, ApiError>;
}

/// Error body sent by the service.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Blocking HTTP implementation of [`TaskApi`].
pub struct HttpTaskApi {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpTaskApi {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn todos_url(&self) -> String {
        format!("{}/api/todos", self.base_url)
    }

    fn todo_url(&self, id: &TaskId) -> String {
        format!("{}/api/todos/{}", self.base_url, id)
    }
}

fn map_error(e: ureq::Error) -> ApiError {
    match e {
        ureq::Error::Status(status, response) => {
            let message = response
                .into_json::<ErrorBody>()
                .map(|body| body.error)
                .unwrap_or_else(|_| "no error message".to_string());
            ApiError::Status { status, message }
        }
        ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
    }
}

fn decode<T: serde::de::DeserializeOwned>(response: ureq::Response) -> Result<T, ApiError> {
    response
        .into_json::<T>()
        .map_err(|e| ApiError::Decode(e.to_string()))
}

impl TaskApi for HttpTaskApi {
    fn list(&self) -> Result<Vec<Task>, ApiError> {
        let response = self
            .agent
            .get(&self.todos_url())
            .set("Accept", "application/json")
            .call()
            .map_err(map_error)?;
        decode(response)
    }

    fn create(&self, new_task: &NewTask) -> Result<Task, ApiError> {
        let response = self
            .agent
            .post(&self.todos_url())
            .send_json(new_task)
            .map_err(map_error)?;
        decode(response)
    }

    fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        let response = self
            .agent
            .request("PATCH", &self.todo_url(id))
            .send_json(patch)
            .map_err(map_error)?;
        decode(response)
    }

    fn delete(&self, id: &TaskId) -> Result<(), ApiError> {
        self.agent
            .delete(&self.todo_url(id))
            .call()
            .map_err(map_error)?;
        Ok(())
    }

    fn clear_completed(&self) -> Result<Vec<Task>, ApiError> {
        let response = self
            .agent
            .delete(&format!("{}/clear-completed", self.todos_url()))
            .call()
            .map_err(map_error)?;
        decode(response)
    }

    fn health(&self) -> Result<HealthReport, ApiError> {
        let response = self
            .agent
            .get(&format!("{}/api/health", self.base_url))
            .set("Accept", "application/json")
            .call()
            .map_err(map_error)?;
        decode(response)
    }
}
