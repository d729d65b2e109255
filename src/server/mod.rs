//! Web server exposing the task service over HTTP.
//!
//! | Method & Path                       | Success                    |
//! |-------------------------------------|----------------------------|
//! | `GET /api/todos`                    | 200, array of tasks        |
//! | `POST /api/todos`                   | 201, created task          |
//! | `PATCH /api/todos/:id`              | 200, updated task          |
//! | `DELETE /api/todos/:id`             | 200, confirmation          |
//! | `DELETE /api/todos/clear-completed` | 200, surviving tasks       |
//! | `GET /health`, `GET /api/health`    | 200, status summary        |
//! | `GET /api/init-db` (development)    | 200, confirmation          |
//!
//! Failures carry `{"error": "..."}`. A store outage answers 503 with
//! `"fallback": true` so clients know to use their local copy.

use axum::{
    Json, Router,
    extract::{Path as AxumPath, State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, patch},
};
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::{Environment, ServerSettings};
use crate::models::{NewTask, Task, TaskPatch};
use crate::service::{ServiceError, StoreHealth, TaskService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Task operations over the (possibly unavailable) store
    pub service: TaskService,
    /// Deployment mode, reported by the health endpoint
    pub environment: Environment,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = match self {
            ServiceError::Unavailable => serde_json::json!({
                "error": self.to_string(),
                "fallback": true
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Malformed bodies are input errors like any other.
fn rejection(e: JsonRejection) -> ServiceError {
    ServiceError::Validation(format!("Invalid request body: {}", e.body_text()))
}

/// Build the router for the given settings.
pub fn router(state: AppState, settings: &ServerSettings) -> Router {
    let mut app = Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/clear-completed", delete(clear_completed))
        .route("/api/todos/:id", patch(update_todo).delete(delete_todo))
        .route("/health", get(health))
        .route("/api/health", get(health));

    if !settings.environment().is_production() {
        app = app.route("/api/init-db", get(init_db));
    }

    if let Some(ref dir) = settings.static_dir {
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).fallback(index));
    }

    app.layer(cors_layer(settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS: an allow-list in production, any origin during development.
fn cors_layer(settings: &ServerSettings) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true);

    if settings.environment().is_production() {
        let origins: Vec<HeaderValue> = settings
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    } else {
        layer.allow_origin(AllowOrigin::mirror_request())
    }
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// Opens the store (a failure leaves the service in unavailable mode) and
/// starts the background probe when one is configured.
pub async fn serve(
    listener: TcpListener,
    settings: &ServerSettings,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let service = TaskService::connect(&settings.database.value);
    let startup = service.check_connection().await;
    tracing::info!(
        environment = %settings.environment(),
        database = %settings.database.value.display(),
        store_connected = startup.connected,
        "tasklist server ready"
    );

    let monitor = settings
        .health_interval
        .map(|every| service.spawn_health_monitor(every));

    let state = AppState {
        service,
        environment: settings.environment(),
    };
    let result = axum::serve(listener, router(state, settings))
        .with_graceful_shutdown(shutdown)
        .await;

    if let Some(monitor) = monitor {
        monitor.abort();
    }
    result
}

/// Start the server on the configured host and port; stops on Ctrl+C.
pub async fn start_server(settings: ServerSettings) -> Result<(), Box<dyn std::error::Error>> {
    let host_addr: std::net::IpAddr = settings
        .host
        .value
        .parse()
        .map_err(|e| format!("Invalid host address '{}': {}", settings.host.value, e))?;
    let addr = SocketAddr::from((host_addr, settings.port.value));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening on http://{}", addr);

    serve(listener, &settings, shutdown_signal()).await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Get all tasks
async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ServiceError> {
    Ok(Json(state.service.list().await?))
}

/// Create a task
async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ServiceError> {
    let Json(new_task) = payload.map_err(rejection)?;
    let task = state.service.create(new_task).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Partially update a task
async fn update_todo(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Task>, ServiceError> {
    let Json(patch) = payload.map_err(rejection)?;
    Ok(Json(state.service.update(&id, patch).await?))
}

/// Response body for a successful delete
#[derive(Serialize)]
struct DeleteResponse {
    message: String,
    task: Task,
}

/// Delete one task
async fn delete_todo(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<DeleteResponse>, ServiceError> {
    let task = state.service.delete(&id).await?;
    Ok(Json(DeleteResponse {
        message: "Task deleted".to_string(),
        task,
    }))
}

/// Delete completed tasks, answering with the ones that remain
async fn clear_completed(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ServiceError> {
    Ok(Json(state.service.clear_completed().await?))
}

/// Health summary returned by `/health`
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: StoreHealth,
    environment: &'static str,
    version: &'static str,
    commit: &'static str,
    built: &'static str,
    timestamp: chrono::DateTime<Utc>,
}

/// Report server and store status. Always 200.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.service.check_connection().await;
    Json(HealthResponse {
        status: if store.connected { "ok" } else { "degraded" },
        store,
        environment: state.environment.as_str(),
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("TASKLIST_GIT_COMMIT"),
        built: env!("TASKLIST_BUILD_TIMESTAMP"),
        timestamp: Utc::now(),
    })
}

/// Create the task table if needed (development only)
async fn init_db(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ServiceError> {
    state.service.ensure_schema().await?;
    Ok(Json(serde_json::json!({
        "message": "Task table created or verified"
    })))
}
