// 🌐 API Server - REST endpoints over the report engine
//
// Every report route needs the `x-authenticated-user` header set by the fronting
// proxy; its value becomes `generatedBy` on the report.

use crate::aggregation::{ReportEngine, ReportFilters, ReportRequest};
use crate::directory::filter_options;
use crate::error::InputError;
use crate::month::MonthRange;
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const AUTH_HEADER: &str = "x-authenticated-user";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        AppState {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, Response> {
        self.db.lock().map_err(|_| {
            error!("database mutex poisoned");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
        })
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

/// Input problems are the caller's fault (400); anything else is logged and hidden (500).
fn report_failure(err: anyhow::Error) -> Response {
    if let Some(input) = err.downcast_ref::<InputError>() {
        return failure(StatusCode::BAD_REQUEST, input.to_string());
    }
    error!("report generation failed: {:#}", err);
    failure(StatusCode::INTERNAL_SERVER_ERROR, "failed to generate report")
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

/// Caller identity, taken from the `x-authenticated-user` header
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(AUTH_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match user {
            Some(user) => Ok(AuthenticatedUser(user.to_string())),
            None => {
                warn!(path = %parts.uri.path(), "rejected unauthenticated request");
                Err(failure(StatusCode::UNAUTHORIZED, "authentication required"))
            }
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/filter-options
async fn get_filter_options(State(state): State<AppState>, _user: AuthenticatedUser) -> Response {
    let conn = match state.conn() {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match filter_options(&conn) {
        Ok(options) => (StatusCode::OK, Json(ApiResponse::ok(options))).into_response(),
        Err(e) => {
            error!("Error loading filter options: {:#}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "failed to load filter options")
        }
    }
}

/// POST /api/reports/field-service
async fn field_service_report(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<ReportRequest>,
) -> Response {
    let filters = match ReportFilters::try_from(request) {
        Ok(filters) => filters,
        Err(e) => return failure(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let conn = match state.conn() {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match ReportEngine::new(&conn).generate_field_service_report(&filters, &user) {
        Ok(report) => (StatusCode::OK, Json(ApiResponse::ok(report))).into_response(),
        Err(e) => report_failure(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PioneerRequest {
    start_month: String,
    end_month: String,
}

/// POST /api/reports/pioneers
async fn pioneer_summary_report(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<PioneerRequest>,
) -> Response {
    let range = match MonthRange::parse(&request.start_month, &request.end_month) {
        Ok(range) => range,
        Err(e) => return failure(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let conn = match state.conn() {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match ReportEngine::new(&conn).generate_pioneer_summary_report(&range, &user) {
        Ok(report) => (StatusCode::OK, Json(ApiResponse::ok(report))).into_response(),
        Err(e) => report_failure(e),
    }
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/filter-options", get(get_filter_options))
        .route("/reports/field-service", post(field_service_report))
        .route("/reports/pioneers", post(pioneer_summary_report))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `addr` and serve until the process stops
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
