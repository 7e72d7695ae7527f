use std::{
    fmt::Display,
    net::{IpAddr, SocketAddr},
    str::FromStr,
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Query, State,
        rejection::{BytesRejection, QueryRejection},
    },
    http::{self, HeaderName, HeaderValue, Method},
    response::IntoResponse,
    routing::{delete, get, post},
};
use platform_api::{ApiError, ApiResult};
use products_hr::{Employee, EmployeeDraft, EmployeeId, EmployeeStore, HrError, PageRequest};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, instrument};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<EmployeeStore>,
    pub config: Arc<AppConfig>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "employee api listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    info!("employee api stopped");
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler).fallback(method_not_allowed))
        .route(
            "/createemployee",
            post(create_employee_handler).fallback(method_not_allowed),
        )
        .route(
            "/getEmployeeById",
            get(get_employee_handler).fallback(method_not_allowed),
        )
        .route(
            "/deleteEmployee",
            delete(delete_employee_handler).fallback(method_not_allowed),
        )
        .route(
            "/updateemployee",
            post(update_employee_handler).fallback(method_not_allowed),
        )
        .route(
            "/listEmployee",
            get(list_employees_handler).fallback(method_not_allowed),
        )
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct IdQuery {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<String>,
    limit: Option<String>,
}

/// Update payload: the target id plus the fields to overwrite.
#[derive(Debug, Deserialize)]
struct UpdateEmployeeRequest {
    id: EmployeeId,
    #[serde(flatten)]
    draft: EmployeeDraft,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    employees: usize,
    version: &'static str,
}

#[instrument(name = "http.create_employee", skip_all)]
async fn create_employee_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<Employee>> {
    let draft: EmployeeDraft = decode_json(body)?;
    let employee = state.store.create(draft);
    info!(id = employee.id, "employee created");
    Ok(Json(employee))
}

#[instrument(name = "http.get_employee", skip_all)]
async fn get_employee_handler(
    State(state): State<AppState>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> ApiResult<Json<Employee>> {
    let Query(query) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let id: EmployeeId = required_param("id", query.id.as_deref())?;
    let employee = state.store.get(id).map_err(store_error)?;
    Ok(Json(employee))
}

#[instrument(name = "http.delete_employee", skip_all)]
async fn delete_employee_handler(
    State(state): State<AppState>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Query(query) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let id: EmployeeId = required_param("id", query.id.as_deref())?;
    let removed = state.store.delete(id).map_err(store_error)?;
    info!(id = removed.id, "employee deleted");
    Ok(Json(MessageResponse {
        message: "employee deleted successfully",
    }))
}

#[instrument(name = "http.update_employee", skip_all)]
async fn update_employee_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<Employee>> {
    let request: UpdateEmployeeRequest = decode_json(body)?;
    let employee = state
        .store
        .update(request.id, request.draft)
        .map_err(store_error)?;
    info!(id = employee.id, "employee updated");
    Ok(Json(employee))
}

#[instrument(name = "http.list_employees", skip_all)]
async fn list_employees_handler(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Employee>>> {
    let Query(query) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let page: usize = required_param("page", query.page.as_deref())?;
    let limit: usize = required_param("limit", query.limit.as_deref())?;
    let request = PageRequest::new(page, limit).map_err(store_error)?;
    Ok(Json(state.store.list(request)))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        employees: state.store.len(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("route not found")
}

/// Bodies are JSON whatever the declared content type.
fn decode_json<T: DeserializeOwned>(body: Result<Bytes, BytesRejection>) -> ApiResult<T> {
    let bytes = body.map_err(|rejection| ApiError::Rejected(rejection.status(), rejection.body_text()))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| ApiError::bad_request(format!("invalid request body: {err}")))
}

fn required_param<T>(name: &str, raw: Option<&str>) -> ApiResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("missing query parameter `{name}`")))?;
    raw.parse()
        .map_err(|err| ApiError::bad_request(format!("invalid query parameter `{name}`: {err}")))
}

fn store_error(err: HrError) -> ApiError {
    match err {
        HrError::NotFound(_) => ApiError::not_found(err.to_string()),
        HrError::InvalidPage { .. } => ApiError::bad_request(err.to_string()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
