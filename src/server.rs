//! # Server Configuration
//!
//! Router assembly, middleware and the serve loop for the reporting API.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers;
use crate::telemetry::{self, TRACE_ID_HEADER, TraceContext};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origin);
    let static_dir = state.config.static_dir.clone();

    let api = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health::health))
        .route("/projects", get(handlers::projects::list_projects))
        .route(
            "/projects/{id}/iterations",
            get(handlers::projects::list_iterations),
        )
        .route(
            "/projects/{id}/iterations/{iteration_id}/burndown",
            get(handlers::reports::iteration_burndown),
        )
        .route(
            "/projects/{id}/burnup",
            get(handlers::reports::project_burnup),
        )
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()));

    let app = match static_dir {
        Some(dir) => with_static_files(api, &dir),
        None => api,
    };

    app.layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn with_static_files(router: Router, dir: &Path) -> Router {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "static directory not found; frontend will not be served");
        return router;
    }
    router.fallback_service(ServeDir::new(dir))
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::OPTIONS]);
    match HeaderValue::from_str(allowed_origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(err) => {
            tracing::warn!(origin = allowed_origin, error = %err, "ignoring invalid allowed origin");
            layer
        }
    }
}

/// Scope each request in a [`TraceContext`] and echo its id back.
async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let incoming = request
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok());
    let context = TraceContext::from_incoming(incoming);
    let trace_id = context.trace_id.clone();
    request.extensions_mut().insert(context.clone());

    let mut response = telemetry::with_trace_context(context, next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
    }
    response
}

/// Serve the API until `shutdown` resolves.
pub async fn run_server<F>(
    config: Arc<AppConfig>,
    db: Arc<DatabaseConnection>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config
        .bind_addr()
        .with_context(|| format!("invalid server address '{}'", config.api_bind_addr))?;
    let profile = config.profile.clone();

    let app = create_app(AppState { config, db });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, %profile, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health::health,
        crate::handlers::projects::list_projects,
        crate::handlers::projects::list_iterations,
        crate::handlers::reports::iteration_burndown,
        crate::handlers::reports::project_burnup,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::ProjectInfo,
            crate::models::IterationInfo,
            crate::models::HealthResult,
            crate::models::HealthDependency,
            crate::analytics::BurndownPoint,
            crate::analytics::BurnupPoint,
            crate::error::ApiError,
        )
    ),
    tags(
        (name = "projects", description = "Tracked projects and iterations"),
        (name = "reports", description = "Burndown and burnup series"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "Charts API",
        description = "Burndown and burnup reports over project board snapshots",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
