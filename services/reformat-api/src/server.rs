//! HTTP server for the reformat API.
//!
//! One substantive route: `GET /reformat` runs the pipeline and answers
//! with a temporary redirect to the delivered object. `/health` and
//! `/metrics` are operational.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use delivery::{Pipeline, PipelineError, RawParameters, ResponseDescriptor};

use crate::metrics;

/// Shared application state.
pub struct AppState {
    pub pipeline: Pipeline,
    pub prometheus: PrometheusHandle,
}

#[derive(Debug, Deserialize)]
pub struct ReformatQuery {
    pub product: Option<String>,
    pub layer: Option<String>,
    pub ulx: Option<f64>,
    pub uly: Option<f64>,
    pub lrx: Option<f64>,
    pub lry: Option<f64>,
}

/// Create the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/reformat", get(reformat_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

/// GET /reformat?product=...&layer=...[&ulx=&uly=&lrx=&lry=]
async fn reformat_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ReformatQuery>,
    headers: HeaderMap,
) -> Response {
    metrics::record_request();

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let raw = RawParameters {
        product: params.product,
        layer: params.layer,
        ulx: params.ulx,
        uly: params.uly,
        lrx: params.lrx,
        lry: params.lry,
    };
    let request = match raw.validate(origin) {
        Ok(request) => request,
        Err(err) => {
            metrics::record_failure();
            return error_response(err);
        }
    };

    match state.pipeline.handle(request).await {
        Ok(outcome) => {
            metrics::record_delivered_bytes(outcome.bytes_delivered);
            redirect_response(outcome.response)
        }
        Err(err) => {
            metrics::record_failure();
            error_response(err)
        }
    }
}

fn redirect_response(descriptor: ResponseDescriptor) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::TEMPORARY_REDIRECT)
        .header(header::LOCATION, descriptor.location);
    if let Some(grant) = descriptor.cors {
        builder = builder
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, grant.allow_origin)
            .header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
    }
    match builder.body(axum::body::Body::empty()) {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "failed to build redirect response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn error_response(err: PipelineError) -> Response {
    let status = match &err {
        PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!(error = %err, "reformat request failed");
    (
        status,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}

/// GET /health - Health check endpoint
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "reformat-api"
    }))
}

/// GET /metrics - Prometheus exposition
async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus.render()
}

/// Start the HTTP server.
pub async fn run_server(state: Arc<AppState>, listen: &str) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr: std::net::SocketAddr = listen.parse()?;

    info!(%addr, "Starting reformat API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use object_store::memory::InMemory;
    use tower::ServiceExt;

    use delivery::{PipelineConfig, SourceAccess};
    use storage::ObjectStorage;
    use test_utils::{FakeEngine, TranslateBehavior};

    use super::*;

    fn test_state(behavior: TranslateBehavior) -> Arc<AppState> {
        let engine = Arc::new(FakeEngine::with_behavior(behavior));
        let storage = ObjectStorage::with_store(
            Arc::new(InMemory::new()),
            "test-bucket",
            "https://s3.amazonaws.com",
        );
        let config = PipelineConfig {
            product_base_url: "https://data.example.com/products".to_string(),
            source_access: SourceAccess::Direct,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(engine, storage, config).unwrap();
        // A detached recorder; tests must not install the global one.
        let prometheus = PrometheusBuilder::new().build_recorder().handle();
        Arc::new(AppState {
            pipeline,
            prometheus,
        })
    }

    #[tokio::test]
    async fn valid_request_redirects_to_delivered_object() {
        let app = create_router(test_state(TranslateBehavior::Succeed));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/reformat?product=file.nc&layer=band1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://s3.amazonaws.com/test-bucket/"));
        assert!(location.ends_with("/file-band1.tif"));
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn allowed_origin_gets_cors_headers() {
        let app = create_router(test_state(TranslateBehavior::Succeed));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/reformat?product=file.nc&layer=band1")
                    .header(header::ORIGIN, "https://data.asf.alaska.edu")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://data.asf.alaska.edu"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }

    #[tokio::test]
    async fn missing_parameter_is_bad_request() {
        let app = create_router(test_state(TranslateBehavior::Succeed));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/reformat?layer=band1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn engine_failure_is_internal_error() {
        let app = create_router(test_state(TranslateBehavior::FailClean));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/reformat?product=file.nc&layer=band1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let app = create_router(test_state(TranslateBehavior::Succeed));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
