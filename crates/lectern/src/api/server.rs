//! API server setup and configuration.

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::core::{LecternConfig, Orchestrator};
use crate::ocr::{OcrGateway, OcrSpaceClient};
use crate::{LecternError, Result};

use super::{
    handlers::{extract_handler, health_handler, ocr_handler},
    types::ApiState,
};

pub const ENV_CORS_ORIGINS: &str = "LECTERN_CORS_ORIGINS";

/// Build the handler state for `config`.
///
/// `POST /ocr` and images sent to `POST /extract` both go to OCR.space.
pub fn state_from_config(config: LecternConfig) -> ApiState {
    let ocr: Arc<dyn OcrGateway> = Arc::new(OcrSpaceClient::new(config.ocr_space.clone()));
    let orchestrator = Orchestrator::new(Arc::clone(&ocr), config.image.preprocess_options());

    ApiState {
        config: Arc::new(config),
        orchestrator,
        ocr,
    }
}

/// Create the API router with all routes configured.
pub fn create_router(config: LecternConfig) -> Router {
    create_router_with_state(state_from_config(config))
}

/// Create the API router around prepared state.
///
/// The body limit comes from `state.config.server.max_body_bytes`.
pub fn create_router_with_state(state: ApiState) -> Router {
    let max_body_bytes = state.config.server.max_body_bytes;
    let origins = std::env::var(ENV_CORS_ORIGINS).ok();

    Router::new()
        .route("/ocr", post(ocr_handler))
        .route("/extract", post(extract_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(cors_layer(origins.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy: the comma-separated `origins` if any parse, otherwise any origin.
pub fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let Some(origins_str) = origins else {
        tracing::warn!(
            "CORS configured to allow all origins (default). Set {} to a comma-separated list of allowed origins for production",
            ENV_CORS_ORIGINS
        );
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    };

    let origins: Vec<_> = origins_str
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!(
            "{} set but empty/invalid - falling back to permissive CORS",
            ENV_CORS_ORIGINS
        );
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    tracing::info!("CORS configured with {} explicit allowed origin(s)", origins.len());
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the relay on `config.server.host`:`config.server.port`.
pub async fn serve(config: LecternConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    serve_on(host, port, config).await
}

/// Start the relay on an explicit address.
pub async fn serve_on(host: impl AsRef<str>, port: u16, config: LecternConfig) -> Result<()> {
    let ip: IpAddr = host
        .as_ref()
        .parse()
        .map_err(|e| LecternError::validation(format!("Invalid host address: {}", e)))?;

    let addr = SocketAddr::new(ip, port);

    if config.ocr_space.api_key.is_none() {
        tracing::warn!("No OCR.space API key configured (OCR_API_KEY); POST /ocr will fail");
    }

    let app = create_router(config);

    tracing::info!("Starting Lectern relay on http://{}:{}", ip, port);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(LecternError::Io)?;

    axum::serve(listener, app)
        .await
        .map_err(|e| LecternError::Other(e.to_string()))?;

    Ok(())
}
