//! HTTP handlers module
//!
//! Contains all HTTP endpoint handling logic

pub mod estimate;
pub mod health;
pub mod models;
pub mod proxy;
pub mod session;
pub mod tokenize;

use crate::config::{AppConfig, Settings};
use crate::middleware::logging::request_logging_middleware;
use crate::services::{
    Estimator, LocalTokenizer, ModelGateway, Orchestrator, Pipeline, RemoteTokenizer, TokenCounter, TokenizerService,
};
use crate::utils::error::{helpers::validation_error, AppResult};
use anyhow::{Context, Result};
use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub catalog: AppConfig,
    pub gateway: Arc<ModelGateway>,
    /// Backs `/api/tokenize`; its failures surface to the caller
    pub local_tokenizer: Arc<LocalTokenizer>,
    /// Stateless tokenize/fan-out/estimate path
    pub pipeline: Pipeline,
    pub orchestrator: Orchestrator,
    pub started_at: Instant,
}

impl AppState {
    /// Build every service from settings and catalog
    ///
    /// Must be called inside a tokio runtime; the session actor is spawned here.
    pub fn new(settings: Settings, catalog: AppConfig) -> Result<Self> {
        catalog.validate().context("Invalid model catalog")?;

        let estimator = Arc::new(Estimator::from_config(&catalog)?);
        let gateway = Arc::new(ModelGateway::new(catalog.clone(), &settings.providers)?);
        let local_tokenizer = Arc::new(LocalTokenizer::bpe(&settings.tokenizer.encoding));

        let counter: Arc<dyn TokenCounter> = match &settings.tokenizer.remote_url {
            Some(url) => Arc::new(RemoteTokenizer::new(url.clone())?),
            None => local_tokenizer.clone(),
        };
        let tokenizer = TokenizerService::new(counter);
        info!("Session tokenizer backend: {}", tokenizer.backend());

        let pipeline = Pipeline::new(tokenizer, gateway.clone(), estimator);
        let orchestrator = Orchestrator::spawn(pipeline.clone(), settings.debounce());

        Ok(Self {
            settings,
            catalog,
            gateway,
            local_tokenizer,
            pipeline,
            orchestrator,
            started_at: Instant::now(),
        })
    }
}

/// Unwrap a JSON body, turning any rejection into a 400 with `message`
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>, message: &str) -> AppResult<T> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!("Rejected request body: {}", rejection);
            Err(validation_error(message))
        }
    }
}

/// Create application router
pub async fn create_router(settings: Settings, catalog: AppConfig) -> Result<Router> {
    let max_request_size = settings.request.max_request_size;
    let cors = cors_layer(&settings);
    let app_state = Arc::new(AppState::new(settings, catalog)?);

    // Create middleware stack
    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_request_size));

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .route("/api/models", get(models::list_models))
        .route("/api/tokenize", post(tokenize::handle_tokenize))
        .route("/api/estimate", post(estimate::handle_estimate))
        .route("/api/session", get(session::get_session))
        .route("/api/session/input", post(session::handle_input))
        .route("/api/session/submit", post(session::handle_submit))
        .route("/api/:endpoint", post(proxy::handle_model_request))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            request_logging_middleware,
        ))
        .with_state(app_state)
        .layer(middleware_stack);

    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    Ok(router)
}

/// CORS layer from the security settings; `None` when disabled
fn cors_layer(settings: &Settings) -> Option<CorsLayer> {
    if !settings.security.cors_enabled {
        return None;
    }

    let origins = &settings.security.allowed_origins;
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()))
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any),
    )
}
