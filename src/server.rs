//! HTTP surface: `/quote`, `/compare`, `/chains` and `/health`.
//!
//! Every response carries a permissive CORS header and errors are always
//! `{"error": message}`.

use anyhow::{Context, Result};
use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{info, warn};
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

use crate::aggregator::Aggregator;
use crate::chains::SUPPORTED_CHAINS;
use crate::comparison::ComparisonEngine;
use crate::curve::{OnchainRouter, SecondaryAdapter};
use crate::errors::QuoteError;
use crate::primary::PrimaryAdapter;
use crate::registry::Registry;
use crate::reporter::{ErrorReporter, LogReporter};
use crate::request::{parse_quote_params, QuoteRequest};
use crate::settings::Settings;
use crate::units::parse_address;

#[derive(Clone)]
pub struct AppState {
    pub primary: Arc<PrimaryAdapter>,
    pub comparison: Arc<ComparisonEngine>,
    pub secondary: Option<Arc<SecondaryAdapter>>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub compare_enabled: bool,
}

impl AppState {
    /// Wires the production collaborators described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let registry = Arc::new(Registry::new(settings.rpc.clone()));
        let engine = Arc::new(Aggregator::from_settings(&settings.aggregator)?);
        let fallback = parse_address(&settings.aggregator.fallback_account)
            .context("aggregator.fallback_account")?;
        let primary = Arc::new(PrimaryAdapter::new(registry.clone(), engine, fallback));

        let secondary = if settings.features.curve_enabled {
            let router = Arc::new(OnchainRouter::new(settings.curve.clone())?);
            Some(Arc::new(SecondaryAdapter::new(router)))
        } else {
            None
        };
        let comparison = Arc::new(ComparisonEngine::new(registry, primary.clone(), secondary.clone()));

        Ok(Self {
            primary,
            comparison,
            secondary,
            reporter: Arc::new(LogReporter),
            compare_enabled: settings.features.compare_enabled,
        })
    }
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Maps a quote failure, handing server-side ones to the reporter.
    fn from_quote(err: QuoteError, context: &str, reporter: &dyn ErrorReporter) -> Self {
        if err.is_client_error() {
            return Self::new(StatusCode::BAD_REQUEST, err.to_string());
        }
        reporter.report(context, &err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn prefix(token: &str) -> &str {
    token.get(..10).unwrap_or(token)
}

fn symbol_or_prefix<'a>(symbol: &'a str, token: &'a str) -> &'a str {
    if symbol.is_empty() {
        prefix(token)
    } else {
        symbol
    }
}

fn parse(params: &HashMap<String, String>) -> Result<QuoteRequest, ApiError> {
    parse_quote_params(params).map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn chains() -> Response {
    Json(&*SUPPORTED_CHAINS).into_response()
}

async fn quote(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let req = parse(&params)?;
    let started = Instant::now();
    match state.primary.quote(&req).await {
        Ok(result) => {
            info!(
                "Quote: chain={} {} -> {}, amount={}, output={}, provider={}, {}ms",
                req.chain_id,
                symbol_or_prefix(&result.from_symbol, &req.from),
                symbol_or_prefix(&result.to_symbol, &req.to),
                req.amount,
                result.output_amount,
                result.provider,
                started.elapsed().as_millis()
            );
            Ok(Json(result).into_response())
        }
        Err(e) => {
            let context = format!(
                "Quote failed: chain={} {} -> {}, {}ms",
                req.chain_id,
                prefix(&req.from),
                prefix(&req.to),
                started.elapsed().as_millis()
            );
            Err(ApiError::from_quote(e, &context, state.reporter.as_ref()))
        }
    }
}

async fn compare(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    if !state.compare_enabled {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "Not found"));
    }
    let req = parse(&params)?;
    let started = Instant::now();
    let result = state.comparison.compare(&req).await;
    info!(
        "Compare: chain={} {} -> {}, amount={}, recommendation={:?}, {}ms",
        req.chain_id,
        prefix(&req.from),
        prefix(&req.to),
        req.amount,
        result.recommendation,
        started.elapsed().as_millis()
    );
    Ok(Json(result).into_response())
}

async fn not_found(method: Method, uri: axum::http::Uri) -> ApiError {
    info!("404: {} {}", method, uri.path());
    ApiError::new(StatusCode::NOT_FOUND, "Not found")
}

/// Answers preflight requests and stamps CORS headers on every response.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chains", get(chains))
        .route("/quote", get(quote))
        .route("/compare", get(compare))
        .fallback(not_found)
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

/// Serves until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Server listening on http://{}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    warn!("Server stopped");
    Ok(())
}
