//! HTTP API over [`AnalystService`]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use edgar_analyst::sec::FilingReference;
use edgar_analyst::service::{
    AnalyzeRequest, Analyze10kRequest, Analyze10kResponse, AskRequest, AskResponse,
    XbrlAnalyzeRequest, XbrlMetricsQuery,
};
use edgar_analyst::{AnalysisReport, AnalystError, AnalystService, MetricSeries};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

type AppState = Arc<AnalystService>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Pipeline error rendered as a JSON body
pub struct ApiError(AnalystError);

impl From<AnalystError> for ApiError {
    fn from(err: AnalystError) -> Self {
        Self(err)
    }
}

/// HTTP status reported for a pipeline error
pub fn status_for(err: &AnalystError) -> StatusCode {
    match err {
        AnalystError::TickerNotFound(_) | AnalystError::FilingNotFound { .. } => StatusCode::NOT_FOUND,
        AnalystError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        AnalystError::Provider(_) => StatusCode::BAD_GATEWAY,
        AnalystError::Data(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
struct TickerQuery {
    ticker: String,
}

#[derive(Debug, Serialize)]
struct LatestFilingResponse {
    #[serde(flatten)]
    reference: FilingReference,
    url: String,
    html: String,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn ask(State(service): State<AppState>, Json(request): Json<AskRequest>) -> ApiResult<AskResponse> {
    Ok(Json(service.ask(request).await?))
}

async fn latest_10k(
    State(service): State<AppState>,
    Query(query): Query<TickerQuery>,
) -> ApiResult<LatestFilingResponse> {
    let document = service.latest_10k(&query.ticker).await?;
    Ok(Json(LatestFilingResponse {
        url: document.reference.document_url(),
        reference: document.reference,
        html: document.html,
    }))
}

async fn analyze_10k(
    State(service): State<AppState>,
    Json(request): Json<Analyze10kRequest>,
) -> ApiResult<Analyze10kResponse> {
    Ok(Json(service.analyze_10k(request).await?))
}

async fn xbrl_metrics(
    State(service): State<AppState>,
    Query(query): Query<XbrlMetricsQuery>,
) -> ApiResult<MetricSeries> {
    Ok(Json(service.xbrl_metrics(&query.ticker, query.years).await?))
}

async fn analyze_xbrl(
    State(service): State<AppState>,
    Json(request): Json<XbrlAnalyzeRequest>,
) -> ApiResult<AnalysisReport> {
    let report = service
        .analyze_xbrl(&request.ticker, request.years, request.output_lang.as_deref())
        .await?;
    Ok(Json(report))
}

async fn analyze(
    State(service): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<AnalysisReport> {
    Ok(Json(service.analyze(request).await?))
}

/// All API routes
pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .route("/sec/10k/latest", get(latest_10k))
        .route("/sec/10k/analyze", post(analyze_10k))
        .route("/sec/xbrl/metrics", get(xbrl_metrics))
        .route("/ai/analyze/xbrl", post(analyze_xbrl))
        .route("/ai/analyze", post(analyze))
        .with_state(service)
}

/// Serve the API until the process is stopped
pub async fn serve(service: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(service)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use edgar_analyst::AnalystConfig;
    use edgar_analyst::sec::{COMPANY_TICKERS_URL, HttpFetch, HttpResponse};
    use tower::ServiceExt;

    const TICKERS: &str = r#"{"0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}}"#;

    /// Serves the ticker directory and answers 404 for everything else
    struct DirectoryOnly;

    #[async_trait]
    impl HttpFetch for DirectoryOnly {
        async fn get(&self, url: &str) -> edgar_analyst::Result<HttpResponse> {
            if url == COMPANY_TICKERS_URL {
                Ok(HttpResponse::new(200, TICKERS))
            } else {
                Ok(HttpResponse::new(404, ""))
            }
        }
    }

    fn app(dir: &std::path::Path) -> Router {
        let config = AnalystConfig::builder()
            .data_dir(dir)
            .sec_user_agent("Research Bot research@example.com")
            .build()
            .unwrap();
        let service = AnalystService::with_http(config, Arc::new(DirectoryOnly)).unwrap();
        router(Arc::new(service))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/sec/10k/latest?ticker=ZZZZ")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Ticker not found: ZZZZ");
    }

    #[tokio::test]
    async fn test_analyze_without_credential_uses_rules() {
        let dir = tempfile::tempdir().unwrap();
        let body = json!({
            "ticker": "AAPL",
            "metrics": {"revenue": 391.04e9, "net_margin": 0.24},
            "question": "Is the margin sustainable?"
        });
        let response = app(dir.path())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/ai/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let report = body_json(response).await;
        assert!(report["executive_summary"].as_str().unwrap().contains("AAPL"));
        assert!(report.get("red_flags").is_some());
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(status_for(&AnalystError::TickerNotFound("X".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&AnalystError::Config("key".into())), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(&AnalystError::Provider("down".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&AnalystError::Data("empty".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for(&AnalystError::Transport("reset".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
