//! RouteSafe API Server
//!
//! HTTP front end for road damage detection. Accepts road photos, hands them
//! to the configured vision provider and returns a Detection Report.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use vision::VisionProvider;

pub mod config;
pub mod error;
pub mod rate_limit;
mod routes;

pub use config::{LogConfig, ServerConfig, ServiceConfig, VerificationMode};
pub use error::ApiError;

use rate_limit::{create_governor_config, DefaultGovernorConfig};

/// Application state shared across handlers
pub struct AppState {
    /// Vision provider doing the analysis
    pub provider: Arc<dyn VisionProvider>,
    /// How verify requests are answered
    pub verification: VerificationMode,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus renderer, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(provider: Arc<dyn VisionProvider>, verification: VerificationMode) -> Self {
        Self {
            provider,
            verification,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Create the application router
///
/// Both endpoint layouts are served: the legacy `/api/*` routes and the
/// single `POST /`. Only image routes are rate limited.
pub fn create_router(
    state: Arc<AppState>,
    server: &ServerConfig,
    governor: Option<Arc<DefaultGovernorConfig>>,
) -> Router {
    let limit = |route: MethodRouter<Arc<AppState>>| match &governor {
        Some(config) => route.layer(GovernorLayer {
            config: Arc::clone(config),
        }),
        None => route,
    };

    Router::new()
        .route(
            "/",
            get(routes::health::ping).merge(limit(post(routes::unified::analyze))),
        )
        .route("/api/health", get(routes::health::health))
        .route("/api/verify-image", limit(post(routes::verify::verify_image)))
        .route("/api/detect", limit(post(routes::detect::detect)))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Initialize logging
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let level: Level = config.level.parse()?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    Ok(())
}

/// Run the server
pub async fn run_server(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let provider = vision::build_provider(&config.provider)?;
    let mut state = AppState::new(provider, config.verification.mode);
    info!("Image verification mode: {:?}", config.verification.mode);

    if config.metrics.enabled {
        let handle = PrometheusBuilder::new().install_recorder()?;
        state = state.with_metrics(handle);
    }

    let governor = if config.rate_limit.enabled {
        info!(
            "Rate limiting: burst {}, one request per {}s",
            config.rate_limit.burst_size, config.rate_limit.per_second
        );
        Some(create_governor_config(&config.rate_limit).ok_or("Invalid rate limit configuration")?)
    } else {
        None
    };

    let app = create_router(Arc::new(state), &config.server, governor);
    let addr = config.address();

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::Request;
    use road_damage::{parse_reply, Analysis, ImagePayload, Verification};
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tower::ServiceExt;
    use vision::VisionError;

    use crate::rate_limit::RateLimitConfig;

    /// Replays a canned model reply and records what it was sent
    struct ScriptedProvider {
        reply: String,
        verdict: String,
        seen: Mutex<Vec<ImagePayload>>,
    }

    impl ScriptedProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                verdict: r#"{"isValid": false, "reason": "Not a road"}"#.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VisionProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn analyze(&self, image: &ImagePayload) -> Result<Analysis, VisionError> {
            self.seen.lock().unwrap().push(image.clone());
            Ok(parse_reply(&self.reply)?)
        }

        async fn verify(&self, image: &ImagePayload) -> Result<Verification, VisionError> {
            self.seen.lock().unwrap().push(image.clone());
            Ok(parse_reply(&self.verdict)?)
        }
    }

    /// Fails every call like an unreachable upstream
    struct FailingProvider;

    #[async_trait]
    impl VisionProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn analyze(&self, _image: &ImagePayload) -> Result<Analysis, VisionError> {
            Err(VisionError::Api {
                status: 503,
                message: "upstream unavailable".to_string(),
            })
        }

        async fn verify(&self, _image: &ImagePayload) -> Result<Verification, VisionError> {
            Err(VisionError::Unauthorized)
        }
    }

    const REPLY: &str = r#"```json
{
  "hasPotholes": true,
  "totalPotholes": 5,
  "detections": [
    {"id": 1, "severity": "LOW", "confidence": 0.6, "damageType": "crack", "estimatedSize": "small"},
    {"id": 2, "severity": "HIGH", "confidence": 0.95, "damageType": "pothole", "estimatedSize": "large", "estimatedDepth": "deep"},
    {"id": 3, "severity": "MEDIUM", "confidence": 0.8, "damageType": "pothole", "estimatedSize": "medium"}
  ],
  "roadType": "State Highway",
  "roadCondition": "Poor",
  "overallRiskLevel": "High"
}
```"#;

    fn app_with(provider: Arc<dyn VisionProvider>, mode: VerificationMode) -> Router {
        let state = Arc::new(AppState::new(provider, mode));
        create_router(state, &ServerConfig::default(), None)
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_detect_sorts_and_attaches_location() {
        let provider = Arc::new(ScriptedProvider::new(REPLY));
        let app = app_with(provider.clone(), VerificationMode::AcceptAll);
        let location = json!({"latitude": 12.9716, "longitude": 77.5946});

        let (status, body) = post_json(
            app,
            "/api/detect",
            json!({"image": "data:image/png;base64,iVBORw0KGgo", "location": location}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["hasPotholes"], json!(true));
        assert_eq!(body["totalPotholes"], json!(3));
        let severities: Vec<&str> = body["detections"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["severity"].as_str().unwrap())
            .collect();
        assert_eq!(severities, vec!["HIGH", "MEDIUM", "LOW"]);
        assert_eq!(body["roadType"], json!("State Highway"));
        assert_eq!(body["location"], location);

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].data(), "iVBORw0KGgo");
        assert_eq!(seen[0].media_type().as_str(), "image/png");
    }

    #[tokio::test]
    async fn test_detect_without_location_defaults_to_empty_object() {
        let app = app_with(
            Arc::new(ScriptedProvider::new("{\"hasPotholes\": false, \"totalPotholes\": 0, \"detections\": []}")),
            VerificationMode::AcceptAll,
        );

        let (status, body) = post_json(app, "/api/detect", json!({"image": "AAAA"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hasPotholes"], json!(false));
        assert_eq!(body["totalPotholes"], json!(0));
        assert_eq!(body["location"], json!({}));
    }

    #[tokio::test]
    async fn test_detect_missing_image() {
        let app = app_with(Arc::new(ScriptedProvider::new(REPLY)), VerificationMode::AcceptAll);

        let (status, body) =
            post_json(app, "/api/detect", json!({"location": {"lat": 1.0}})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"success": false, "error": "No image provided"}));
    }

    #[tokio::test]
    async fn test_detect_empty_image_is_missing() {
        let app = app_with(Arc::new(ScriptedProvider::new(REPLY)), VerificationMode::AcceptAll);

        let (status, body) = post_json(app, "/api/detect", json!({"image": ""})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn test_detect_unparsable_reply() {
        let app = app_with(
            Arc::new(ScriptedProvider::new("Sorry, I cannot analyze this.")),
            VerificationMode::AcceptAll,
        );

        let (status, body) = post_json(app, "/api/detect", json!({"image": "AAAA"})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("Failed to parse AI response"));
        assert_eq!(body["raw_response"], json!("Sorry, I cannot analyze this."));
    }

    #[tokio::test]
    async fn test_detect_long_reply_truncated() {
        let reply = format!("I see a road. {}", "Lots of detail. ".repeat(100));
        let app = app_with(Arc::new(ScriptedProvider::new(&reply)), VerificationMode::AcceptAll);

        let (_, body) = post_json(app, "/api/detect", json!({"image": "AAAA"})).await;
        let raw = body["raw_response"].as_str().unwrap();
        assert_eq!(raw.chars().count(), 500);
        assert!(reply.starts_with(raw));
    }

    #[tokio::test]
    async fn test_detect_provider_failure() {
        let app = app_with(Arc::new(FailingProvider), VerificationMode::AcceptAll);

        let (status, body) = post_json(app, "/api/detect", json!({"image": "AAAA"})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"success": false, "error": "Provider returned HTTP 503: upstream unavailable"})
        );
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let app = app_with(Arc::new(ScriptedProvider::new(REPLY)), VerificationMode::AcceptAll);
        let request = Request::builder()
            .method("POST")
            .uri("/api/detect")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_verify_accept_all_skips_provider() {
        let provider = Arc::new(ScriptedProvider::new(REPLY));
        let app = app_with(provider.clone(), VerificationMode::AcceptAll);

        let (status, body) = post_json(app, "/api/verify-image", json!({"image": "AAAA"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"isValid": true, "reason": "Image accepted"}));
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verify_with_provider() {
        let app = app_with(Arc::new(ScriptedProvider::new(REPLY)), VerificationMode::Provider);

        let (status, body) = post_json(app, "/api/verify-image", json!({"image": "AAAA"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"isValid": false, "reason": "Not a road"}));
    }

    #[tokio::test]
    async fn test_verify_provider_failure() {
        let app = app_with(Arc::new(FailingProvider), VerificationMode::Provider);

        let (status, body) = post_json(app, "/api/verify-image", json!({"image": "AAAA"})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], json!("Provider rejected the API key"));
    }

    #[tokio::test]
    async fn test_unified_endpoint_dispatch() {
        let provider: Arc<dyn VisionProvider> = Arc::new(ScriptedProvider::new(REPLY));

        let (status, body) = post_json(
            app_with(provider.clone(), VerificationMode::AcceptAll),
            "/",
            json!({"image": "AAAA"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isValid"], json!(true));

        let (status, body) = post_json(
            app_with(provider, VerificationMode::AcceptAll),
            "/",
            json!({"image": "AAAA", "location": {"city": "Pune"}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["totalPotholes"], json!(3));
        assert_eq!(body["location"], json!({"city": "Pune"}));
    }

    #[tokio::test]
    async fn test_unified_missing_image() {
        let app = app_with(Arc::new(ScriptedProvider::new(REPLY)), VerificationMode::AcceptAll);

        let (status, body) = post_json(app, "/", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("No image provided"));
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let provider: Arc<dyn VisionProvider> = Arc::new(ScriptedProvider::new(REPLY));

        let (status, body) =
            get_json(app_with(provider.clone(), VerificationMode::AcceptAll), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("healthy"));
        assert_eq!(body["message"], json!("RouteSafe Backend Running"));
        assert_eq!(body["provider"], json!("scripted"));

        let (status, body) = get_json(app_with(provider, VerificationMode::AcceptAll), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let app = app_with(Arc::new(ScriptedProvider::new(REPLY)), VerificationMode::AcceptAll);
        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let app = app_with(Arc::new(ScriptedProvider::new(REPLY)), VerificationMode::AcceptAll);
        let request = Request::builder()
            .uri("/api/health")
            .header("origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }

    #[tokio::test]
    async fn test_detect_echoes_null_location() {
        let app = app_with(Arc::new(ScriptedProvider::new(REPLY)), VerificationMode::AcceptAll);

        let (status, body) =
            post_json(app, "/api/detect", json!({"image": "AAAA", "location": null})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get("location"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_unified_null_location_runs_detection() {
        let app = app_with(Arc::new(ScriptedProvider::new(REPLY)), VerificationMode::AcceptAll);

        let (status, body) = post_json(app, "/", json!({"image": "AAAA", "location": null})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["totalPotholes"], json!(3));
        assert_eq!(body.get("location"), Some(&Value::Null));
        assert!(body.get("isValid").is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_applies_to_image_routes_only() {
        let limits = RateLimitConfig {
            enabled: true,
            per_second: 60,
            burst_size: 1,
        };
        let state = Arc::new(AppState::new(
            Arc::new(ScriptedProvider::new(REPLY)),
            VerificationMode::AcceptAll,
        ));
        let app = create_router(state, &ServerConfig::default(), create_governor_config(&limits));
        let peer = SocketAddr::from(([203, 0, 113, 7], 40000));

        let verify_request = || {
            let mut request = Request::builder()
                .method("POST")
                .uri("/api/verify-image")
                .header("content-type", "application/json")
                .body(Body::from(json!({"image": "AAAA"}).to_string()))
                .unwrap();
            request.extensions_mut().insert(ConnectInfo(peer));
            request
        };

        let first = app.clone().oneshot(verify_request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = app.clone().oneshot(verify_request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        for _ in 0..3 {
            let mut request = Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap();
            request.extensions_mut().insert(ConnectInfo(peer));
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_metrics_rendered_when_enabled() {
        let recorder = PrometheusBuilder::new().build_recorder();
        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("routesafe_requests_total", "endpoint" => "detect").increment(3);
        });

        let state = AppState::new(
            Arc::new(ScriptedProvider::new(REPLY)),
            VerificationMode::AcceptAll,
        )
        .with_metrics(recorder.handle());
        let app = create_router(Arc::new(state), &ServerConfig::default(), None);
        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("routesafe_requests_total{endpoint=\"detect\"} 3"));
    }
}
