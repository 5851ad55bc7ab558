//! Sensor Telemetry API Server
//!
//! HTTP/JSON API over the reading store, plus the bootstrap that wires the
//! store, the background generator and the server together.

use axum::{routing::get, Router};
use sensor_generator::ReadingGenerator;
use std::future::Future;
use std::time::Duration;
use storage::{MemoryStore, MongoStore, Repository, RetentionPolicy};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod error;
pub mod routes;
mod settings;

pub use error::ApiError;
pub use settings::{AppConfig, StorageBackend, DEFAULT_MONGO_URI};

/// First delay before retrying the retention policy
const RETENTION_RETRY_INITIAL: Duration = Duration::from_secs(1);
/// Upper bound on the retention retry delay
const RETENTION_RETRY_MAX: Duration = Duration::from_secs(30);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Storage repository
    pub repository: Repository,
    /// Number of readings served by `/api/latest`
    pub latest_limit: usize,
    /// Identity message served by `/`
    pub message: String,
}

impl AppState {
    /// Create new application state
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            latest_limit: 20,
            message: "Sensor API is running!".to_string(),
        }
    }

    pub fn with_latest_limit(mut self, latest_limit: usize) -> Self {
        self.latest_limit = latest_limit;
        self
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(routes::status::home))
        .route("/api/latest", get(routes::sensors::get_latest))
        .route("/api/stats", get(routes::status::get_stats))
        .route("/api/health", get(routes::status::health))
        .fallback(routes::not_found);

    with_middleware(router).with_state(state)
}

/// Panic recovery, request tracing and permissive CORS
fn with_middleware<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(CatchPanicLayer::custom(routes::internal_error))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Initialize logging
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Build the repository for the configured backend
pub async fn connect_repository(config: &AppConfig) -> Result<Repository, ApiError> {
    let repository = match config.storage_backend {
        StorageBackend::Mongo => Repository::new(
            MongoStore::connect(
                &config.mongo_uri,
                &config.database_name,
                &config.collection_name,
            )
            .await?,
        ),
        StorageBackend::Memory => Repository::new(MemoryStore::new()),
    };
    Ok(repository)
}

/// Install the retention policy on a detached task, retrying with
/// exponential backoff until the store accepts it
pub fn spawn_retention(repository: Repository, policy: RetentionPolicy) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = RETENTION_RETRY_INITIAL;
        loop {
            match repository.apply_retention(&policy).await {
                Ok(()) => return,
                Err(e) => {
                    warn!(
                        "Could not apply retention policy, retrying in {:?}: {}",
                        backoff, e
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(RETENTION_RETRY_MAX);
                }
            }
        }
    })
}

/// Connect to the configured store and run the service
pub async fn run(config: AppConfig) -> Result<(), ApiError> {
    let repository = connect_repository(&config).await?;
    run_with(repository, config).await
}

/// Start retention and the generator on `repository`, then serve until a
/// shutdown signal arrives
pub async fn run_with(repository: Repository, config: AppConfig) -> Result<(), ApiError> {
    // Both detached; they end with the runtime
    spawn_retention(repository.clone(), config.retention_policy());
    ReadingGenerator::new(repository.clone(), config.generator_config()).spawn();

    let state = AppState::new(repository).with_latest_limit(config.latest_limit);
    let listener = TcpListener::bind(config.socket_addr()).await?;
    info!("Starting API server on {}", listener.local_addr()?);

    serve(listener, state, shutdown_signal()).await
}

/// Serve the API on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), ApiError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("API server stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use storage::SensorReading;
    use tower::ServiceExt;

    const UNREACHABLE_URI: &str =
        "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200";

    async fn send(router: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn memory_state() -> (Arc<MemoryStore>, AppState) {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(Repository::from_arc(store.clone()));
        (store, state)
    }

    async fn unreachable_state() -> AppState {
        let store = MongoStore::connect(UNREACHABLE_URI, "sensor_db", "sensor_data")
            .await
            .unwrap();
        AppState::new(Repository::new(store))
    }

    #[tokio::test(start_paused = true)]
    async fn test_retention_applied_once_store_recovers() {
        let (store, state) = memory_state();
        state
            .repository
            .insert(&SensorReading {
                timestamp: Utc::now() - Duration::seconds(150),
                ..Default::default()
            })
            .await;

        store.set_available(false);
        let handle = spawn_retention(state.repository.clone(), RetentionPolicy::default());

        // First attempt at t = 0 fails, next one is due at t = 1s
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        assert!(!handle.is_finished());
        store.set_available(true);

        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert!(handle.is_finished());
        assert_eq!(state.repository.count().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retention_keeps_retrying_while_offline() {
        let (store, state) = memory_state();
        store.set_available(false);
        let handle = spawn_retention(state.repository.clone(), RetentionPolicy::default());

        tokio::time::sleep(std::time::Duration::from_secs(120)).await;
        assert!(!handle.is_finished());

        handle.abort();
    }

    #[tokio::test]
    async fn test_home() {
        let (_, state) = memory_state();
        let (status, body) = send(create_router(state), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Sensor API is running!");
        assert_eq!(body["status"], "active");
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_latest_returns_twenty_most_recent_oldest_first() {
        let (_, state) = memory_state();
        let base = Utc::now() - Duration::seconds(60);
        let mut inserted = Vec::new();
        for i in 0..25 {
            let reading = SensorReading {
                timestamp: base + Duration::seconds(i),
                mpu1_ax: i as f64 / 100.0,
                ..Default::default()
            };
            state.repository.insert(&reading).await;
            inserted.push(reading);
        }

        let (status, body) = send(create_router(state), "/api/latest").await;
        assert_eq!(status, StatusCode::OK);

        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 20);
        for (item, expected) in items.iter().zip(&inserted[5..]) {
            assert_eq!(item["timestamp"], expected.clock_time());
            assert_eq!(item["mpu1_ax"], json!(expected.mpu1_ax));
            assert_eq!(item.as_object().unwrap().len(), 13);
        }
    }

    #[tokio::test]
    async fn test_latest_empty_store() {
        let (_, state) = memory_state();
        let (status, body) = send(create_router(state), "/api/latest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_latest_degrades_on_backend_failure() {
        let (status, body) = send(create_router(unreachable_state().await), "/api/latest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_stats_empty_store() {
        let (_, state) = memory_state();
        let (status, body) = send(create_router(state), "/api/stats").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"total_records": 0, "latest_timestamp": "No data", "status": "inactive"})
        );
    }

    #[tokio::test]
    async fn test_stats_with_data() {
        let (_, state) = memory_state();
        let newest = SensorReading {
            timestamp: Utc::now(),
            ..Default::default()
        };
        state
            .repository
            .insert(&SensorReading {
                timestamp: newest.timestamp - Duration::seconds(4),
                ..Default::default()
            })
            .await;
        state.repository.insert(&newest).await;

        let (status, body) = send(create_router(state), "/api/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_records"], 2);
        assert_eq!(body["latest_timestamp"], newest.display_time());
        assert_eq!(body["status"], "active");
    }

    #[tokio::test]
    async fn test_stats_backend_failure() {
        let (store, state) = memory_state();
        store.set_available(false);

        let (status, body) = send(create_router(state), "/api/stats").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_health_connected() {
        let (_, state) = memory_state();
        let (status, body) = send(create_router(state), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy", "database": "connected"}));
    }

    #[tokio::test]
    async fn test_health_unreachable_database() {
        let (status, body) = send(create_router(unreachable_state().await), "/api/health").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "unhealthy");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (_, state) = memory_state();
        let (status, body) = send(create_router(state), "/unknown/path").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Endpoint not found"}));
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        async fn boom() -> &'static str {
            panic!("handler failure")
        }
        let router = with_middleware(Router::new().route("/boom", get(boom)));

        let (status, body) = send(router, "/boom").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal server error"}));
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let (_, state) = memory_state();
        let request = Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, "https://dashboard.example.com")
            .body(Body::empty())
            .unwrap();

        let response = create_router(state).oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_serve_over_tcp() {
        let (_, state) = memory_state();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(serve(listener, state, async {
            rx.await.ok();
        }));

        let body: Value = reqwest::get(format!("http://{}/api/stats", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "inactive");

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
