//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the favicon and health handlers
//! - Wire up middleware (request ID, tracing, panic catching, CORS, rate limit)
//! - Own the rate limiter and resolver, injected as state
//! - Serve on a listener until shutdown

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::error::ApiError;
use crate::http::handlers::{favicon_handler, health_handler, not_found_handler};
use crate::http::request::{request_span, MakeRequestUuidV4, X_REQUEST_ID};
use crate::resolver::{FaviconResolver, FetchError};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<FaviconResolver>,
}

/// Error building the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to initialize upstream client: {0}")]
    Client(#[from] FetchError),
}

/// HTTP server for the favicon resolver.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Result<Self, ServerError> {
        let resolver = Arc::new(FaviconResolver::new(&config)?);
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::new(&config.rate_limit)));

        let state = AppState { resolver };
        let router = Self::build_router(&config, state, limiter.clone());

        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServiceConfig, state: AppState, limiter: Option<Arc<RateLimiter>>) -> Router {
        let mut favicon = Router::new().route("/favicon", get(favicon_handler));
        if let Some(limiter) = limiter {
            favicon = favicon.route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        let mut router = Router::new()
            .merge(favicon)
            .route("/health", get(health_handler))
            .fallback(not_found_handler)
            .with_state(state)
            .layer(CatchPanicLayer::custom(panic_response));

        if config.cors.enabled {
            router = router.layer(CorsLayer::permissive());
        }

        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
        )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rate_limit = self.limiter.is_some(),
            fetch_timeout_secs = self.config.fetch.timeout_secs,
            "HTTP server starting"
        );

        if let Some(limiter) = &self.limiter {
            tokio::spawn(Arc::clone(limiter).run_sweeper(shutdown.resubscribe()));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");
    ApiError::Unexpected.into_response()
}
