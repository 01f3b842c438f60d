//! Axum server setup and router construction.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use async_graphql_axum::GraphQL;
use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::api::{self, AppState};
use crate::graphql;
use crate::service::ChatService;

/// Build the full axum router.
///
/// The router serves:
/// - Health check at `/health`
/// - REST API at `/api/*`
/// - GraphQL at `/graphql` (POST for queries, GET for GraphiQL)
pub fn build_router(service: Arc<ChatService>, cors_origins: &[String]) -> Router {
    let schema = graphql::build_schema(service.clone());

    let rest_routes = Router::new()
        .route("/health", get(api::health))
        .route("/api/models", get(api::list_models))
        .route("/api/chat", post(api::post_chat))
        .with_state(AppState { service });

    let graphql_routes = Router::new().route(
        "/graphql",
        get(graphql::graphiql).post_service(GraphQL::new(schema)),
    );

    Router::new()
        .merge(rest_routes)
        .merge(graphql_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

/// CORS policy: any origin when the list is empty or contains `*`,
/// otherwise exactly the listed origins.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {o:?}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

/// Start the axum server on a background task and return the bound address.
pub async fn start_server(router: Router, bind_addr: SocketAddr) -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("server error: {e}");
        }
    });

    Ok(addr)
}

/// Serve `router` on `bind_addr` until `shutdown` resolves.
pub async fn serve_until(
    router: Router,
    bind_addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
    on_bound: impl FnOnce(SocketAddr),
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    on_bound(listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
