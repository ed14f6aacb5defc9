use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Extension, Router,
};
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::error::StoreError;
use crate::process::PlantRecord;
use crate::query;
use crate::store::RecordStore;

/// Query parameters for `GET /top`.
#[derive(Debug, Deserialize)]
struct TopParams {
    limit: Option<usize>,
    state: Option<String>,
}

/// Query parameters for `GET /search`.
#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    state: Option<String>,
}

struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("query failed: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "gridingest-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn top_handler(
    Extension(store): Extension<Arc<dyn RecordStore>>,
    axum::extract::Query(params): axum::extract::Query<TopParams>,
) -> Result<Json<Vec<PlantRecord>>, ApiError> {
    let items = query::top(
        store.as_ref(),
        params.limit.unwrap_or(10),
        params.state.as_deref(),
    )
    .await?;
    Ok(Json(items))
}

async fn search_handler(
    Extension(store): Extension<Arc<dyn RecordStore>>,
    axum::extract::Query(params): axum::extract::Query<SearchParams>,
) -> Result<Json<Vec<PlantRecord>>, ApiError> {
    let items = query::search(store.as_ref(), params.q.as_deref(), params.state.as_deref()).await?;
    Ok(Json(items))
}

/// Assemble the query-surface router. Browsers on other origins call this
/// directly, so GETs are open via CORS.
pub fn router(store: Arc<dyn RecordStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health))
        .route("/top", get(top_handler))
        .route("/search", get(search_handler))
        .layer(ServiceBuilder::new().layer(cors).layer(Extension(store)))
}

pub async fn serve(addr: SocketAddr, store: Arc<dyn RecordStore>) -> anyhow::Result<()> {
    info!(%addr, "query api listening");
    hyper::Server::bind(&addr)
        .serve(router(store).into_make_service())
        .await?;
    Ok(())
}
