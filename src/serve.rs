use anyhow::{Context, Result};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{Html, Json},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::model::{DeclaredScreen, NavigatorKind};
use crate::sync::{ScreensRequest, SyncService};

const PANEL: &str = include_str!("serve/panel.html");

#[derive(Clone)]
struct AppState {
    service: Arc<SyncService>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default)]
    pub output: Vec<String>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: Option<T>, output: Vec<String>) -> Self {
        Self {
            success: true,
            data,
            output,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            data: None,
            output: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NavigatorView {
    pub name: String,
    pub kind: NavigatorKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScreensView {
    pub navigators: Vec<NavigatorView>,
    pub screens: Vec<DeclaredScreen>,
}

pub fn router(service: Arc<SyncService>) -> Router {
    Router::new()
        .route("/", get(panel))
        .route("/api/health", get(health_check))
        .route("/api/screens", get(list_screens).post(add_screens))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(AppState { service })
}

pub async fn serve(service: Arc<SyncService>, host: &str, port: u16) -> Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("control panel on http://{addr}");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

async fn panel() -> Html<&'static str> {
    Html(PANEL)
}

async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::ok(Some("OK".to_string()), Vec::new()))
}

async fn list_screens(State(state): State<AppState>) -> Json<ApiResponse<ScreensView>> {
    let engine = state.service.engine().await;
    let navigators = match engine.document().await {
        Ok(document) => document
            .navigators()
            .into_iter()
            .map(|n| NavigatorView {
                name: n.name.clone(),
                kind: n.kind,
            })
            .collect(),
        Err(e) => {
            warn!("{e:#}");
            Vec::new()
        }
    };
    let screens = engine
        .session()
        .acknowledged()
        .map(|s| s.screens.clone())
        .unwrap_or_default();

    Json(ApiResponse::ok(
        Some(ScreensView {
            navigators,
            screens,
        }),
        Vec::new(),
    ))
}

async fn add_screens(
    State(state): State<AppState>,
    Json(request): Json<ScreensRequest>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    let result = state.service.engine().await.apply_request(&request).await;

    match result {
        Ok(output) => (StatusCode::OK, Json(ApiResponse::ok(None, output))),
        Err(e) => {
            warn!("request failed: {e:#}");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::failed(format!("{e:#}"))),
            )
        }
    }
}
