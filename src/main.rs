//! Clerk Web 服务
//!
//! 启动: cargo run
//! 浏览器访问 http://127.0.0.1:8080

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use clerk::artifact::Upload;
use clerk::config::load_config;
use clerk::llm::OpenAiClient;
use clerk::observability;
use clerk::router::{QueryClassifier, QueryRouter};
use clerk::session::SessionRegistry;
use clerk::storage::{ArtifactStorage, DiskStorage};
use clerk::sweeper::spawn_sweeper;

struct AppState {
    router: Arc<QueryRouter>,
    registry: Arc<SessionRegistry>,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    response: String,
    /// 会话当前绑定文件的存储路径（前端回显用）
    loaded_csv: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct HistoryTurn {
    query: String,
    response: String,
    is_error: bool,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    session_id: String,
    turns: Vec<HistoryTurn>,
}

/// 从 Cookie 取会话 ID；没有则生成新的（调用方负责 Set-Cookie）
fn session_cookie(headers: &HeaderMap) -> (String, bool) {
    if let Some(cookie) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        for part in cookie.split(';') {
            if let Some(v) = part.trim().strip_prefix("session_id=") {
                if !v.is_empty() {
                    return (v.to_string(), false);
                }
            }
        }
    }
    (uuid::Uuid::new_v4().to_string(), true)
}

fn with_session_cookie(mut response: Response, session_id: &str, is_new: bool) -> Response {
    if is_new {
        if let Ok(v) = HeaderValue::from_str(&format!(
            "session_id={}; Path=/; SameSite=Lax",
            session_id
        )) {
            response.headers_mut().insert(header::SET_COOKIE, v);
        }
    }
    response
}

async fn index(headers: HeaderMap) -> Response {
    let (session_id, is_new) = session_cookie(&headers);
    with_session_cookie(
        Html(include_str!("../static/index.html")).into_response(),
        &session_id,
        is_new,
    )
}

async fn api_query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let (session_id, is_new) = session_cookie(&headers);

    let mut query = String::new();
    let mut upload: Option<Upload> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("query") => query = field.text().await.unwrap_or_default(),
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                if let (Some(filename), Ok(bytes)) = (filename, field.bytes().await) {
                    if !bytes.is_empty() {
                        upload = Some(Upload {
                            filename,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
            }
            _ => {}
        }
    }

    let reply = state.router.handle_query(&session_id, &query, upload).await;
    let body = Json(QueryResponse {
        response: reply.response,
        loaded_csv: reply.artifact_path,
    });
    with_session_cookie(body.into_response(), &session_id, is_new)
}

async fn api_clear_csv(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (session_id, is_new) = session_cookie(&headers);
    state.router.clear_artifact(&session_id).await;
    let body = Json(MessageResponse {
        message: "CSV cleared".to_string(),
    });
    with_session_cookie(body.into_response(), &session_id, is_new)
}

async fn api_clear_session(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (session_id, is_new) = session_cookie(&headers);
    state.router.clear_session(&session_id).await;
    let body = Json(MessageResponse {
        message: "Session cleared".to_string(),
    });
    with_session_cookie(body.into_response(), &session_id, is_new)
}

async fn api_history(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (session_id, is_new) = session_cookie(&headers);
    let turns = state
        .router
        .history(&session_id)
        .await
        .into_iter()
        .map(|t| HistoryTurn {
            query: t.query,
            response: t.response,
            is_error: t.is_error,
        })
        .collect();
    let body = Json(HistoryResponse {
        session_id: session_id.clone(),
        turns,
    });
    with_session_cookie(body.into_response(), &session_id, is_new)
}

async fn api_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "active_sessions": state.registry.active_count().await,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).unwrap_or_default();

    let uploads_root = cfg
        .storage
        .uploads_root
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap().join("uploads"));
    let storage: Arc<dyn ArtifactStorage> = Arc::new(DiskStorage::new(&uploads_root)?);
    let registry = Arc::new(SessionRegistry::new());

    let openai = Arc::new(OpenAiClient::new(
        cfg.llm.base_url.as_deref(),
        &cfg.llm.model,
        None,
    ));
    let classifier = if cfg.llm.classify_fallback {
        QueryClassifier::with_llm_fallback(openai.clone())
    } else {
        QueryClassifier::rule_based()
    };

    let router = Arc::new(QueryRouter::new(
        registry.clone(),
        storage.clone(),
        openai,
        classifier,
        cfg.storage.max_upload_bytes,
    ));

    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(
        registry.clone(),
        storage,
        Duration::from_secs(cfg.session.sweep_interval_secs),
        Duration::from_secs(cfg.session.ttl_secs),
        shutdown.clone(),
    );

    let state = Arc::new(AppState { router, registry });

    let app = Router::new()
        .route("/", get(index))
        .route("/api/query", post(api_query))
        .route("/api/csv/clear", post(api_clear_csv))
        .route("/api/session/clear", post(api_clear_session))
        .route("/api/history", get(api_history))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/status", get(api_status))
        .layer(DefaultBodyLimit::max(cfg.storage.max_upload_bytes + 64 * 1024))
        .with_state(state);

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, uploads = %uploads_root.display(), "clerk listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    shutdown.cancel();
    let _ = sweeper.await;
    Ok(())
}
