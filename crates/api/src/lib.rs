mod config;
mod templates;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Form, Json, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use bookline_agents::BookingAgent;
use bookline_core::{Denylist, SessionState};
use bookline_extract::{
    Extractor, ExtractiveGenerator, Generator, LlmAnswerGenerator, LlmSlotExtractor,
    ScriptedExtractor,
};
use bookline_observability::AppMetrics;
use bookline_retrieval::{EmbeddingModel, HashEmbeddingModel, KnowledgeRetriever, RetrievalStats};
use bookline_storage::Store;
use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use config::{AppConfig, ExtractorMode, DEFAULT_SESSION_SECRET};

const SESSION_COOKIE_MAX_AGE_SECONDS: u64 = 60 * 60 * 24 * 30;

type Agent = BookingAgent<Store, Extractor, Generator>;

#[derive(Clone)]
pub struct ApiState {
    agent: Arc<Agent>,
    metrics: Arc<AppMetrics>,
    kb_stats: RetrievalStats,
    // One turn at a time per session; concurrent posts would race on the
    // load-modify-save cycle in the store.
    session_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
    cookie_name: String,
    session_secret: String,
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    msg: String,
}

#[derive(Debug, Deserialize)]
struct BookQuery {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    service: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    time: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: bookline_observability::MetricsSnapshot,
    knowledge_base: RetrievalStats,
}

pub async fn build_app(config: AppConfig) -> Result<Router> {
    let metrics = AppMetrics::shared();

    let embedder: Arc<dyn EmbeddingModel> = Arc::new(HashEmbeddingModel::new(256));
    let retriever = Arc::new(
        KnowledgeRetriever::from_kb_dir(&config.kb_root, Some(embedder)).with_context(|| {
            format!("failed to load knowledge base from {}", config.kb_root.display())
        })?,
    );
    let kb_stats = retriever.stats();

    let denylist = match config.denylist_path.as_ref() {
        Some(path) => Denylist::load(path)
            .with_context(|| format!("failed to load denylist from {}", path.display()))?,
        None => Denylist::default(),
    };

    let store = match config.database_url.as_deref() {
        Some(database_url) => Store::sqlite(database_url).await?,
        None => Store::memory(),
    };

    let (extractor, generator) = match (config.extractor_mode, config.llm.clone()) {
        (ExtractorMode::Llm, Some(llm)) => (
            Extractor::Llm(LlmSlotExtractor::new(llm.clone())?),
            Generator::Llm(LlmAnswerGenerator::new(llm)?),
        ),
        _ => (
            Extractor::Scripted(ScriptedExtractor),
            Generator::Extractive(ExtractiveGenerator),
        ),
    };

    let agent = Arc::new(BookingAgent::new(
        retriever,
        extractor,
        generator,
        Arc::new(denylist),
        Arc::new(store),
        metrics.clone(),
    ));

    let state = ApiState {
        agent,
        metrics,
        kb_stats,
        session_locks: Arc::new(Mutex::new(HashMap::new())),
        cookie_name: config.cookie_name,
        session_secret: config.session_secret,
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/get", post(chat))
        .route("/book", get(book))
        .route("/logout", get(logout))
        .route("/session", get(session_view))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(32 * 1024))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(templates::chat_page())
}

async fn chat(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Response {
    let existing = session_id_from_headers(&state, &headers);
    let (session_id, issued) = match existing {
        Some(id) => (id, false),
        None => (uuid::Uuid::new_v4().to_string(), true),
    };

    let turn_lock = state
        .session_locks
        .lock()
        .entry(session_id.clone())
        .or_default()
        .clone();
    let _turn = turn_lock.lock().await;

    let base_url = base_url_from_headers(&headers);
    match state
        .agent
        .handle_message(&session_id, &form.msg, &base_url)
        .await
    {
        Ok(reply) => {
            let mut response = reply.into_response();
            if issued {
                attach_session_cookie(&state, &session_id, &mut response);
            }
            response
        }
        Err(error) => {
            tracing::error!(error = %error, session_id = %session_id, "chat turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.",
            )
                .into_response()
        }
    }
}

async fn book(Query(query): Query<BookQuery>) -> Html<String> {
    Html(templates::booking_page(
        &query.name,
        &query.email,
        &query.service,
        &query.date,
        &query.time,
    ))
}

async fn logout(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    if let Some(session_id) = session_id_from_headers(&state, &headers) {
        if let Err(error) = state.agent.clear_session(&session_id).await {
            tracing::error!(error = %error, session_id = %session_id, "failed clearing session");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.",
            )
                .into_response();
        }
        state.session_locks.lock().remove(&session_id);
    }

    let mut response = "Session cleared!".into_response();
    let cookie = build_clear_cookie(&state.cookie_name);
    if let Ok(header_value) = HeaderValue::from_str(&cookie) {
        response
            .headers_mut()
            .insert(header::SET_COOKIE, header_value);
    }
    response
}

async fn session_view(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_id_from_headers(&state, &headers) else {
        return Json(SessionState::default()).into_response();
    };

    match state.agent.session(&session_id).await {
        Ok(session) => Json(session).into_response(),
        Err(error) => {
            tracing::error!(error = %error, session_id = %session_id, "failed loading session");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.",
            )
                .into_response()
        }
    }
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        knowledge_base: state.kb_stats.clone(),
    };
    (StatusCode::OK, Json(payload))
}

fn session_id_from_headers(state: &ApiState, headers: &HeaderMap) -> Option<String> {
    let cookie_value = read_cookie_value(headers, &state.cookie_name)?;
    verified_session_id(&state.session_secret, &cookie_value)
}

fn read_cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let raw_cookie = headers.get(header::COOKIE)?.to_str().ok()?;
    raw_cookie.split(';').find_map(|part| {
        let mut split = part.trim().splitn(2, '=');
        let key = split.next()?.trim();
        let value = split.next()?.trim();
        if key == cookie_name {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Cookie payload is `{session_id}.{signature}` with an HMAC-SHA256 signature
/// over the session id, base64url without padding.
fn sign_session_id(secret: &str, session_id: &str) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(session_id.as_bytes());
    Some(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

fn verified_session_id(secret: &str, cookie_value: &str) -> Option<String> {
    let (session_id, signature) = cookie_value.rsplit_once('.')?;
    if session_id.is_empty() {
        return None;
    }
    let expected = sign_session_id(secret, session_id)?;
    if constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        Some(session_id.to_string())
    } else {
        None
    }
}

fn constant_time_eq(lhs: &[u8], rhs: &[u8]) -> bool {
    if lhs.len() != rhs.len() {
        return false;
    }
    let mut diff = 0_u8;
    for (a, b) in lhs.iter().zip(rhs.iter()) {
        diff |= a ^ b;
    }
    diff == 0
}

fn attach_session_cookie(state: &ApiState, session_id: &str, response: &mut Response) {
    let Some(signature) = sign_session_id(&state.session_secret, session_id) else {
        return;
    };
    let cookie = build_session_cookie(
        &state.cookie_name,
        &format!("{session_id}.{signature}"),
        SESSION_COOKIE_MAX_AGE_SECONDS,
    );
    if let Ok(header_value) = HeaderValue::from_str(&cookie) {
        response
            .headers_mut()
            .insert(header::SET_COOKIE, header_value);
    }
}

fn build_session_cookie(cookie_name: &str, value: &str, max_age_seconds: u64) -> String {
    [
        format!("{cookie_name}={value}"),
        "Path=/".to_string(),
        "HttpOnly".to_string(),
        "SameSite=Lax".to_string(),
        format!("Max-Age={max_age_seconds}"),
    ]
    .join("; ")
}

fn build_clear_cookie(cookie_name: &str) -> String {
    [
        format!("{cookie_name}="),
        "Path=/".to_string(),
        "HttpOnly".to_string(),
        "SameSite=Lax".to_string(),
        "Max-Age=0".to_string(),
        "Expires=Thu, 01 Jan 1970 00:00:00 GMT".to_string(),
    ]
    .join("; ")
}

fn base_url_from_headers(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost:8080");
    format!("{scheme}://{host}")
}
