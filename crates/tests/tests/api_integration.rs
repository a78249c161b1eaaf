use std::path::PathBuf;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use bookline_api::{build_app, AppConfig};
use bookline_core::SessionState;
use tower::ServiceExt;

fn kb_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../kb")
}

async fn test_app() -> Router {
    build_app(AppConfig::scripted(kb_root()))
        .await
        .expect("app should build")
}

fn chat_request(msg: &str, cookie: Option<&str>) -> Request<Body> {
    let encoded: String = msg
        .bytes()
        .flat_map(|byte| {
            if byte.is_ascii_alphanumeric() {
                vec![byte as char]
            } else {
                format!("%{byte:02X}").chars().collect()
            }
        })
        .collect();

    let mut builder = Request::builder()
        .method("POST")
        .uri("/get")
        .header("content-type", "application/x-www-form-urlencoded")
        .header("host", "localhost:8080");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::from(format!("msg={encoded}"))).unwrap()
}

fn cookie_pair(response: &Response) -> String {
    response
        .headers()
        .get("set-cookie")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .expect("set-cookie header should be present")
        .to_string()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn chat_shell_is_served() {
    let app = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Bookline Assistant"));
    assert!(body.contains("/get"));
}

#[tokio::test]
async fn health_reports_metrics_and_kb_stats() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(parsed["status"], "ok");
    assert!(parsed["knowledge_base"]["docs_loaded"].as_u64().unwrap() >= 2);
    assert!(parsed["metrics"]["requests_total"].is_u64());
}

#[tokio::test]
async fn booking_flow_completes_across_turns() {
    let app = test_app().await;

    let first = app
        .clone()
        .oneshot(chat_request("I want to book a therapy session", None))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let cookie = cookie_pair(&first);
    assert_eq!(
        body_text(first).await,
        "Sure! To proceed, please provide your name, email, date, time."
    );

    let second = app
        .clone()
        .oneshot(chat_request(
            "My name is Alice. my email is alice@mail.com, date 2025-03-10, time 14:30",
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let reply = body_text(second).await;
    assert!(reply.contains("You can complete your booking here:"));
    assert!(reply.contains("http://localhost:8080/book?"));
    assert!(reply.contains("email=alice%40mail.com"));
    assert!(reply.contains("date=2025-03-10"));
    assert!(reply.contains("time=14%3A30"));

    let session_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/session")
                .header("cookie", cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(session_response.status(), StatusCode::OK);
    let session: SessionState =
        serde_json::from_str(&body_text(session_response).await).unwrap();
    assert!(!session.booking_in_progress);
    assert_eq!(session.slots.name.as_deref(), Some("Alice"));
    assert_eq!(session.conversation_history.len(), 4);

    let logout_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/logout")
                .header("cookie", cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(logout_response.status(), StatusCode::OK);
    assert_eq!(body_text(logout_response).await, "Session cleared!");

    let cleared_response = app
        .oneshot(
            Request::builder()
                .uri("/session")
                .header("cookie", cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let cleared: SessionState =
        serde_json::from_str(&body_text(cleared_response).await).unwrap();
    assert!(cleared.conversation_history.is_empty());
}

#[tokio::test]
async fn forged_cookie_starts_a_fresh_session() {
    let app = test_app().await;

    let response = app
        .oneshot(chat_request(
            "book an appointment",
            Some("bookline_session=forged-id.bad-signature"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // A new signed cookie is issued instead of trusting the forged one.
    let cookie = cookie_pair(&response);
    assert!(!cookie.contains("forged-id"));
}

#[tokio::test]
async fn question_routes_to_knowledge_base() {
    let app = test_app().await;

    let response = app
        .oneshot(chat_request("What are your opening hours?", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let reply = body_text(response).await;
    assert!(reply.starts_with("Based on our knowledge base:"));
    assert!(reply.contains("09:00"));
}

#[tokio::test]
async fn booking_page_prefills_escaped_values() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/book?name=Alice&email=alice%40mail.com&service=therapy&date=2025-03-10&time=14%3A30")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains(r#"value="Alice""#));
    assert!(body.contains(r#"value="alice@mail.com""#));
    assert!(body.contains(r#"value="14:30""#));
}
