//! HTTP API over the same services the bot uses

mod helpers;

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use chrono::Utc;
use helpers::*;
use serde_json::Value;

use taskmind::api::{create_router, AppState};
use taskmind::models::TaskType;
use taskmind::utils::errors::ExtractionError;

fn server(ctx: &TestContext) -> TestServer {
    let state = AppState::new(ctx.services.clone(), 1024 * 1024);
    TestServer::new(create_router(state)).unwrap()
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();
    let response = server(&ctx).get("/api/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let ctx = TestContext::new();
    let response = server(&ctx)
        .get("/api/health")
        .add_header(header::ORIGIN, HeaderValue::from_static("https://example.org"))
        .await;

    assert_eq!(response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
}

#[tokio::test]
async fn test_task_list_requires_a_scope() {
    let ctx = TestContext::new();
    let response = server(&ctx).get("/api/tasks").await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("userId or chatId"));
}

#[tokio::test]
async fn test_task_list_for_unknown_user_is_not_found() {
    let ctx = TestContext::new();
    let response = server(&ctx).get("/api/tasks").add_query_param("userId", "404").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_task_list_returns_scope_tasks() {
    let ctx = TestContext::new();
    let ann = ctx.user("1001", "Ann").await;
    let chat = ctx.group("-1001", "Core Team").await;
    ctx.store.insert_task(task_row(100, "Personal one", TaskType::Personal, ann.id, Utc::now()));
    ctx.store.insert_task(task_row(101, "Group one", TaskType::Group, chat.id, Utc::now()));
    ctx.store.insert_task(task_row(102, "Group two", TaskType::Group, chat.id, Utc::now()));

    let server = server(&ctx);

    let personal: Value = server.get("/api/tasks").add_query_param("userId", "1001").await.json();
    assert_eq!(personal["total"], 1);
    assert_eq!(personal["tasks"][0]["title"], "Personal one");

    let group: Value = server
        .get("/api/tasks")
        .add_query_param("userId", "1001")
        .add_query_param("chatId", "-1001")
        .await
        .json();
    assert_eq!(group["total"], 2);
}

#[tokio::test]
async fn test_extract_text_for_user() {
    let ctx = TestContext::new();
    ctx.model.reply(r#"{"newTasks":[{"title":"Buy milk","priority":"high"}]}"#);

    let form = MultipartForm::new().add_text("text", "Buy milk, it's urgent").add_text("userId", "1001");
    let response = server(&ctx).post("/gemini/extract").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["created"][0]["title"], "Buy milk");
    assert_eq!(body["created"][0]["priority"], "high");
    assert!(body["message"].as_str().unwrap().contains("Buy milk"));
    assert_eq!(ctx.store.tasks().len(), 1);
}

#[tokio::test]
async fn test_extract_audio_for_group() {
    let ctx = TestContext::new();
    ctx.model.reply(r#"{"newTasks":[{"title":"Fix login"}]}"#);

    let audio = Part::bytes(vec![0x4f, 0x67, 0x67, 0x53]).file_name("voice.ogg").mime_type("audio/ogg");
    let form = MultipartForm::new().add_part("audioFile", audio).add_text("chatId", "-1001");
    let response = server(&ctx).post("/gemini/extract").multipart(form).await;

    response.assert_status_ok();
    let (_, part) = ctx.model.calls().pop().unwrap();
    assert_eq!(part.kind(), "audio");

    let chat = ctx.store.chat_by_telegram_id("-1001").unwrap();
    assert_eq!(ctx.store.tasks()[0].chat_id, Some(chat.id));
}

#[tokio::test]
async fn test_extract_freeform_reply() {
    let ctx = TestContext::new();
    ctx.model.reply("Could you clarify?");

    let form = MultipartForm::new().add_text("text", "hmm").add_text("userId", "1001");
    let body: Value = server(&ctx).post("/gemini/extract").multipart(form).await.json();

    assert_eq!(body["freeform"], "Could you clarify?");
}

#[tokio::test]
async fn test_extract_personal_without_user_is_rejected() {
    let ctx = TestContext::new();

    let form = MultipartForm::new().add_text("text", "Buy milk").add_text("type", "personal");
    let response = server(&ctx).post("/gemini/extract").multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(ctx.model.calls().is_empty());
}

#[tokio::test]
async fn test_extract_model_failure_is_bad_gateway() {
    let ctx = TestContext::new();
    ctx.model.fail(ExtractionError::Timeout);

    let form = MultipartForm::new().add_text("text", "Buy milk").add_text("userId", "1001");
    let response = server(&ctx).post("/gemini/extract").multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    assert!(ctx.store.tasks().is_empty());
}
