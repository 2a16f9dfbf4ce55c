//! OpenAI Assistants client tests
//!
//! Drives `OpenAiAssistants` against a wiremock server and checks:
//! - Request shape (paths, auth and beta headers, JSON bodies)
//! - Response decoding for threads, runs and message lists
//! - HTTP status classification into `AssistantError`

use serde_json::json;
use threadline_assistants::openai::OpenAiAssistants;
use threadline_assistants::{
    AssistantError, AssistantsApi, MessageRole, NewMessage, RunStatus,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::*;

mod common;

fn client(server: &MockServer) -> OpenAiAssistants {
    OpenAiAssistants::new(&openai_config(server, 10)).unwrap()
}

#[tokio::test]
async fn test_create_thread_sends_auth_and_beta_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("OpenAI-Beta", "assistants=v2"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(thread_body("thread_new")))
        .expect(1)
        .mount(&server)
        .await;

    let thread = client(&server).create_thread().await.unwrap();
    assert_eq!(thread.id, "thread_new");
    assert_eq!(thread.created_at, Some(1700000000));
}

#[tokio::test]
async fn test_organization_header_is_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_t1"))
        .and(header("OpenAI-Organization", "org_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(thread_body(THREAD_ID)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = openai_config(&server, 10);
    config.organization = Some("org_123".to_string());
    let client = OpenAiAssistants::new(&config).unwrap();

    client.retrieve_thread(THREAD_ID).await.unwrap();
}

#[tokio::test]
async fn test_create_message_posts_user_role() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_t1/messages"))
        .and(body_json(json!({"role": "user", "content": "Hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "object": "thread.message",
            "thread_id": THREAD_ID,
            "role": "user",
            "content": [{"type": "text", "text": {"value": "Hello", "annotations": []}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let message = client(&server)
        .create_message(THREAD_ID, NewMessage::user("Hello"))
        .await
        .unwrap();

    assert_eq!(message.role, MessageRole::User);
    assert_eq!(message.content[0].as_text(), Some("Hello"));
}

#[tokio::test]
async fn test_create_run_posts_assistant_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_t1/runs"))
        .and(body_json(json!({"assistant_id": ASSISTANT_ID})))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("queued")))
        .expect(1)
        .mount(&server)
        .await;

    let run = client(&server)
        .create_run(THREAD_ID, ASSISTANT_ID)
        .await
        .unwrap();

    assert_eq!(run.id, RUN_ID);
    assert_eq!(run.status, RunStatus::Queued);
}

#[tokio::test]
async fn test_retrieve_run_decodes_unknown_status() {
    let server = MockServer::start().await;
    mount_run_statuses(&server, &["awaiting_review"]).await;

    let run = client(&server)
        .retrieve_run(THREAD_ID, RUN_ID)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Other("awaiting_review".to_string()));
    assert!(!run.status.is_terminal());
}

#[tokio::test]
async fn test_list_messages_unwraps_data() {
    let server = MockServer::start().await;
    mount_messages(
        &server,
        vec![
            assistant_message("Hi there"),
            json!({
                "id": "msg_prompt",
                "thread_id": THREAD_ID,
                "role": "user",
                "content": [{"type": "image_file", "image_file": {"file_id": "file_1"}}]
            }),
        ],
    )
    .await;

    let messages = client(&server).list_messages(THREAD_ID).await.unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content[0].as_text(), Some("Hi there"));
    assert_eq!(messages[1].content[0].as_text(), None);
}

#[tokio::test]
async fn test_not_found_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"type": "invalid_request_error", "message": "No thread found with id 'thread_missing'."}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .retrieve_thread("thread_missing")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AssistantError::NotFound("thread thread_missing".to_string())
    );
}

#[tokio::test]
async fn test_rate_limit_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/assistants/asst_1"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client(&server)
        .retrieve_assistant(ASSISTANT_ID)
        .await
        .unwrap_err();

    assert_eq!(err, AssistantError::RateLimit);
}

#[tokio::test]
async fn test_api_error_body_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_t1/runs"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"type": "invalid_request_error", "message": "Thread already has an active run."}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_run(THREAD_ID, ASSISTANT_ID)
        .await
        .unwrap_err();

    match err {
        AssistantError::Response(message) => {
            assert!(message.contains("invalid_request_error"));
            assert!(message.contains("Thread already has an active run."));
        }
        other => panic!("Expected response error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_plain_error_body_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client(&server).create_thread().await.unwrap_err();

    match err {
        AssistantError::Response(message) => {
            assert!(message.contains("502"));
            assert!(message.contains("upstream unavailable"));
        }
        other => panic!("Expected response error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_undecodable_body_is_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server).create_thread().await.unwrap_err();
    assert!(matches!(err, AssistantError::Response(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_request_error() {
    // Port 1 is reserved and has no listener
    let config = openai_config_at("http://127.0.0.1:1", 10);

    let err = OpenAiAssistants::new(&config)
        .unwrap()
        .create_thread()
        .await
        .unwrap_err();

    assert!(matches!(err, AssistantError::Request(_)));
}
