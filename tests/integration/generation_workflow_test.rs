//! Generation workflow tests
//!
//! Runs `GenerationService` over the real HTTP client against a wiremock
//! server and checks the end-to-end outcomes: reply extraction, timeouts,
//! run failures, poll errors and thread resumption.

use serde_json::json;
use threadline_app::AppContext;
use threadline_assistants::{
    AssistantError, CancellationToken, GenerationError, RunStatus, SetupStep,
};
use threadline_common::Config;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::*;

mod common;

#[test_log::test(tokio::test)]
async fn test_hello_returns_reply_after_two_polls() {
    let server = MockServer::start().await;
    mount_setup(&server).await;
    mount_run_statuses(&server, &["in_progress", "completed"]).await;
    mount_messages(&server, vec![assistant_message("Hi there")]).await;

    let text = generation_service(&server, 10)
        .generate_stateless("Hello", ASSISTANT_ID, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(text, "Hi there");
    assert_eq!(status_checks(&server).await, 2);
    assert_eq!(request_count(&server, "POST", "/v1/threads").await, 1);
    assert_eq!(
        request_count(&server, "POST", "/v1/threads/thread_t1/runs").await,
        1
    );
}

#[tokio::test]
async fn test_prompt_is_posted_as_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_t1/messages"))
        .and(body_json(json!({"role": "user", "content": "Hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_prompt",
            "thread_id": THREAD_ID,
            "role": "user",
            "content": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_setup(&server).await;
    mount_run_statuses(&server, &["completed"]).await;
    mount_messages(&server, vec![assistant_message("Hi there")]).await;

    generation_service(&server, 10)
        .generate_stateless("Hello", ASSISTANT_ID, &CancellationToken::new())
        .await
        .unwrap();
}

#[test_log::test(tokio::test)]
async fn test_never_terminal_times_out_after_budget() {
    let server = MockServer::start().await;
    mount_setup(&server).await;
    mount_run_statuses(&server, &["in_progress"]).await;

    let err = generation_service(&server, 10)
        .generate_stateless("Hello", ASSISTANT_ID, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::PollTimeout { attempts: 10 });
    assert_eq!(status_checks(&server).await, 10);
    assert_eq!(
        request_count(&server, "GET", "/v1/threads/thread_t1/messages").await,
        0
    );
}

#[tokio::test]
async fn test_failed_on_first_poll() {
    let server = MockServer::start().await;
    mount_setup(&server).await;
    mount_run_statuses(&server, &["failed"]).await;

    let err = generation_service(&server, 10)
        .generate_stateless("Hello", ASSISTANT_ID, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GenerationError::RunFailure {
            run_id: RUN_ID.to_string(),
            status: RunStatus::Failed,
        }
    );
    assert_eq!(status_checks(&server).await, 1);
}

#[tokio::test]
async fn test_cancelled_and_expired_stop_polling() {
    for status in ["cancelled", "expired"] {
        let server = MockServer::start().await;
        mount_setup(&server).await;
        mount_run_statuses(&server, &["queued", status]).await;

        let err = generation_service(&server, 10)
            .generate_stateless("Hello", ASSISTANT_ID, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::RunFailure { .. }), "{status}");
        assert_eq!(status_checks(&server).await, 2);
    }
}

#[tokio::test]
async fn test_completed_with_empty_list_is_no_response() {
    let server = MockServer::start().await;
    mount_setup(&server).await;
    mount_run_statuses(&server, &["completed"]).await;
    mount_messages(&server, Vec::new()).await;

    let err = generation_service(&server, 10)
        .generate_stateless("Hello", ASSISTANT_ID, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::NoResponse);
}

#[tokio::test]
async fn test_status_check_error_aborts_immediately() {
    let server = MockServer::start().await;
    mount_setup(&server).await;
    let run_path = format!("/v1/threads/{}/runs/{}", THREAD_ID, RUN_ID);
    Mock::given(method("GET"))
        .and(path(run_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("in_progress")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(run_path.as_str()))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = generation_service(&server, 10)
        .generate_stateless("Hello", ASSISTANT_ID, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GenerationError::TransientPollError(AssistantError::Response(_))
    ));
    assert_eq!(status_checks(&server).await, 3);
}

#[tokio::test]
async fn test_unknown_assistant_is_setup_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/assistants/asst_missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_setup(&server).await;

    let err = generation_service(&server, 10)
        .generate_stateless("Hello", "asst_missing", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GenerationError::SetupFailure {
            step: SetupStep::ResolveAssistant,
            source: AssistantError::NotFound(_),
        }
    ));
    assert_eq!(
        request_count(&server, "POST", "/v1/threads/thread_t1/runs").await,
        0
    );
}

#[test_log::test(tokio::test)]
async fn test_stateful_resume_skips_thread_creation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(thread_body("thread_other")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(thread_body(THREAD_ID)))
        .expect(1)
        .mount(&server)
        .await;
    mount_message_and_run(&server).await;
    mount_run_statuses(&server, &["queued", "in_progress", "completed"]).await;
    mount_messages(&server, vec![assistant_message("Welcome back")]).await;

    let reply = generation_service(&server, 10)
        .generate_stateful(
            Some(THREAD_ID),
            "Still there?",
            ASSISTANT_ID,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(reply.thread_id, THREAD_ID);
    assert_eq!(reply.text, "Welcome back");
    assert_eq!(status_checks(&server).await, 3);
}

#[tokio::test]
async fn test_stateful_new_thread_reported_on_timeout() {
    let server = MockServer::start().await;
    mount_setup(&server).await;
    mount_run_statuses(&server, &["in_progress"]).await;

    let err = generation_service(&server, 3)
        .generate_stateful(None, "Hello", ASSISTANT_ID, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.thread_id.as_deref(), Some(THREAD_ID));
    assert_eq!(err.error, GenerationError::PollTimeout { attempts: 3 });
}

#[tokio::test]
async fn test_stateful_missing_thread_reports_no_thread() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = generation_service(&server, 10)
        .generate_stateful(
            Some("thread_gone"),
            "Hello",
            ASSISTANT_ID,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.thread_id, None);
    assert!(matches!(
        err.error,
        GenerationError::SetupFailure {
            step: SetupStep::ResumeThread,
            ..
        }
    ));
}

#[tokio::test]
async fn test_app_context_runs_generation_on_worker_task() {
    let server = MockServer::start().await;
    mount_setup(&server).await;
    mount_run_statuses(&server, &["completed"]).await;
    mount_messages(&server, vec![assistant_message("From the worker")]).await;

    let config = Config {
        default_assistant_id: Some(ASSISTANT_ID.to_string()),
        ..Config::default()
    };
    let ctx = AppContext::new(config, &openai_config(&server, 10)).unwrap();
    let assistant_id = ctx.assistant_id(None).unwrap();

    let text = ctx
        .generation
        .spawn_stateless("Hello".to_string(), assistant_id, CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(text, "From the worker");
}
