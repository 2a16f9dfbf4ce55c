//! OpenAI Assistants API Implementation
//!
//! Calls the Assistants API v2 (https://api.openai.com/v1/assistants, /v1/threads)
//! using reqwest HTTP client.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{
    Assistant, AssistantConfig, AssistantError, AssistantsApi, NewMessage, Run, Thread,
    ThreadMessage,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const ASSISTANTS_BETA: &str = "assistants=v2";

/// Paged list envelope used by list endpoints
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Serialize)]
struct CreateRunBody<'a> {
    assistant_id: &'a str,
}

/// OpenAI API error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    message: String,
}

/// OpenAI Assistants API client
pub struct OpenAiAssistants {
    client: Client,
    base_url: String,
    api_key: String,
    organization: Option<String>,
}

impl OpenAiAssistants {
    /// Create a new client. Fails only if the HTTP client cannot be built.
    pub fn new(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                AssistantError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            organization: config.organization.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/v1{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA);

        match &self.organization {
            Some(organization) => builder.header("OpenAI-Organization", organization),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        resource: &str,
    ) -> Result<T, AssistantError> {
        let response = builder
            .send()
            .await
            .map_err(|e| AssistantError::Request(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(AssistantError::NotFound(resource.to_string()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AssistantError::RateLimit);
        }

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_body) {
                return Err(AssistantError::Response(format!(
                    "OpenAI API error ({}): {}",
                    error_response
                        .error
                        .error_type
                        .as_deref()
                        .unwrap_or("unknown"),
                    error_response.error.message
                )));
            }

            return Err(AssistantError::Response(format!(
                "OpenAI API returned {}: {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AssistantError::Response(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait::async_trait]
impl AssistantsApi for OpenAiAssistants {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, AssistantError> {
        let builder = self.request(Method::GET, &format!("/assistants/{}", assistant_id));
        self.send(builder, &format!("assistant {}", assistant_id))
            .await
    }

    async fn create_thread(&self) -> Result<Thread, AssistantError> {
        let builder = self
            .request(Method::POST, "/threads")
            .json(&serde_json::json!({}));
        self.send(builder, "threads").await
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, AssistantError> {
        let builder = self.request(Method::GET, &format!("/threads/{}", thread_id));
        self.send(builder, &format!("thread {}", thread_id)).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        message: NewMessage,
    ) -> Result<ThreadMessage, AssistantError> {
        let builder = self
            .request(Method::POST, &format!("/threads/{}/messages", thread_id))
            .json(&message);
        self.send(builder, &format!("thread {}", thread_id)).await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, AssistantError> {
        tracing::debug!(thread_id = %thread_id, assistant_id = %assistant_id, "Creating OpenAI run");

        let builder = self
            .request(Method::POST, &format!("/threads/{}/runs", thread_id))
            .json(&CreateRunBody { assistant_id });
        self.send(builder, &format!("thread {}", thread_id)).await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        let builder = self.request(
            Method::GET,
            &format!("/threads/{}/runs/{}", thread_id, run_id),
        );
        self.send(builder, &format!("run {}", run_id)).await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AssistantError> {
        let builder = self.request(Method::GET, &format!("/threads/{}/messages", thread_id));
        let page: ListResponse<ThreadMessage> = self
            .send(builder, &format!("thread {}", thread_id))
            .await?;
        Ok(page.data)
    }
}
