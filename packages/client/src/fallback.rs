//! Stateless HTTP room creation, used when the WebSocket path does not answer.

use std::time::Duration;

use async_trait::async_trait;
use tsunagi_shared::protocol::{CREATE_CHAT_PATH, CreateChatRequest, CreateChatResponse};

use crate::error::FallbackError;

/// Creates rooms without a live connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomFallback: Send + Sync {
    /// Ask the server to create (or look up) the room of `user_id` and `target_id`.
    ///
    /// # Errors
    ///
    /// Any failure, including a `success: false` answer.
    async fn create_chat(
        &self,
        user_id: &str,
        target_id: &str,
        auth_token: Option<String>,
    ) -> Result<CreateChatResponse, FallbackError>;
}

/// `POST {base_url}/api/chats/create` over reqwest.
pub struct HttpRoomFallback {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRoomFallback {
    pub fn new(base_url: impl Into<String>) -> Self {
        // builder() only fails when the TLS backend cannot initialize
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), CREATE_CHAT_PATH)
    }
}

#[async_trait]
impl RoomFallback for HttpRoomFallback {
    async fn create_chat(
        &self,
        user_id: &str,
        target_id: &str,
        auth_token: Option<String>,
    ) -> Result<CreateChatResponse, FallbackError> {
        let body = CreateChatRequest {
            user_id: user_id.to_string(),
            target_id: target_id.to_string(),
        };
        let mut request = self.client.post(self.url()).json(&body);
        if let Some(token) = auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FallbackError::Status(status.as_u16()));
        }

        let created: CreateChatResponse = response.json().await?;
        if !created.success {
            return Err(FallbackError::Rejected(
                created.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(created)
    }
}
