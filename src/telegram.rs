//! Telegram Bot API transport.
//!
//! Thin reqwest wrapper over the methods the bot needs: getMe,
//! getUpdates long-polling, sendMessage and editMessageText. Transport
//! failures are surfaced as [`TelegramError`] and are never fatal to the
//! prediction state: callers log and keep their ledger entries.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api error (status {status}): {description}")]
    Api { status: u16, description: String },
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub edited_message: Option<Message>,
    pub channel_post: Option<Message>,
    pub edited_channel_post: Option<Message>,
}

impl Update {
    /// New and edited posts run the identical handler path.
    pub fn into_messages(self) -> Vec<Message> {
        [
            self.message,
            self.edited_message,
            self.channel_post,
            self.edited_channel_post,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

pub struct TelegramClient {
    http: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str, timeout_ms: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", API_BASE, token),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, TelegramError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status().as_u16();
        let parsed: ApiResponse<T> = response.json().await?;
        if !parsed.ok {
            return Err(TelegramError::Api {
                status,
                description: parsed
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        parsed.result.ok_or(TelegramError::Api {
            status,
            description: "missing result".to_string(),
        })
    }

    pub async fn get_me(&self) -> Result<i64, TelegramError> {
        let me: User = self.call("getMe", serde_json::json!({})).await?;
        Ok(me.id)
    }

    /// Long-poll for updates, acknowledging everything before `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            serde_json::json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message", "edited_message", "channel_post", "edited_channel_post"],
            }),
        )
        .await
    }

    /// Send a message, returning its id for later edits.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, TelegramError> {
        let message: Message = self
            .call(
                "sendMessage",
                serde_json::json!({
                    "chat_id": chat_id,
                    "text": text,
                    "disable_web_page_preview": true,
                }),
            )
            .await?;
        Ok(message.message_id)
    }

    pub async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), TelegramError> {
        let _edited: Message = self
            .call(
                "editMessageText",
                serde_json::json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                    "text": text,
                }),
            )
            .await?;
        Ok(())
    }
}
