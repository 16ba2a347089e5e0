//! Telegram Bot API client for staff notifications.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{Error, Result};

pub const TELEGRAM_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ParseMode {
    #[default]
    Markdown,
    #[serde(rename = "HTML")]
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sticker {
    pub file_id: String,
    pub file_unique_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub date: i64,
    pub text: Option<String>,
    pub sticker: Option<Sticker>,
}

/// Bot API reply, discriminated on `ok`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelegramResponse {
    Ok(Message),
    Err { error_code: i64, description: String },
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    ok: bool,
    result: Option<Message>,
    error_code: Option<i64>,
    description: Option<String>,
}

impl TryFrom<RawResponse> for TelegramResponse {
    type Error = Error;

    fn try_from(raw: RawResponse) -> Result<Self> {
        match raw {
            RawResponse {
                ok: true,
                result: Some(message),
                ..
            } => Ok(TelegramResponse::Ok(message)),
            RawResponse {
                ok: false,
                error_code: Some(error_code),
                description: Some(description),
                ..
            } => Ok(TelegramResponse::Err {
                error_code,
                description,
            }),
            _ => Err(Error::Validation("Invalid Telegram response format".to_string())),
        }
    }
}

/// Escape Markdown control characters in user-provided text.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '=' | '|' | '{' | '}' | '.' | '!'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub struct TelegramClient {
    http_client: reqwest::Client,
    base_url: String,
    bot_token: String,
    chat_id: i64,
}

impl TelegramClient {
    pub fn new(http_client: reqwest::Client, bot_token: String, chat_id: i64) -> Self {
        Self {
            http_client,
            base_url: TELEGRAM_URL.to_string(),
            bot_token,
            chat_id,
        }
    }

    /// Point the client at another host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn send_message(&self, text: &str, parse_mode: ParseMode) -> Result<Message> {
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": parse_mode,
        });
        self.call("sendMessage", &payload).await
    }

    pub async fn send_sticker(&self, sticker_id: &str) -> Result<Message> {
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "sticker": sticker_id,
        });
        self.call("sendSticker", &payload).await
    }

    async fn call(&self, method: &str, payload: &serde_json::Value) -> Result<Message> {
        let response = self
            .http_client
            .post(format!("{}/bot{}/{}", self.base_url, self.bot_token, method))
            .json(payload)
            .send()
            .await?;

        // Errors come back as non-2xx with the same envelope
        let raw: RawResponse = response.json().await?;
        match TelegramResponse::try_from(raw)? {
            TelegramResponse::Ok(message) => {
                info!(method, message_id = message.message_id, "Telegram message sent");
                Ok(message)
            }
            TelegramResponse::Err {
                error_code,
                description,
            } => {
                error!(method, error_code, description = %description, "Telegram API error");
                let status = u16::try_from(error_code).unwrap_or(502);
                Err(Error::upstream("Telegram", status, description))
            }
        }
    }
}
