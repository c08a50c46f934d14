use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::notify::{MessageSink, SinkError};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Sends HTML-formatted messages to one chat through the Bot API.
#[derive(Clone)]
pub struct TelegramSink {
    client: Client,
    bot_token: String,
    chat_id: String,
    api_url: String,
}

impl TelegramSink {
    pub fn new(bot_token: String, chat_id: String) -> Result<Self, SinkError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            bot_token,
            chat_id,
            api_url: TELEGRAM_API_URL.to_string(),
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    async fn send(&self, text: &str) -> Result<(), SinkError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<TelegramResponse>(&body) {
            Ok(parsed) if parsed.ok => Ok(()),
            Ok(parsed) => {
                let description = parsed
                    .description
                    .unwrap_or_else(|| format!("status {status}"));
                error!("Telegram error: {description}");
                Err(SinkError::Rejected { description })
            }
            Err(_) => {
                error!("Telegram returned an unreadable response ({status}): {body}");
                Err(SinkError::Rejected {
                    description: format!("status {status}: {body}"),
                })
            }
        }
    }
}
