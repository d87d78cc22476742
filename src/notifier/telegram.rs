//! Telegram Bot API notifier.
//!
//! Posts alerts to `sendMessage` for a single chat. When the token or chat id
//! is missing the notifier is disabled and only logs what it would have sent.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::NotifyError;
use crate::notifier::Notifier;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Escape the three characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Debug)]
struct BotTarget {
    token: String,
    chat_id: String,
}

#[derive(Debug)]
pub struct TelegramNotifier {
    target: Option<BotTarget>,
    api_url: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn from_config(
        token: Option<String>,
        chat_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let target = match (token, chat_id) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Some(BotTarget { token, chat_id })
            }
            _ => {
                info!("Telegram bot not configured, alerts will be logged only");
                None
            }
        };

        Ok(Self { target, api_url: TELEGRAM_API_URL.to_string(), client })
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let Some(target) = &self.target else {
            info!(channel = "telegram", "ALERT (not sent, bot disabled):\n{message}");
            return Ok(());
        };

        let url = format!("{}/bot{}/sendMessage", self.api_url, target.token);
        let body = serde_json::json!({
            "chat_id": target.chat_id,
            "text": escape_html(message),
            "parse_mode": "HTML",
            "disable_web_page_preview": false,
        });

        debug!(chat_id = %target.chat_id, "Sending Telegram alert");

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let resp_body: serde_json::Value = response.json().await?;

        if resp_body.get("ok") == Some(&serde_json::Value::Bool(true)) {
            info!(chat_id = %target.chat_id, "Telegram alert sent");
            return Ok(());
        }

        let description = resp_body
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown Telegram API error");
        Err(NotifyError::Api(format!("HTTP {status}: {description}")))
    }

    fn channel_name(&self) -> &str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout() -> Duration {
        Duration::from_secs(5)
    }

    #[test]
    fn escapes_html_markup() {
        assert_eq!(escape_html("Tom & Jerry <2-pack>"), "Tom &amp; Jerry &lt;2-pack&gt;");
        assert_eq!(escape_html("plain ₹999"), "plain ₹999");
    }

    #[tokio::test]
    async fn disabled_bot_is_a_successful_noop() {
        let notifier = TelegramNotifier::from_config(None, None, timeout()).unwrap();
        assert!(!notifier.is_enabled());
        assert!(notifier.send("price dropped").await.is_ok());
    }

    #[test]
    fn needs_both_token_and_chat_id() {
        let only_token =
            TelegramNotifier::from_config(Some("123:ABC".into()), None, timeout()).unwrap();
        assert!(!only_token.is_enabled());

        let blank_chat = TelegramNotifier::from_config(
            Some("123:ABC".into()),
            Some(String::new()),
            timeout(),
        )
        .unwrap();
        assert!(!blank_chat.is_enabled());

        let both = TelegramNotifier::from_config(
            Some("123:ABC".into()),
            Some("-100123".into()),
            timeout(),
        )
        .unwrap();
        assert!(both.is_enabled());
        assert_eq!(both.channel_name(), "telegram");
    }
}
