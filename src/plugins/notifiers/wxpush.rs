use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::config::WxPushConfig;
use crate::plugins::traits::{CheckinEvent, Notifier, NotifyResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// WxPush: POST `{url}/wxsend` with the token as an `Authorization` header.
pub struct WxPushNotifier {
    client: Client,
    url: String,
    token: String,
}

impl WxPushNotifier {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Returns `None` when the server URL or token is not configured.
    pub fn from_config(config: &WxPushConfig) -> Option<Self> {
        match (&config.url, &config.token) {
            (Some(url), Some(token)) => Some(Self::new(url, token)),
            _ => None,
        }
    }
}

#[async_trait]
impl Notifier for WxPushNotifier {
    fn name(&self) -> &str {
        "wxpush"
    }

    async fn notify(
        &self,
        event: &CheckinEvent,
    ) -> Result<NotifyResult, Box<dyn std::error::Error + Send + Sync>> {
        let response = self
            .client
            .post(format!("{}/wxsend", self.url))
            .header("Authorization", &self.token)
            .json(&json!({
                "title": event.title(),
                "content": event.message(),
            }))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let body = response.error_for_status()?.text().await?;
        Ok(NotifyResult { detail: Some(body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_both_fields() {
        let mut config = WxPushConfig::default();
        assert!(WxPushNotifier::from_config(&config).is_none());

        config.url = Some("https://push.example.com".to_string());
        assert!(WxPushNotifier::from_config(&config).is_none());

        config.token = Some("tok".to_string());
        assert!(WxPushNotifier::from_config(&config).is_some());
    }
}
