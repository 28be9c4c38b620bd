use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::config::GotifyConfig;
use crate::plugins::traits::{CheckinEvent, Notifier, NotifyResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Gotify push: POST `{url}/message?token={token}` with a JSON body.
pub struct GotifyNotifier {
    client: Client,
    url: String,
    token: String,
}

impl GotifyNotifier {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Returns `None` when the server URL or token is not configured.
    pub fn from_config(config: &GotifyConfig) -> Option<Self> {
        match (&config.url, &config.token) {
            (Some(url), Some(token)) => Some(Self::new(url, token)),
            _ => None,
        }
    }
}

#[async_trait]
impl Notifier for GotifyNotifier {
    fn name(&self) -> &str {
        "gotify"
    }

    async fn notify(
        &self,
        event: &CheckinEvent,
    ) -> Result<NotifyResult, Box<dyn std::error::Error + Send + Sync>> {
        let response = self
            .client
            .post(format!("{}/message", self.url))
            .query(&[("token", self.token.as_str())])
            .json(&json!({
                "title": event.title(),
                "message": event.message(),
                "priority": 1,
            }))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        response.error_for_status()?;
        Ok(NotifyResult::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_both_fields() {
        let mut config = GotifyConfig::default();
        assert!(GotifyNotifier::from_config(&config).is_none());

        config.url = Some("https://gotify.example.com".to_string());
        assert!(GotifyNotifier::from_config(&config).is_none());

        config.token = Some("tok".to_string());
        assert!(GotifyNotifier::from_config(&config).is_some());
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let notifier = GotifyNotifier::new("https://gotify.example.com/", "tok");
        assert_eq!(notifier.url, "https://gotify.example.com");
    }
}
