use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::error;

use crate::config::ServerChanConfig;
use crate::plugins::traits::{CheckinEvent, Notifier, NotifyResult};
use crate::utils::retry::RetryPolicy;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// ServerChan³ push: GET `https://{uid}.push.ft07.com/send/{key}`.
///
/// The UID is embedded in the SendKey (`sct{uid}t...`); a key that does
/// not match the format disables this channel only.
pub struct ServerChanNotifier {
    client: Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl ServerChanNotifier {
    pub fn from_config(config: &ServerChanConfig) -> Option<Self> {
        let key = config.push_key.as_deref()?;
        let Some(endpoint) = Self::endpoint_for(key) else {
            error!("SC3_PUSH_KEY has an invalid format (no UID); ServerChan push disabled");
            return None;
        };

        let retry = RetryPolicy::new(
            config.retry_attempts,
            Duration::from_secs(config.retry_min_delay_secs),
            Duration::from_secs(config.retry_max_delay_secs),
        );
        Some(Self::with_endpoint(endpoint, retry))
    }

    pub fn with_endpoint(endpoint: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            retry,
        }
    }

    /// Extract the numeric UID from a SendKey (`sct{uid}t...`, case-insensitive).
    pub fn parse_send_key(key: &str) -> Option<String> {
        let re = Regex::new(r"(?i)^sct(\d+)t").ok()?;
        re.captures(key)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn endpoint_for(key: &str) -> Option<String> {
        let uid = Self::parse_send_key(key)?;
        Some(format!("https://{uid}.push.ft07.com/send/{key}"))
    }
}

#[async_trait]
impl Notifier for ServerChanNotifier {
    fn name(&self) -> &str {
        "serverchan"
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    async fn notify(
        &self,
        event: &CheckinEvent,
    ) -> Result<NotifyResult, Box<dyn std::error::Error + Send + Sync>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("title", event.title()), ("desp", &event.message())])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let body = response.error_for_status()?.text().await?;
        Ok(NotifyResult { detail: Some(body) })
    }
}
