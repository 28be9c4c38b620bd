use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::retry::RetryPolicy;

/// Outcome of a completed check-in run, handed to every notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinEvent {
    pub username: String,
    pub browse_completed: bool,
    pub timestamp: DateTime<Utc>,
}

impl CheckinEvent {
    pub fn new(username: impl Into<String>, browse_completed: bool) -> Self {
        Self {
            username: username.into(),
            browse_completed,
            timestamp: Utc::now(),
        }
    }

    pub fn title(&self) -> &'static str {
        "LINUX DO"
    }

    pub fn message(&self) -> String {
        let mut msg = format!("Daily check-in succeeded: {}", self.username);
        if self.browse_completed {
            msg.push_str(" (browse task completed)");
        }
        msg
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotifyResult {
    /// Response body snippet from the push service, when it returns one.
    pub detail: Option<String>,
}

/// Trait for implementing push-notification channels (Gotify, ServerChan, etc.)
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name used in logs.
    fn name(&self) -> &str;

    /// Retry behavior for this channel. Most channels get one shot;
    /// rate-limited services override this.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::none()
    }

    async fn notify(
        &self,
        event: &CheckinEvent,
    ) -> Result<NotifyResult, Box<dyn std::error::Error + Send + Sync>>;
}
