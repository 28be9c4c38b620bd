use tracing::{error, info};

use super::notifiers::{GotifyNotifier, ServerChanNotifier, WxPushNotifier};
use super::traits::{CheckinEvent, Notifier};
use crate::config::NotificationsConfig;

pub type NotifierBox = Box<dyn Notifier>;

/// Holds the configured notification channels and fans an event out to
/// all of them. Channels without configuration are skipped at build
/// time; delivery failures are logged and swallowed.
pub struct NotifierManager {
    notifiers: Vec<NotifierBox>,
}

impl NotifierManager {
    pub fn new() -> Self {
        Self {
            notifiers: Vec::new(),
        }
    }

    pub fn register(&mut self, notifier: NotifierBox) {
        self.notifiers.push(notifier);
    }

    /// Build the notifier set from config, skipping unconfigured channels.
    pub fn from_config(config: &NotificationsConfig) -> Self {
        let mut manager = Self::new();

        match GotifyNotifier::from_config(&config.gotify) {
            Some(n) => manager.register(Box::new(n)),
            None => info!("Gotify not configured, skipping"),
        }

        match ServerChanNotifier::from_config(&config.serverchan) {
            Some(n) => manager.register(Box::new(n)),
            None => info!("ServerChan not configured, skipping"),
        }

        match WxPushNotifier::from_config(&config.wxpush) {
            Some(n) => manager.register(Box::new(n)),
            None => info!("WxPush not configured, skipping"),
        }

        manager
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    /// Deliver the event to every channel under its retry policy.
    /// Terminal failures are logged, never propagated.
    pub async fn dispatch(&self, event: &CheckinEvent) {
        for notifier in &self.notifiers {
            let name = notifier.name();
            let policy = notifier.retry_policy();
            match policy.run(name, || notifier.notify(event)).await {
                Ok(result) => match result.detail {
                    Some(detail) => info!("notification sent via {}: {}", name, detail),
                    None => info!("notification sent via {}", name),
                },
                Err(e) => error!("notification via {} abandoned: {}", name, e),
            }
        }
    }
}

impl Default for NotifierManager {
    fn default() -> Self {
        Self::new()
    }
}
