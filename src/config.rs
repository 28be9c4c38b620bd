use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub credentials: CredentialsConfig,
    pub browse: BrowseConfig,
    pub browser: BrowserConfig,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CredentialsConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Raw cookie header string ("k=v; k2=v2"), the recommended login mode.
    pub cookie: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseConfig {
    pub enabled: bool,
    /// How many topics to open per run.
    pub topic_sample: usize,
    /// Maximum scroll iterations per topic.
    pub max_scrolls: u32,
    pub like_probability: f64,
    /// Chance per scroll of abandoning the topic early.
    pub abandon_probability: f64,
    pub min_scroll_px: u32,
    pub max_scroll_px: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub chrome_path: Option<String>,
    /// Overrides the platform-derived user agent when set.
    pub user_agent: Option<String>,
    /// Settle time after loading the home page, in seconds.
    pub page_load_wait: u64,
    /// Settle time after a fresh credential login, in seconds. Longer
    /// than `page_load_wait` since the first authenticated page load
    /// is the slow one.
    pub login_load_wait: u64,
    /// HTTP request timeout for the forum session, in seconds.
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NotificationsConfig {
    pub gotify: GotifyConfig,
    pub serverchan: ServerChanConfig,
    pub wxpush: WxPushConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GotifyConfig {
    pub url: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerChanConfig {
    pub push_key: Option<String>,
    /// ServerChan pushes retry hard; the service rate-limits aggressively.
    pub retry_attempts: u32,
    pub retry_min_delay_secs: u64,
    pub retry_max_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WxPushConfig {
    pub url: Option<String>,
    pub token: Option<String>,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            topic_sample: 10,
            max_scrolls: 10,
            like_probability: 0.3,
            abandon_probability: 0.03,
            min_scroll_px: 550,
            max_scroll_px: 650,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            user_agent: None,
            page_load_wait: 3,
            login_load_wait: 5,
            request_timeout: 20,
        }
    }
}

impl Default for ServerChanConfig {
    fn default() -> Self {
        Self {
            push_key: None,
            retry_attempts: 5,
            retry_min_delay_secs: 180,
            retry_max_delay_secs: 360,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "CHECKIN_"
            .add_source(
                Environment::with_prefix("CHECKIN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;
        config.apply_overrides(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()));
        config.validate()?;
        Ok(config)
    }

    /// Apply the well-known environment variable names the tool has
    /// always honored, on top of whatever the layered config produced.
    pub fn apply_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("LINUXDO_USERNAME").or_else(|| get("USERNAME")) {
            self.credentials.username = Some(v);
        }
        if let Some(v) = get("LINUXDO_PASSWORD").or_else(|| get("PASSWORD")) {
            self.credentials.password = Some(v);
        }
        if let Some(v) = get("LINUXDO_COOKIE") {
            self.credentials.cookie = Some(v);
        }
        if let Some(v) = get("BROWSE_ENABLED") {
            self.browse.enabled = parse_flag(&v);
        }
        if let Some(v) = get("CHROME_PATH") {
            self.browser.chrome_path = Some(v);
        }
        if let Some(v) = get("GOTIFY_URL") {
            self.notifications.gotify.url = Some(v);
        }
        if let Some(v) = get("GOTIFY_TOKEN") {
            self.notifications.gotify.token = Some(v);
        }
        if let Some(v) = get("SC3_PUSH_KEY") {
            self.notifications.serverchan.push_key = Some(v);
        }
        if let Some(v) = get("WXPUSH_URL") {
            self.notifications.wxpush.url = Some(v);
        }
        if let Some(v) = get("WXPUSH_TOKEN") {
            self.notifications.wxpush.token = Some(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.credentials.has_cookie() && !self.credentials.has_password_pair() {
            return Err(ConfigError::Message(
                "no credentials configured; set LINUXDO_COOKIE or LINUXDO_USERNAME/LINUXDO_PASSWORD"
                    .into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.browse.like_probability) {
            return Err(ConfigError::Message(
                "browse.like_probability must be between 0 and 1".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.browse.abandon_probability) {
            return Err(ConfigError::Message(
                "browse.abandon_probability must be between 0 and 1".into(),
            ));
        }

        if self.browse.topic_sample == 0 {
            return Err(ConfigError::Message(
                "browse.topic_sample must be greater than 0".into(),
            ));
        }

        if self.browse.min_scroll_px > self.browse.max_scroll_px {
            return Err(ConfigError::Message(
                "browse.min_scroll_px cannot exceed browse.max_scroll_px".into(),
            ));
        }

        if let Some(url) = &self.notifications.gotify.url {
            if Url::parse(url).is_err() {
                return Err(ConfigError::Message("Invalid Gotify URL format".into()));
            }
        }

        if let Some(url) = &self.notifications.wxpush.url {
            if Url::parse(url).is_err() {
                return Err(ConfigError::Message("Invalid WxPush URL format".into()));
            }
        }

        if self.notifications.serverchan.retry_attempts == 0 {
            return Err(ConfigError::Message(
                "notifications.serverchan.retry_attempts must be greater than 0".into(),
            ));
        }

        if self.notifications.serverchan.retry_min_delay_secs
            > self.notifications.serverchan.retry_max_delay_secs
        {
            return Err(ConfigError::Message(
                "notifications.serverchan.retry_min_delay_secs cannot exceed retry_max_delay_secs"
                    .into(),
            ));
        }

        Ok(())
    }
}

impl CredentialsConfig {
    pub fn has_cookie(&self) -> bool {
        self.cookie.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    pub fn has_password_pair(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
            && self.password.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Display name used in notification messages.
    pub fn display_name(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| "cookie-session".to_string())
    }
}

/// "false", "0" and "off" (case- and whitespace-insensitive) disable a flag.
fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "false" | "0" | "off"
    )
}
