use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::utils::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://linux.do/";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const CF_INTERSTITIAL_TITLE: &str = "<title>Just a moment...</title>";

#[derive(Debug, Deserialize)]
struct CsrfResponse {
    csrf: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    error: Option<String>,
}

/// Cookie-backed HTTP session against the Discourse login API.
///
/// Login is a two-step dance: fetch a CSRF token from `/session/csrf`,
/// then POST the credential form to `/session`. The cookie jar collects
/// whatever the server sets so it can be synced into the browser.
pub struct ForumSession {
    client: Client,
    jar: Arc<Jar>,
    base: Url,
}

impl ForumSession {
    pub fn new() -> Result<Self, AppError> {
        Self::with_base(DEFAULT_BASE_URL)
    }

    pub fn with_base(base: &str) -> Result<Self, AppError> {
        Self::with_base_and_timeout(base, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_base_and_timeout(base: &str, timeout: Duration) -> Result<Self, AppError> {
        let base = Url::parse(base)?;
        let jar = Arc::new(Jar::default());

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
        );

        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(DESKTOP_UA)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, jar, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Split a raw cookie header string ("k=v; k2=v2") into pairs.
    ///
    /// Segments without an `=` are ignored; values may themselves
    /// contain `=`, only the first one separates name from value.
    pub fn parse_cookie_str(raw: &str) -> Vec<(String, String)> {
        raw.split(';')
            .filter_map(|segment| {
                let (name, value) = segment.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().to_string()))
            })
            .collect()
    }

    /// Seed the jar with cookies from a raw cookie header string.
    pub fn install_cookies(&self, raw: &str) {
        let domain = self.cookie_domain();
        for (name, value) in Self::parse_cookie_str(raw) {
            let cookie = match &domain {
                Some(d) => format!("{name}={value}; Domain={d}; Path=/"),
                None => format!("{name}={value}; Path=/"),
            };
            self.jar.add_cookie_str(&cookie, &self.base);
        }
    }

    /// Export the jar as name/value pairs for syncing into the browser.
    pub fn cookie_pairs(&self) -> Vec<(String, String)> {
        match self.jar.cookies(&self.base) {
            Some(header) => Self::parse_cookie_str(header.to_str().unwrap_or_default()),
            None => Vec::new(),
        }
    }

    // Domain attribute so cookies cover subdomains (connect.linux.do).
    // IP hosts (tests) get host-only cookies instead.
    fn cookie_domain(&self) -> Option<String> {
        match self.base.host() {
            Some(url::Host::Domain(d)) => Some(d.to_string()),
            _ => None,
        }
    }

    /// Fetch the CSRF token required by the login endpoint.
    pub async fn fetch_csrf(&self) -> Result<String, AppError> {
        let url = self.base.join("session/csrf")?;
        let referer = self.base.join("login")?;

        let resp = self
            .client
            .get(url)
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Referer", referer.as_str())
            .send()
            .await?;

        if resp.status() == StatusCode::FORBIDDEN {
            return Err(AppError::Login(
                "blocked by Cloudflare (403); configure LINUXDO_COOKIE to skip the login API"
                    .to_string(),
            ));
        }

        let body = resp.text().await?;
        if body.contains(CF_INTERSTITIAL_TITLE) {
            return Err(AppError::Login(
                "got a Cloudflare interstitial; configure LINUXDO_COOKIE to skip the login API"
                    .to_string(),
            ));
        }

        let parsed: CsrfResponse = serde_json::from_str(&body)?;
        debug!("obtained CSRF token");
        Ok(parsed.csrf)
    }

    /// Credential login via the Discourse session endpoint.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AppError> {
        let csrf = self.fetch_csrf().await?;
        let url = self.base.join("session")?;
        let referer = self.base.join("login")?;

        let form = [
            ("login", username),
            ("password", password),
            ("second_factor_method", "1"),
            ("timezone", "Asia/Shanghai"),
        ];

        let resp = self
            .client
            .post(url)
            .header("X-CSRF-Token", csrf)
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Referer", referer.as_str())
            .header("Origin", self.base.origin().ascii_serialization())
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Login(format!(
                "login API returned status {status}"
            )));
        }

        let body: LoginResponse = resp.json().await?;
        if let Some(error) = body.error {
            return Err(AppError::Login(error));
        }

        Ok(())
    }

    /// Plain HTML GET over the authenticated session.
    pub async fn get_html(&self, url: &str) -> Result<String, AppError> {
        let resp = self
            .client
            .get(url)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await?;
        Ok(resp.error_for_status()?.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_str_basic() {
        let pairs = ForumSession::parse_cookie_str("_t=abc; _forum_session=xyz");
        assert_eq!(
            pairs,
            vec![
                ("_t".to_string(), "abc".to_string()),
                ("_forum_session".to_string(), "xyz".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_cookie_str_value_with_equals() {
        let pairs = ForumSession::parse_cookie_str("token=a=b=c");
        assert_eq!(pairs, vec![("token".to_string(), "a=b=c".to_string())]);
    }

    #[test]
    fn test_parse_cookie_str_skips_malformed_segments() {
        let pairs = ForumSession::parse_cookie_str("novalue; _t=abc; ; =orphan");
        assert_eq!(pairs, vec![("_t".to_string(), "abc".to_string())]);
    }

    #[test]
    fn test_parse_cookie_str_empty() {
        assert!(ForumSession::parse_cookie_str("").is_empty());
        assert!(ForumSession::parse_cookie_str("   ").is_empty());
    }

    #[test]
    fn test_install_and_export_roundtrip() {
        let session = ForumSession::new().unwrap();
        session.install_cookies("_t=abc; _forum_session=xyz");

        let mut pairs = session.cookie_pairs();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("_forum_session".to_string(), "xyz".to_string()),
                ("_t".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn test_cookie_pairs_empty_jar() {
        let session = ForumSession::new().unwrap();
        assert!(session.cookie_pairs().is_empty());
    }

    #[test]
    fn test_with_base_rejects_garbage() {
        assert!(ForumSession::with_base("not a url").is_err());
    }
}
