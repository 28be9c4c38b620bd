use anyhow::{anyhow, Result};
use headless_chrome::protocol::cdp::Network::CookieParam;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use rand::Rng;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{BrowseConfig, BrowserConfig};

const LIKE_BUTTON_SELECTOR: &str = ".discourse-reactions-reaction-button";
const TOPIC_LINK_SELECTOR: &str = "#list-area a.title";

/// User agent matching the platform the tool actually runs on, so the
/// browser fingerprint stays consistent with the Chrome build.
pub fn platform_user_agent() -> String {
    let platform = match std::env::consts::OS {
        "macos" => "Macintosh; Intel Mac OS X 10_15_7",
        "windows" => "Windows NT 10.0; Win64; x64",
        _ => "X11; Linux x86_64",
    };
    format!(
        "Mozilla/5.0 ({platform}) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/130.0.0.0 Safari/537.36"
    )
}

/// Headless Chrome wrapper for the check-in flow: login verification
/// and human-paced topic browsing.
pub struct CheckinBrowser {
    browser: Browser,
    tab: Arc<Tab>,
    browse: BrowseConfig,
    base: Url,
}

impl CheckinBrowser {
    pub fn launch(config: &BrowserConfig, browse: &BrowseConfig, base: Url) -> Result<Self> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false) // Often needed in containerized environments
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
                std::ffi::OsStr::new("--incognito"),
            ])
            .build()
            .map_err(|e| anyhow!("Failed to create launch options: {}", e))?;

        // Set Chrome path if provided
        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser =
            Browser::new(launch_options).map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        let tab = browser
            .new_tab()
            .map_err(|e| anyhow!("Failed to create tab: {}", e))?;

        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(platform_user_agent);
        tab.set_user_agent(&user_agent, None, None)
            .map_err(|e| anyhow!("Failed to set user agent: {}", e))?;

        Ok(Self {
            browser,
            tab,
            browse: browse.clone(),
            base,
        })
    }

    /// Install session cookies so the rendered pages are authenticated.
    pub fn import_cookies(&self, pairs: &[(String, String)]) -> Result<()> {
        let domain = self
            .base
            .host_str()
            .map(|h| format!(".{h}"))
            .unwrap_or_else(|| ".linux.do".to_string());

        let cookies: Vec<CookieParam> = pairs
            .iter()
            .map(|(name, value)| CookieParam {
                name: name.clone(),
                value: value.clone(),
                url: None,
                domain: Some(domain.clone()),
                path: Some("/".to_string()),
                secure: None,
                http_only: None,
                same_site: None,
                expires: None,
                priority: None,
                same_party: None,
                source_scheme: None,
                source_port: None,
                partition_key: None,
            })
            .collect();

        self.tab
            .set_cookies(cookies)
            .map_err(|e| anyhow!("Failed to set browser cookies: {}", e))?;
        debug!("installed {} cookie(s) into the browser", pairs.len());
        Ok(())
    }

    /// Navigate to the forum home page and give it time to settle.
    pub async fn open_home(&self, settle: Duration) -> Result<()> {
        self.tab
            .navigate_to(self.base.as_str())
            .map_err(|e| anyhow!("Navigation failed: {}", e))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| anyhow!("Page load failed: {}", e))?;
        tokio::time::sleep(settle).await;
        Ok(())
    }

    /// Check for the logged-in header element, falling back to a crude
    /// HTML search for the avatar markup.
    pub fn is_logged_in(&self) -> bool {
        if self.tab.find_element("#current-user").is_ok() {
            info!("login verified (found #current-user)");
            return true;
        }
        match self.tab.get_content() {
            Ok(html) if html.contains("avatar") => {
                info!("login verified (found avatar markup)");
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!("could not read page content for login check: {}", e);
                false
            }
        }
    }

    /// Topic links currently visible in the home page list area.
    pub fn topic_urls(&self) -> Result<Vec<String>> {
        let html = self
            .tab
            .get_content()
            .map_err(|e| anyhow!("Failed to get page content: {}", e))?;
        extract_topic_urls(&html, &self.base)
    }

    /// Open a topic in its own tab and browse it like a human would.
    /// The tab is closed even when browsing fails.
    pub async fn visit_topic(&self, topic_url: &str) -> Result<()> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| anyhow!("Failed to create tab: {}", e))?;

        let result = self.browse_topic(&tab, topic_url).await;
        let _ = tab.close(true);
        result
    }

    async fn browse_topic(&self, tab: &Arc<Tab>, topic_url: &str) -> Result<()> {
        tab.navigate_to(topic_url)
            .map_err(|e| anyhow!("Navigation to {} failed: {}", topic_url, e))?;
        tab.wait_until_navigated()
            .map_err(|e| anyhow!("Topic page load failed: {}", e))?;

        if rand::rng().random_bool(self.browse.like_probability) {
            self.click_like(tab).await;
        }

        self.scroll_through(tab).await
    }

    /// Click the first unreacted like button, if any.
    async fn click_like(&self, tab: &Arc<Tab>) {
        match tab.find_element(LIKE_BUTTON_SELECTOR) {
            Ok(button) => match button.click() {
                Ok(_) => {
                    info!("liked the topic");
                    let pause = rand::rng().random_range(1000..=2000);
                    tokio::time::sleep(Duration::from_millis(pause)).await;
                }
                Err(e) => warn!("like click failed: {}", e),
            },
            Err(_) => debug!("no like button found, topic may already be liked"),
        }
    }

    /// Scroll in randomized increments with randomized waits, stopping
    /// at the page bottom or on a random early exit.
    async fn scroll_through(&self, tab: &Arc<Tab>) -> Result<()> {
        let mut prev_url: Option<String> = None;

        for _ in 0..self.browse.max_scrolls {
            let distance = rand::rng().random_range(self.browse.min_scroll_px..=self.browse.max_scroll_px);
            debug!("scrolling down {} px", distance);
            tab.evaluate(&format!("window.scrollBy(0, {distance})"), false)
                .map_err(|e| anyhow!("Scroll failed: {}", e))?;

            if rand::rng().random_bool(self.browse.abandon_probability) {
                info!("abandoning topic early");
                break;
            }

            let at_bottom = tab
                .evaluate(
                    "window.scrollY + window.innerHeight >= document.body.scrollHeight",
                    false,
                )
                .ok()
                .and_then(|r| r.value)
                .and_then(|v| v.as_bool())
                .unwrap_or(false);

            let current_url = tab.get_url();
            if prev_url.as_deref() != Some(current_url.as_str()) {
                prev_url = Some(current_url);
            } else if at_bottom {
                info!("reached the bottom of the topic");
                break;
            }

            let wait = rand::rng().random_range(2000..=4000);
            debug!("waiting {:.2}s", wait as f64 / 1000.0);
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }

        Ok(())
    }

    /// Capture a full-page screenshot for debugging failed login runs.
    pub fn save_debug_screenshot(&self) -> Result<std::path::PathBuf> {
        let screenshot_data = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| anyhow!("Screenshot capture failed: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("login_failure_{timestamp}.png");
        let path = std::path::Path::new("data/screenshots").join(&filename);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow!("Failed to create screenshot directory: {}", e))?;
        }

        std::fs::write(&path, screenshot_data)
            .map_err(|e| anyhow!("Failed to write screenshot: {}", e))?;

        Ok(path)
    }
}

/// Extract topic links from the rendered home page HTML.
pub fn extract_topic_urls(html: &str, base: &Url) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(TOPIC_LINK_SELECTOR)
        .map_err(|e| anyhow!("Invalid CSS selector '{}': {:?}", TOPIC_LINK_SELECTOR, e))?;

    let mut urls = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        let resolved = resolved.to_string();
        if !urls.contains(&resolved) {
            urls.push(resolved);
        }
    }

    Ok(urls)
}
