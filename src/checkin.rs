use anyhow::{bail, Result};
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

use crate::browser::CheckinBrowser;
use crate::config::AppConfig;
use crate::connect;
use crate::plugins::{CheckinEvent, NotifierManager};
use crate::session::{ForumSession, DEFAULT_BASE_URL};
use crate::utils::retry::RetryPolicy;

/// Sequential check-in run: login, connect report, browse, notify.
pub struct CheckinRunner {
    config: AppConfig,
    skip_notify: bool,
}

/// How a run ends once the login and browse phases have settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDecision {
    /// Proceed to notification dispatch.
    Notify { browse_completed: bool },
    /// Stop without notifying.
    Abort,
}

/// Maps the phase results onto the continue/abort decision. A failed
/// login is only a warning (browsing fails on its own if the session
/// really is unusable), while a failed browse phase aborts the run
/// before any notification goes out. `browse` is `None` when browsing
/// is disabled.
pub fn decide_run(login_ok: bool, browse: Option<bool>) -> RunDecision {
    match (login_ok, browse) {
        (_, Some(false)) => RunDecision::Abort,
        (_, Some(true)) => RunDecision::Notify {
            browse_completed: true,
        },
        (_, None) => RunDecision::Notify {
            browse_completed: false,
        },
    }
}

impl CheckinRunner {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            skip_notify: false,
        }
    }

    pub fn skip_notifications(mut self, skip: bool) -> Self {
        self.skip_notify = skip;
        self
    }

    pub async fn run(&self) -> Result<()> {
        let base = Url::parse(DEFAULT_BASE_URL)?;
        let mut session = self.new_session()?;
        let browser = CheckinBrowser::launch(&self.config.browser, &self.config.browse, base)?;

        let logged_in = self.login(&mut session, &browser).await;
        if logged_in {
            self.print_connect_info(&session).await;
        } else {
            warn!("login verification failed");
        }

        let browse_outcome = if self.config.browse.enabled {
            match self.browse_topics(&browser).await {
                Ok(()) => {
                    info!("browse task finished");
                    Some(true)
                }
                Err(e) => {
                    error!("topic browsing failed, aborting run: {e}");
                    Some(false)
                }
            }
        } else {
            None
        };

        let browse_completed = match decide_run(logged_in, browse_outcome) {
            RunDecision::Abort => return Ok(()),
            RunDecision::Notify { browse_completed } => browse_completed,
        };

        if self.skip_notify {
            info!("notification dispatch skipped");
            return Ok(());
        }

        let manager = NotifierManager::from_config(&self.config.notifications);
        if manager.is_empty() {
            info!("no notification channels configured");
            return Ok(());
        }

        let event = CheckinEvent::new(self.config.credentials.display_name(), browse_completed);
        manager.dispatch(&event).await;
        Ok(())
    }

    fn new_session(&self) -> crate::Result<ForumSession> {
        ForumSession::with_base_and_timeout(
            DEFAULT_BASE_URL,
            Duration::from_secs(self.config.browser.request_timeout),
        )
    }

    /// Cookie login first (it sidesteps the login API entirely), then
    /// the CSRF + credential form as a fallback. The credential path
    /// gets a longer settle wait: a fresh login lands on a heavier
    /// first page load than a warm cookie session does.
    async fn login(&self, session: &mut ForumSession, browser: &CheckinBrowser) -> bool {
        let cookie_settle = Duration::from_secs(self.config.browser.page_load_wait);
        let login_settle = Duration::from_secs(self.config.browser.login_load_wait);

        let cookie = self
            .config
            .credentials
            .cookie
            .clone()
            .filter(|c| !c.trim().is_empty());

        if let Some(cookie) = cookie {
            info!("cookie configured, trying cookie login");
            session.install_cookies(&cookie);
            match self.verify_in_browser(session, browser, cookie_settle).await {
                Ok(true) => return true,
                Ok(false) => {
                    warn!("cookie is invalid or expired, falling back to credential login")
                }
                Err(e) => warn!("cookie login verification failed: {e}"),
            }

            // Fresh jar so stale cookies cannot leak into the form login.
            match self.new_session() {
                Ok(fresh) => *session = fresh,
                Err(e) => {
                    error!("could not reset the HTTP session: {e}");
                    return false;
                }
            }
        }

        let (Some(username), Some(password)) = (
            self.config.credentials.username.as_deref(),
            self.config.credentials.password.as_deref(),
        ) else {
            warn!("no username/password configured for fallback login");
            return false;
        };

        info!("logging in with credentials");
        if let Err(e) = session.login(username, password).await {
            error!("credential login failed: {e}");
            return false;
        }

        info!("login API succeeded, syncing cookies into the browser");
        match self.verify_in_browser(session, browser, login_settle).await {
            Ok(true) => true,
            Ok(false) => {
                if let Ok(path) = browser.save_debug_screenshot() {
                    warn!("login not visible in browser, screenshot saved to {}", path.display());
                }
                false
            }
            Err(e) => {
                warn!("login verification failed: {e}");
                false
            }
        }
    }

    async fn verify_in_browser(
        &self,
        session: &ForumSession,
        browser: &CheckinBrowser,
        settle: Duration,
    ) -> Result<bool> {
        browser.import_cookies(&session.cookie_pairs())?;
        browser.open_home(settle).await?;
        Ok(browser.is_logged_in())
    }

    async fn print_connect_info(&self, session: &ForumSession) {
        match connect::fetch_connect_info(session, connect::CONNECT_URL).await {
            Ok(rows) if rows.is_empty() => info!("connect page returned no rows"),
            Ok(rows) => {
                println!("--------------Connect Info-----------------");
                print!("{}", connect::render_table(&rows));
            }
            Err(e) => warn!("could not fetch connect info: {e}"),
        }
    }

    async fn browse_topics(&self, browser: &CheckinBrowser) -> Result<()> {
        let topics = browser.topic_urls()?;
        if topics.is_empty() {
            bail!("no topics found on the home page");
        }

        let picked = sample_topics(&topics, self.config.browse.topic_sample);
        info!("found {} topics, visiting {}", topics.len(), picked.len());

        let policy = RetryPolicy::default();
        for topic_url in &picked {
            if let Err(e) = policy.run("visit_topic", || browser.visit_topic(topic_url)).await {
                warn!("giving up on topic {topic_url}: {e}");
            }
        }

        Ok(())
    }
}

/// Pick up to `n` distinct topics at random, clamped to what is available.
pub fn sample_topics(topics: &[String], n: usize) -> Vec<String> {
    let amount = n.min(topics.len());
    rand::seq::index::sample(&mut rand::rng(), topics.len(), amount)
        .into_iter()
        .map(|i| topics[i].clone())
        .collect()
}
