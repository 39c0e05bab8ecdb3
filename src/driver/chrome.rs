use crate::config::Action;
use crate::driver::{Driver, DriverError, DriverResource, Session};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task;

/// Hardening flags carried over from the headless deployments this harness
/// targets, plus image suppression to cut response-time variance.
const CHROME_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--no-first-run",
    "--disable-blink-features=AutomationControlled",
    "--blink-settings=imagesEnabled=false",
];

/// Pooled browsers sit idle between batches; keep the transport watchdog
/// from reaping them.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(86_400);

/// Launches headless Chromium processes. All CDP calls are blocking, so every
/// trait method hops through `spawn_blocking`.
#[derive(Debug, Default)]
pub struct ChromeDriver;

impl ChromeDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for ChromeDriver {
    async fn launch(&self) -> Result<Box<dyn DriverResource>, DriverError> {
        let browser = task::spawn_blocking(|| -> std::result::Result<Browser, String> {
            let options = LaunchOptions::default_builder()
                .headless(true)
                .sandbox(false)
                .args(CHROME_ARGS.iter().map(OsStr::new).collect())
                .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
                .build()
                .map_err(|e| e.to_string())?;
            Browser::new(options).map_err(|e| format!("{e:#}"))
        })
        .await
        .map_err(|e| DriverError::Launch(e.to_string()))?
        .map_err(DriverError::Launch)?;

        Ok(Box::new(ChromeResource {
            browser: Mutex::new(Some(Arc::new(browser))),
        }))
    }
}

pub struct ChromeResource {
    browser: Mutex<Option<Arc<Browser>>>,
}

impl ChromeResource {
    fn handle(&self) -> Result<Arc<Browser>, DriverError> {
        self.browser
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| DriverError::Session("browser already closed".to_string()))
    }
}

#[async_trait]
impl DriverResource for ChromeResource {
    async fn new_session(&self) -> Result<Box<dyn Session>, DriverError> {
        let browser = self.handle()?;
        let tab = task::spawn_blocking(move || browser.new_tab().map_err(|e| format!("{e:#}")))
            .await
            .map_err(|e| DriverError::Session(e.to_string()))?
            .map_err(DriverError::Session)?;

        Ok(Box::new(ChromeSession { tab }))
    }

    async fn close(&self) -> Result<(), DriverError> {
        let browser = self.browser.lock().unwrap().take();
        if let Some(browser) = browser {
            // Dropping the last handle tears down the Chromium process.
            task::spawn_blocking(move || drop(browser))
                .await
                .map_err(|e| DriverError::Session(e.to_string()))?;
        }
        Ok(())
    }
}

pub struct ChromeSession {
    tab: Arc<Tab>,
}

#[async_trait]
impl Session for ChromeSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        let tab = self.tab.clone();
        let url = url.to_string();
        task::spawn_blocking(move || -> std::result::Result<(), String> {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url).map_err(|e| format!("{e:#}"))?;
            tab.wait_until_navigated().map_err(|e| format!("{e:#}"))?;
            Ok(())
        })
        .await
        .map_err(|e| DriverError::Navigation(e.to_string()))?
        .map_err(DriverError::Navigation)
    }

    async fn perform(&mut self, action: &Action) -> Result<(), DriverError> {
        let tab = self.tab.clone();
        let action = action.clone();
        task::spawn_blocking(move || -> std::result::Result<(), String> {
            match &action {
                Action::Fill {
                    selector,
                    value,
                    timeout_ms,
                } => {
                    tab.wait_for_element_with_custom_timeout(
                        selector,
                        Duration::from_millis(*timeout_ms),
                    )
                    .map_err(|e| format!("fill '{selector}': {e:#}"))?
                    .type_into(value)
                    .map_err(|e| format!("fill '{selector}': {e:#}"))?;
                }
                Action::Click {
                    selector,
                    timeout_ms,
                } => {
                    tab.wait_for_element_with_custom_timeout(
                        selector,
                        Duration::from_millis(*timeout_ms),
                    )
                    .map_err(|e| format!("click '{selector}': {e:#}"))?
                    .click()
                    .map_err(|e| format!("click '{selector}': {e:#}"))?;
                }
                Action::Wait {
                    selector,
                    timeout_ms,
                } => {
                    tab.wait_for_element_with_custom_timeout(
                        selector,
                        Duration::from_millis(*timeout_ms),
                    )
                    .map_err(|e| format!("wait '{selector}': {e:#}"))?;
                }
                Action::WaitForLoad { timeout_ms } => {
                    tab.set_default_timeout(Duration::from_millis(*timeout_ms));
                    tab.wait_until_navigated()
                        .map_err(|e| format!("wait_for_load: {e:#}"))?;
                }
            }
            Ok(())
        })
        .await
        .map_err(|e| DriverError::Action(e.to_string()))?
        .map_err(DriverError::Action)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        let tab = self.tab.clone();
        task::spawn_blocking(move || tab.close(true).map(|_| ()).map_err(|e| format!("{e:#}")))
            .await
            .map_err(|e| DriverError::Session(e.to_string()))?
            .map_err(DriverError::Session)
    }
}
