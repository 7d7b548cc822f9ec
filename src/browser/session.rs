use super::chrome::ChromeDriver;
use crate::core::{BrowserConfig, Config, ElementLocator, UiDriver};
use crate::errors::{BrowserError, DriverResult, Result};
use crate::types::{BrowserKind, WindowId};
use crate::wait::WaitEngine;
use chrono::{DateTime, Utc};
use headless_chrome::{Browser, LaunchOptions};
use serde_json::Value;
use std::ffi::OsStr;
use std::time::Duration;
use tracing::{info, info_span, Span};
use uuid::Uuid;

/// Chrome keeps the DevTools connection open this long without traffic.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);

/// One exclusively owned browser instance.
///
/// The session owns its driver; wait engines borrow it, so no engine can
/// outlive the browser. Dropping the session closes Chrome.
pub struct BrowserSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    config: Config,
    driver: ChromeDriver,
    span: Span,
}

impl BrowserSession {
    pub fn launch(config: Config) -> Result<Self> {
        if config.browser.browser != BrowserKind::Chrome {
            return Err(BrowserError::UnsupportedBrowser(format!(
                "{:?} (only Chrome is available)",
                config.browser.browser
            )));
        }

        let id = Uuid::new_v4();
        let span = info_span!("browser_session", session_id = %id);
        let entered = span.enter();

        let args = chrome_args(&config.browser);
        let launch_options = LaunchOptions::default_builder()
            .headless(config.browser.headless)
            .window_size(Some((
                config.browser.viewport.width,
                config.browser.viewport.height,
            )))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .args(args.iter().map(OsStr::new).collect())
            .build()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
        let driver = ChromeDriver::new(browser)?;

        info!(
            headless = config.browser.headless,
            viewport = %config.browser.viewport,
            "browser session started"
        );
        drop(entered);

        Ok(Self {
            id,
            started_at: Utc::now(),
            config,
            driver,
            span,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn driver(&self) -> &ChromeDriver {
        &self.driver
    }

    /// Wait engine using the session's configured timeout and polling interval.
    pub fn engine(&self) -> WaitEngine<'_, Self> {
        WaitEngine::new(self, self.config.wait)
    }
}

/// Command-line switches for a Chrome instance built from `config`.
pub fn chrome_args(config: &BrowserConfig) -> Vec<String> {
    let mut args = vec![
        "--disable-infobars".to_string(),
        "--no-sandbox".to_string(),
        "--disable-gpu".to_string(),
        "--allow-running-insecure-content".to_string(),
        "--disable-dev-shm-usage".to_string(),
    ];
    if config.incognito {
        args.push("--incognito".to_string());
    }
    if let Some(language) = &config.language {
        args.push(format!("--lang={}", language));
    }
    if let Some(user_agent) = &config.user_agent {
        args.push(format!("--user-agent={}", user_agent));
    }
    args.extend(config.args.iter().cloned());
    args
}

impl UiDriver for BrowserSession {
    type Handle = <ChromeDriver as UiDriver>::Handle;

    fn find_element(&self, locator: &ElementLocator) -> DriverResult<Self::Handle> {
        let _entered = self.span.enter();
        self.driver.find_element(locator)
    }

    fn find_elements(
        &self,
        locator: &ElementLocator,
    ) -> DriverResult<Vec<Self::Handle>> {
        let _entered = self.span.enter();
        self.driver.find_elements(locator)
    }

    fn is_displayed(&self, element: &Self::Handle) -> DriverResult<bool> {
        let _entered = self.span.enter();
        self.driver.is_displayed(element)
    }

    fn is_enabled(&self, element: &Self::Handle) -> DriverResult<bool> {
        let _entered = self.span.enter();
        self.driver.is_enabled(element)
    }

    fn click(&self, element: &Self::Handle) -> DriverResult<()> {
        let _entered = self.span.enter();
        self.driver.click(element)
    }

    fn clear(&self, element: &Self::Handle) -> DriverResult<()> {
        let _entered = self.span.enter();
        self.driver.clear(element)
    }

    fn send_keys(&self, element: &Self::Handle, text: &str) -> DriverResult<()> {
        let _entered = self.span.enter();
        self.driver.send_keys(element, text)
    }

    fn attribute(&self, element: &Self::Handle, name: &str) -> DriverResult<Option<String>> {
        let _entered = self.span.enter();
        self.driver.attribute(element, name)
    }

    fn text(&self, element: &Self::Handle) -> DriverResult<String> {
        let _entered = self.span.enter();
        self.driver.text(element)
    }

    fn css_property(&self, element: &Self::Handle, name: &str) -> DriverResult<String> {
        let _entered = self.span.enter();
        self.driver.css_property(element, name)
    }

    fn execute_script(&self, script: &str, element: Option<&Self::Handle>) -> DriverResult<Value> {
        let _entered = self.span.enter();
        self.driver.execute_script(script, element)
    }

    fn window_handles(&self) -> DriverResult<Vec<WindowId>> {
        let _entered = self.span.enter();
        self.driver.window_handles()
    }

    fn switch_to_window(&self, id: &WindowId) -> DriverResult<()> {
        let _entered = self.span.enter();
        self.driver.switch_to_window(id)
    }

    fn close_window(&self) -> DriverResult<()> {
        let _entered = self.span.enter();
        self.driver.close_window()
    }

    fn current_url(&self) -> DriverResult<String> {
        let _entered = self.span.enter();
        self.driver.current_url()
    }

    fn navigate(&self, url: &str) -> DriverResult<()> {
        let _entered = self.span.enter();
        self.driver.navigate(url)
    }

    fn page_source(&self) -> DriverResult<String> {
        let _entered = self.span.enter();
        self.driver.page_source()
    }

    fn screenshot(&self) -> DriverResult<Vec<u8>> {
        let _entered = self.span.enter();
        self.driver.screenshot()
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let _entered = self.span.enter();
        let lifetime = Utc::now() - self.started_at;
        info!(
            seconds = lifetime.num_seconds(),
            "closing browser session"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Viewport;

    #[test]
    fn test_chrome_args_follow_config() {
        let config = BrowserConfig {
            viewport: Viewport {
                width: 1280,
                height: 720,
            },
            language: Some("en-US".to_string()),
            user_agent: Some("Mozilla/5.0 (X11; Linux x86_64)".to_string()),
            args: vec!["--mute-audio".to_string()],
            ..BrowserConfig::default()
        };

        let args = chrome_args(&config);
        assert!(!args.iter().any(|arg| arg.starts_with("--window-size")));
        assert!(args.contains(&"--incognito".to_string()));
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--lang=en-US".to_string()));
        assert!(args.contains(&"--user-agent=Mozilla/5.0 (X11; Linux x86_64)".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("--mute-audio"));
    }

    #[test]
    fn test_incognito_can_be_disabled() {
        let config = BrowserConfig {
            incognito: false,
            ..BrowserConfig::default()
        };
        assert!(!chrome_args(&config).contains(&"--incognito".to_string()));
    }

    #[test]
    fn test_only_chrome_launches() {
        let mut config = Config::default();
        config.browser.browser = BrowserKind::Firefox;
        assert!(matches!(
            BrowserSession::launch(config),
            Err(BrowserError::UnsupportedBrowser(_))
        ));
    }
}
