use super::{Probe, WaitEngine};
use crate::core::UiDriver;
use crate::errors::{WaitError, WaitResult};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

const READY_STATE_SCRIPT: &str = "return document.readyState;";
const TIME_ZONE_SCRIPT: &str = "return Intl.DateTimeFormat().resolvedOptions().timeZone;";

impl<'d, D: UiDriver> WaitEngine<'d, D> {
    /// Opens `url` in the current tab and waits for the document to load.
    pub fn navigate(&self, url: &str) -> WaitResult<()> {
        let url = Url::parse(url)?;
        info!(%url, "navigating");
        self.driver.navigate(url.as_str())?;
        self.wait_for_page_load()
    }

    pub fn current_url(&self) -> WaitResult<String> {
        Ok(self.driver.current_url()?)
    }

    /// Waits until `document.readyState` is `complete`.
    pub fn wait_for_page_load(&self) -> WaitResult<()> {
        self.poll_until("waiting for page load", || {
            match attempt!(self.driver.execute_script(READY_STATE_SCRIPT, None)) {
                Value::String(state) if state == "complete" => Probe::Ready(()),
                Value::String(state) => Probe::Busy(Some(state)),
                _ => Probe::pending(),
            }
        })
    }

    pub fn wait_for_url_contains(&self, fragment: &str) -> WaitResult<String> {
        debug!(fragment, "waiting for URL");
        self.poll(|| {
            let url = attempt!(self.driver.current_url());
            if url.contains(fragment) {
                Probe::Ready(url)
            } else {
                Probe::Busy(Some(url))
            }
        })?
        .or_else_timeout(|elapsed, observed| WaitError::Verification {
            subject: "current URL".to_string(),
            expected: format!("a URL containing '{}'", fragment),
            observed,
            elapsed,
        })
    }

    pub fn scroll_to_top(&self) -> WaitResult<()> {
        self.driver.execute_script("window.scrollTo(0, 0);", None)?;
        Ok(())
    }

    pub fn scroll_to_bottom(&self) -> WaitResult<()> {
        self.driver
            .execute_script("window.scrollTo(0, document.body.scrollHeight);", None)?;
        Ok(())
    }

    /// IANA time zone the browser reports, e.g. `America/New_York`.
    pub fn browser_time_zone(&self) -> WaitResult<String> {
        self.poll_until("reading the browser time zone", || {
            match attempt!(self.driver.execute_script(TIME_ZONE_SCRIPT, None)) {
                Value::String(zone) if !zone.is_empty() => Probe::Ready(zone),
                other => Probe::busy(other.to_string()),
            }
        })
    }
}
