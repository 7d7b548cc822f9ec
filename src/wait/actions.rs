use super::{Probe, WaitEngine};
use crate::core::{ElementLocator, UiDriver};
use crate::errors::{WaitError, WaitResult};
use crate::types::ReadinessLevel;
use std::time::Instant;
use tracing::{debug, info};

impl<'d, D: UiDriver> WaitEngine<'d, D> {
    /// Clicks the element once it is clickable.
    ///
    /// An intercepted or stale click restarts the whole cycle (readiness wait
    /// plus click) until the timeout, since overlays and re-renders are
    /// usually momentary.
    pub fn click(&self, locator: &ElementLocator) -> WaitResult<()> {
        info!(%locator, "click");
        self.act_on(locator, ReadinessLevel::Clickable, "clicking", |element| {
            attempt!(self.driver.click(element));
            Probe::Ready(())
        })
    }

    /// Clears the element's content once it is clickable.
    pub fn clear(&self, locator: &ElementLocator) -> WaitResult<()> {
        debug!(%locator, "clear");
        self.act_on(locator, ReadinessLevel::Clickable, "clearing", |element| {
            attempt!(self.driver.clear(element));
            Probe::Ready(())
        })
    }

    /// Sends keys to the element once it is visible, without clearing it.
    pub fn send_keys(&self, locator: &ElementLocator, text: &str) -> WaitResult<()> {
        debug!(%locator, chars = text.chars().count(), "send keys");
        self.act_on(locator, ReadinessLevel::Visible, "typing into", |element| {
            attempt!(self.driver.send_keys(element, text));
            Probe::Ready(())
        })
    }

    /// Replaces the element's content with `text`.
    pub fn type_into(&self, locator: &ElementLocator, text: &str) -> WaitResult<()> {
        self.clear(locator)?;
        self.send_keys(locator, text)
    }

    /// Picks the `<option>` with the given value, waiting for it to exist.
    pub fn select_by_value(&self, locator: &ElementLocator, value: &str) -> WaitResult<()> {
        let script = format!(
            r#"const select = arguments[0];
               const option = Array.from(select.options || []).find(o => o.value === {value});
               if (!option) return false;
               select.value = option.value;
               select.dispatchEvent(new Event('change', {{ bubbles: true }}));
               return true;"#,
            value = js_string(value)
        );

        self.act_on(locator, ReadinessLevel::Clickable, "selecting in", |element| {
            let selected = attempt!(self.driver.execute_script(&script, Some(element)));
            if selected.as_bool() == Some(true) {
                Probe::Ready(())
            } else {
                Probe::busy(format!("no option with value '{}'", value))
            }
        })
    }

    /// Scrolls the element into view, aligned with the top or bottom edge.
    pub fn scroll_into_view(&self, locator: &ElementLocator, align_to_top: bool) -> WaitResult<()> {
        let script = format!("arguments[0].scrollIntoView({});", align_to_top);
        self.act_on(locator, ReadinessLevel::Visible, "scrolling to", |element| {
            attempt!(self.driver.execute_script(&script, Some(element)));
            Probe::Ready(())
        })
    }

    pub fn scroll_into_center_view(&self, locator: &ElementLocator) -> WaitResult<()> {
        self.act_on(locator, ReadinessLevel::Visible, "centering", |element| {
            attempt!(self.driver.execute_script(
                r#"arguments[0].scrollIntoView({behavior: "auto", block: "center", inline: "nearest"});"#,
                Some(element),
            ));
            Probe::Ready(())
        })
    }

    /// Resolves the element to `level` and runs `action` on it, repeating
    /// both while the action reports a transient failure.
    ///
    /// Readiness failures from the nested wait end the cycle immediately.
    fn act_on<T>(
        &self,
        locator: &ElementLocator,
        level: ReadinessLevel,
        action: &str,
        mut act: impl FnMut(&D::Handle) -> Probe<T>,
    ) -> WaitResult<T> {
        let started = Instant::now();
        let mut attempts = 0u32;

        let outcome = self.poll(|| {
            attempts += 1;
            let element = attempt!(self.remaining_since(started).resolve(level, locator));
            act(&element)
        })?;

        debug!(%locator, action, attempts, "action finished");
        outcome.or_else_timeout(|elapsed, last_observed| WaitError::Timeout {
            action: format!("{} {}", action, locator),
            elapsed,
            last_observed,
        })
    }
}

/// Quotes a value as a JavaScript string literal.
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
