use super::{Probe, WaitEngine};
use crate::core::{ElementLocator, UiDriver};
use crate::errors::{WaitError, WaitResult};
use crate::types::WindowId;
use tracing::{debug, info};

impl<'d, D: UiDriver> WaitEngine<'d, D> {
    pub fn tab_count(&self) -> WaitResult<usize> {
        Ok(self.driver.window_handles()?.len())
    }

    /// Waits until exactly `expected` tabs are open.
    pub fn wait_for_tab_count(&self, expected: usize) -> WaitResult<()> {
        self.wait_for_tabs(expected).map(|_| ())
    }

    /// Clicks `locator` and moves to the tab the click opens.
    pub fn click_and_change_tabs(&self, locator: &ElementLocator) -> WaitResult<WindowId> {
        let before = self.tab_count()?;
        self.click(locator)?;
        self.switch_to_new_tab(before)
    }

    /// Waits for the tab at `index` to exist and switches to it.
    pub fn switch_to_new_tab(&self, index: usize) -> WaitResult<WindowId> {
        let handles = self.wait_for_tabs(index + 1)?;
        self.switch_to(&handles, index)
    }

    pub fn switch_to_newest_tab(&self) -> WaitResult<WindowId> {
        let handles = self.driver.window_handles()?;
        let newest = handles.len().saturating_sub(1);
        self.switch_to(&handles, newest)
    }

    pub fn switch_to_existing_tab(&self, index: usize) -> WaitResult<WindowId> {
        let handles = self.driver.window_handles()?;
        self.switch_to(&handles, index)
    }

    /// Closes the current tab and switches to the tab at `index` among those left.
    pub fn close_current_and_switch(&self, index: usize) -> WaitResult<WindowId> {
        self.driver.close_window()?;
        self.switch_to_existing_tab(index)
    }

    fn wait_for_tabs(&self, expected: usize) -> WaitResult<Vec<WindowId>> {
        debug!(expected, "waiting for tab count");
        self.poll(|| {
            let handles = attempt!(self.driver.window_handles());
            if handles.len() == expected {
                Probe::Ready(handles)
            } else {
                Probe::busy(handles.len().to_string())
            }
        })?
        .or_else_timeout(|elapsed, observed| WaitError::Verification {
            subject: "number of open tabs".to_string(),
            expected: expected.to_string(),
            observed,
            elapsed,
        })
    }

    fn switch_to(&self, handles: &[WindowId], index: usize) -> WaitResult<WindowId> {
        let handle = handles.get(index).ok_or(WaitError::NoSuchTab {
            index,
            available: handles.len(),
        })?;
        self.driver.switch_to_window(handle)?;
        info!(tab = %handle, index, "switched tab");
        Ok(handle.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{ElementLocator, WaitConfig};
    use crate::errors::WaitError;
    use crate::testing::{DriverCall, ScriptedDriver, ScriptedElement};
    use crate::wait::WaitEngine;
    use std::time::{Duration, Instant};

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn engine(driver: &ScriptedDriver, timeout_ms: u64) -> WaitEngine<'_, ScriptedDriver> {
        WaitEngine::new(
            driver,
            WaitConfig::new(ms(timeout_ms)).with_poll_interval(ms(50)),
        )
    }

    #[test]
    fn test_click_and_change_tabs_waits_for_new_tab() {
        let driver = ScriptedDriver::new();
        let link = ElementLocator::css("a[target='_blank']");
        driver.add_element(&link, ScriptedElement::new().opens_tab(ms(300)));

        let started = Instant::now();
        let tab = engine(&driver, 2000).click_and_change_tabs(&link).unwrap();

        assert!(started.elapsed() >= ms(300));
        assert_ne!(tab, "window-1");
        assert_eq!(driver.current_window(), tab);
    }

    #[test]
    fn test_tab_count_timeout_reports_observed_count() {
        let driver = ScriptedDriver::new();
        let err = engine(&driver, 200).wait_for_tab_count(2).unwrap_err();
        match err {
            WaitError::Verification {
                expected, observed, ..
            } => {
                assert_eq!(expected, "2");
                assert_eq!(observed.as_deref(), Some("1"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(driver
            .calls()
            .iter()
            .all(|c| !matches!(c, DriverCall::SwitchWindow { .. })));
    }

    #[test]
    fn test_switching_between_existing_tabs() {
        let driver = ScriptedDriver::new();
        let link = ElementLocator::css("a.external");
        driver.add_element(&link, ScriptedElement::new().opens_tab(Duration::ZERO));

        let engine = engine(&driver, 1000);
        engine.click(&link).unwrap();
        engine.wait_for_tab_count(2).unwrap();
        assert_eq!(engine.tab_count().unwrap(), 2);

        let newest = engine.switch_to_newest_tab().unwrap();
        assert_eq!(driver.current_window(), newest);

        let first = engine.close_current_and_switch(0).unwrap();
        assert_eq!(first, "window-1");
        assert_eq!(engine.tab_count().unwrap(), 1);
    }

    #[test]
    fn test_switching_to_missing_tab_fails() {
        let driver = ScriptedDriver::new();
        let err = engine(&driver, 100).switch_to_existing_tab(3).unwrap_err();
        assert!(matches!(
            err,
            WaitError::NoSuchTab {
                index: 3,
                available: 1
            }
        ));
    }
}
