use super::{Probe, WaitEngine};
use crate::core::{ElementLocator, UiDriver};
use crate::errors::{DriverError, WaitError, WaitResult};
use crate::types::ReadinessLevel;
use std::time::Duration;
use tracing::{debug, warn};

impl<'d, D: UiDriver> WaitEngine<'d, D> {
    /// Waits until at least one element matches `locator`.
    pub fn wait_present(&self, locator: &ElementLocator) -> WaitResult<()> {
        self.resolve_present(locator).map(|_| ())
    }

    /// Waits until the element is present and rendered.
    pub fn wait_visible(&self, locator: &ElementLocator) -> WaitResult<()> {
        self.resolve_visible(locator).map(|_| ())
    }

    /// Waits until the element is visible and enabled.
    ///
    /// Obstruction by another element is only observable when clicking, so
    /// [`click`](Self::click) retries intercepted clicks on its own.
    pub fn wait_clickable(&self, locator: &ElementLocator) -> WaitResult<()> {
        self.resolve_clickable(locator).map(|_| ())
    }

    /// Waits until nothing matches, the first match is hidden, or it went stale.
    pub fn wait_invisible(&self, locator: &ElementLocator) -> WaitResult<()> {
        debug!(%locator, "waiting for element to disappear");
        self.poll(|| {
            let elements = attempt!(self.driver.find_elements(locator));
            let Some(element) = elements.first() else {
                return Probe::Ready(());
            };
            match self.driver.is_displayed(element) {
                Ok(false) => Probe::Ready(()),
                Err(DriverError::StaleReference(_)) | Err(DriverError::NotFound(_)) => {
                    Probe::Ready(())
                }
                Ok(true) => Probe::busy("visible"),
                Err(err) => Probe::from(err),
            }
        })?
        .or_else_timeout(|elapsed, _| {
            warn!(%locator, ?elapsed, "element stayed visible");
            WaitError::StillVisible {
                locator: locator.clone(),
                elapsed,
            }
        })
    }

    /// Checks once, without waiting.
    pub fn is_present(&self, locator: &ElementLocator) -> WaitResult<bool> {
        Ok(self.count(locator)? > 0)
    }

    /// Number of elements currently matching `locator`.
    pub fn count(&self, locator: &ElementLocator) -> WaitResult<usize> {
        match self.driver.find_elements(locator) {
            Ok(elements) => Ok(elements.len()),
            Err(DriverError::NotFound(_)) => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) fn resolve(
        &self,
        level: ReadinessLevel,
        locator: &ElementLocator,
    ) -> WaitResult<D::Handle> {
        match level {
            ReadinessLevel::Present => self.resolve_present(locator),
            ReadinessLevel::Visible => self.resolve_visible(locator),
            ReadinessLevel::Clickable => self.resolve_clickable(locator),
        }
    }

    pub(crate) fn resolve_present(&self, locator: &ElementLocator) -> WaitResult<D::Handle> {
        debug!(%locator, "waiting for element to be present");
        self.poll(|| match self.driver.find_element(locator) {
            Ok(element) => Probe::Ready(element),
            Err(DriverError::NotFound(_)) => Probe::busy("no matching element"),
            Err(err) => Probe::from(err),
        })?
        .or_else_timeout(|elapsed, _| {
            self.readiness_timeout(ReadinessLevel::Present, locator, elapsed)
        })
    }

    pub(crate) fn resolve_visible(&self, locator: &ElementLocator) -> WaitResult<D::Handle> {
        self.resolve_present(locator)?;

        debug!(%locator, "waiting for element to be visible");
        self.poll(|| {
            let element = attempt!(self.find_again(locator));
            if attempt!(self.driver.is_displayed(&element)) {
                Probe::Ready(element)
            } else {
                Probe::busy("hidden")
            }
        })?
        .or_else_timeout(|elapsed, _| {
            self.readiness_timeout(ReadinessLevel::Visible, locator, elapsed)
        })
    }

    pub(crate) fn resolve_clickable(&self, locator: &ElementLocator) -> WaitResult<D::Handle> {
        self.resolve_visible(locator)?;

        debug!(%locator, "waiting for element to be clickable");
        self.poll(|| {
            let element = attempt!(self.find_again(locator));
            if !attempt!(self.driver.is_displayed(&element)) {
                return Probe::busy("hidden");
            }
            if !attempt!(self.driver.is_enabled(&element)) {
                return Probe::busy("disabled");
            }
            Probe::Ready(element)
        })?
        .or_else_timeout(|elapsed, _| {
            self.readiness_timeout(ReadinessLevel::Clickable, locator, elapsed)
        })
    }

    /// Lookup for an element that was already seen: disappearing again is
    /// reported like a stale reference so the caller keeps polling.
    fn find_again(&self, locator: &ElementLocator) -> Result<D::Handle, DriverError> {
        self.driver.find_element(locator).map_err(|err| match err {
            DriverError::NotFound(reason) => DriverError::StaleReference(reason),
            other => other,
        })
    }

    fn readiness_timeout(
        &self,
        level: ReadinessLevel,
        locator: &ElementLocator,
        elapsed: Duration,
    ) -> WaitError {
        warn!(%locator, %level, ?elapsed, "element never reached readiness level");
        WaitError::Readiness {
            level,
            locator: locator.clone(),
            elapsed,
        }
    }
}
