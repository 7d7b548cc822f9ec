//! Polling wait engine.
//!
//! Every public operation names its element through an [`ElementLocator`](crate::core::ElementLocator)
//! and re-resolves it on each poll attempt, so a node that is re-rendered
//! between attempts is simply found again. Transient driver errors (stale
//! references, intercepted clicks) are retried until the deadline; any other
//! driver error aborts the wait at once.

#[macro_use]
mod poll;

mod actions;
mod page;
mod readiness;
mod tabs;
mod verify;

pub use poll::{poll, poll_until, PollOutcome, Probe};

use crate::core::{UiDriver, WaitConfig};
use crate::errors::WaitResult;
use std::time::{Duration, Instant};

/// Wait engine bound to one driver.
///
/// Cheap to copy: it only borrows the driver and carries the timeout and
/// polling interval used by its operations. Use [`within`](Self::within) to
/// override the timeout for a single call.
pub struct WaitEngine<'d, D: UiDriver> {
    driver: &'d D,
    config: WaitConfig,
}

impl<'d, D: UiDriver> Clone for WaitEngine<'d, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'d, D: UiDriver> Copy for WaitEngine<'d, D> {}

impl<'d, D: UiDriver> WaitEngine<'d, D> {
    pub fn new(driver: &'d D, config: WaitConfig) -> Self {
        Self { driver, config }
    }

    pub fn driver(&self) -> &'d D {
        self.driver
    }

    pub fn config(&self) -> WaitConfig {
        self.config
    }

    pub fn within(&self, timeout: Duration) -> Self {
        Self {
            driver: self.driver,
            config: WaitConfig {
                timeout,
                ..self.config
            },
        }
    }

    pub fn polling_every(&self, poll_interval: Duration) -> Self {
        Self {
            driver: self.driver,
            config: self.config.with_poll_interval(poll_interval),
        }
    }

    /// Polls an arbitrary probe with this engine's timing.
    pub fn poll_until<T>(&self, action: &str, probe: impl FnMut() -> Probe<T>) -> WaitResult<T> {
        poll_until(&self.config, action, probe)
    }

    fn poll<T>(&self, probe: impl FnMut() -> Probe<T>) -> WaitResult<PollOutcome<T>> {
        poll(&self.config, probe)
    }

    /// Engine for nested waits that must finish by this engine's deadline.
    fn remaining_since(&self, started: Instant) -> Self {
        self.within(self.config.timeout.saturating_sub(started.elapsed()))
    }
}
