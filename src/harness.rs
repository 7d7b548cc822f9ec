//! Per-scenario fixture: exclusive driver ownership plus failure screenshots.

use crate::core::UiDriver;
use crate::errors::Result;
use crate::utils::FailureSnapshots;
use std::time::Instant;
use tracing::{error, info, info_span, warn};

/// Runs `body` against `driver`, which the scenario owns for its whole run.
///
/// When the body fails, a screenshot named after the scenario is written
/// before the error is returned. The driver is dropped when the scenario
/// ends, whatever the outcome.
pub fn run_scenario<D, T>(
    name: &str,
    driver: D,
    snapshots: &FailureSnapshots,
    body: impl FnOnce(&D) -> Result<T>,
) -> Result<T>
where
    D: UiDriver,
{
    let span = info_span!("scenario", name);
    let _entered = span.enter();
    let started = Instant::now();
    info!("scenario started");

    let outcome = body(&driver);
    match &outcome {
        Ok(_) => info!(elapsed = ?started.elapsed(), "scenario passed"),
        Err(err) => {
            error!(elapsed = ?started.elapsed(), error = %err, "scenario failed");
            if let Err(snapshot_err) = snapshots.capture(name, &driver) {
                warn!(error = %snapshot_err, "could not capture failure screenshot");
            }
        }
    }

    drop(driver);
    outcome
}
