use crate::core::ElementLocator;
use crate::types::ReadinessLevel;
use std::time::Duration;
use thiserror::Error;

/// Error kinds a UI driver reports back to the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Stale element reference: {0}")]
    StaleReference(String),

    #[error("Click intercepted: {0}")]
    ClickIntercepted(String),

    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Driver timeout: {0}")]
    Timeout(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("No such window: {0}")]
    NoSuchWindow(String),

    #[error("Session error: {0}")]
    Session(String),
}

impl DriverError {
    /// Errors expected to clear up on their own while the page settles.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DriverError::StaleReference(_) | DriverError::ClickIntercepted(_)
        )
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Failures surfaced by the wait engine.
#[derive(Error, Debug)]
pub enum WaitError {
    #[error("Element {locator} {} after {elapsed:?}", .level.failure_reason())]
    Readiness {
        level: ReadinessLevel,
        locator: ElementLocator,
        elapsed: Duration,
    },

    #[error("Element {locator} was still visible after {elapsed:?}")]
    StillVisible {
        locator: ElementLocator,
        elapsed: Duration,
    },

    #[error(
        "{subject}: expected {expected}, last observed {} after {elapsed:?}",
        quoted(.observed)
    )]
    Verification {
        subject: String,
        expected: String,
        observed: Option<String>,
        elapsed: Duration,
    },

    #[error(
        "Timed out {action} after {elapsed:?} (last observed: {})",
        quoted(.last_observed)
    )]
    Timeout {
        action: String,
        elapsed: Duration,
        last_observed: Option<String>,
    },

    #[error("Tab index {index} is out of range ({available} tabs open)")]
    NoSuchTab { index: usize, available: usize },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl WaitError {
    pub fn readiness_level(&self) -> Option<ReadinessLevel> {
        match self {
            WaitError::Readiness { level, .. } => Some(*level),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            WaitError::Readiness { .. }
                | WaitError::StillVisible { .. }
                | WaitError::Verification { .. }
                | WaitError::Timeout { .. }
        )
    }
}

fn quoted(observed: &Option<String>) -> String {
    match observed {
        Some(value) => format!("'{}'", value),
        None => "nothing".to_string(),
    }
}

pub type WaitResult<T> = std::result::Result<T, WaitError>;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Unsupported browser: {0}")]
    UnsupportedBrowser(String),

    #[error("Content extraction failed: {0}")]
    ExtractionFailed(String),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Chrome error: {0}")]
    ChromeError(String),
}

pub type Result<T> = std::result::Result<T, BrowserError>;

impl From<anyhow::Error> for BrowserError {
    fn from(err: anyhow::Error) -> Self {
        BrowserError::ChromeError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DriverError::StaleReference("node".into()).is_transient());
        assert!(DriverError::ClickIntercepted("overlay".into()).is_transient());
        assert!(!DriverError::NotFound("#x".into()).is_transient());
        assert!(!DriverError::InvalidSelector("[".into()).is_transient());
        assert!(!DriverError::Session("crashed".into()).is_transient());
    }

    #[test]
    fn test_readiness_messages_name_the_level() {
        let locator = ElementLocator::css("#login");
        let present = WaitError::Readiness {
            level: ReadinessLevel::Present,
            locator: locator.clone(),
            elapsed: Duration::from_millis(500),
        };
        let visible = WaitError::Readiness {
            level: ReadinessLevel::Visible,
            locator,
            elapsed: Duration::from_millis(500),
        };

        assert!(present.to_string().contains("was not in the DOM"));
        assert!(present.to_string().contains("#login"));
        assert!(visible.to_string().contains("never became visible"));
        assert_eq!(present.readiness_level(), Some(ReadinessLevel::Present));
        assert!(present.is_timeout());
    }

    #[test]
    fn test_verification_message_includes_last_value() {
        let err = WaitError::Verification {
            subject: "text of css '#title'".to_string(),
            expected: "'Popular'".to_string(),
            observed: Some("Pop".to_string()),
            elapsed: Duration::from_secs(2),
        };
        let message = err.to_string();
        assert!(message.contains("'Popular'"));
        assert!(message.contains("'Pop'"));
    }
}
