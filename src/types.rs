use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a browser window or tab as reported by the driver.
pub type WindowId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Viewport {
    type Err = String;

    /// Parses resolutions written as `WIDTHxHEIGHT`, e.g. `1920x1080`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("resolution '{}' is not WIDTHxHEIGHT", s))?;

        let width = width
            .trim()
            .parse()
            .map_err(|_| format!("invalid width in resolution '{}'", s))?;
        let height = height
            .trim()
            .parse()
            .map_err(|_| format!("invalid height in resolution '{}'", s))?;

        Ok(Self { width, height })
    }
}

/// Only Chrome is wired up; other kinds are rejected at launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Firefox,
}

impl Default for BrowserKind {
    fn default() -> Self {
        BrowserKind::Chrome
    }
}

/// Ordered readiness of an element: each level implies the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadinessLevel {
    Present,
    Visible,
    Clickable,
}

impl ReadinessLevel {
    pub fn failure_reason(&self) -> &'static str {
        match self {
            ReadinessLevel::Present => "was not in the DOM",
            ReadinessLevel::Visible => {
                "was present but never became visible (make sure the element is not hidden)"
            }
            ReadinessLevel::Clickable => {
                "was visible but never became clickable (verify it is enabled and scrolled into view)"
            }
        }
    }
}

impl fmt::Display for ReadinessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadinessLevel::Present => "present",
            ReadinessLevel::Visible => "visible",
            ReadinessLevel::Clickable => "clickable",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_parsing() {
        let viewport: Viewport = "1920x1080".parse().unwrap();
        assert_eq!(viewport, Viewport::default());
        assert_eq!(viewport.to_string(), "1920x1080");

        assert!("1920".parse::<Viewport>().is_err());
        assert!("widex1080".parse::<Viewport>().is_err());
    }

    #[test]
    fn test_readiness_levels_are_ordered() {
        assert!(ReadinessLevel::Present < ReadinessLevel::Visible);
        assert!(ReadinessLevel::Visible < ReadinessLevel::Clickable);
        assert_ne!(
            ReadinessLevel::Present.failure_reason(),
            ReadinessLevel::Visible.failure_reason()
        );
    }
}
