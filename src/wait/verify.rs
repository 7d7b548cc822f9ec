use super::{Probe, WaitEngine};
use crate::core::{ElementLocator, UiDriver};
use crate::errors::{DriverError, WaitError, WaitResult};
use regex::Regex;
use std::time::Instant;
use tracing::debug;

/// Which value of an element a read looks at.
#[derive(Debug, Clone, Copy)]
enum Reading<'a> {
    Text,
    Attribute(&'a str),
    Css(&'a str),
}

impl Reading<'_> {
    fn describe(&self, locator: &ElementLocator) -> String {
        match self {
            Reading::Text => format!("text of {}", locator),
            Reading::Attribute(name) => format!("attribute '{}' of {}", name, locator),
            Reading::Css(name) => format!("CSS property '{}' of {}", name, locator),
        }
    }
}

impl<'d, D: UiDriver> WaitEngine<'d, D> {
    /// Visible text of the element, waiting until it is non-empty.
    pub fn read_text(&self, locator: &ElementLocator) -> WaitResult<String> {
        self.read_non_empty(locator, Reading::Text)
    }

    /// Attribute (or matching DOM property) value, waiting until it is non-empty.
    pub fn read_attribute(&self, locator: &ElementLocator, name: &str) -> WaitResult<String> {
        self.read_non_empty(locator, Reading::Attribute(name))
    }

    /// Computed CSS value, waiting until it is non-empty.
    pub fn read_css_property(&self, locator: &ElementLocator, name: &str) -> WaitResult<String> {
        self.read_non_empty(locator, Reading::Css(name))
    }

    pub fn verify_text(&self, locator: &ElementLocator, expected: &str) -> WaitResult<()> {
        self.verify(locator, Reading::Text, format!("'{}'", expected), |text| {
            text == expected
        })
    }

    pub fn verify_text_contains(&self, locator: &ElementLocator, expected: &str) -> WaitResult<()> {
        self.verify(
            locator,
            Reading::Text,
            format!("text containing '{}'", expected),
            |text| text.contains(expected),
        )
    }

    pub fn verify_text_does_not_contain(
        &self,
        locator: &ElementLocator,
        unexpected: &str,
    ) -> WaitResult<()> {
        self.verify(
            locator,
            Reading::Text,
            format!("text without '{}'", unexpected),
            |text| !text.contains(unexpected),
        )
    }

    /// Waits until the text no longer starts with a match of `pattern`.
    pub fn verify_text_does_not_match(
        &self,
        locator: &ElementLocator,
        pattern: &str,
    ) -> WaitResult<()> {
        let regex = Regex::new(&format!("^(?:{})", pattern))?;
        self.verify(
            locator,
            Reading::Text,
            format!("text not matching /{}/", pattern),
            |text| !regex.is_match(text),
        )
    }

    pub fn verify_value(&self, locator: &ElementLocator, expected: &str) -> WaitResult<()> {
        self.verify(
            locator,
            Reading::Attribute("value"),
            format!("'{}'", expected),
            |value| value == expected,
        )
    }

    pub fn verify_value_contains(&self, locator: &ElementLocator, expected: &str) -> WaitResult<()> {
        self.verify_attribute_contains(locator, "value", expected)
    }

    /// Waits until some part of the value matches `pattern`.
    pub fn verify_value_contains_pattern(
        &self,
        locator: &ElementLocator,
        pattern: &str,
    ) -> WaitResult<()> {
        let regex = Regex::new(pattern)?;
        self.verify(
            locator,
            Reading::Attribute("value"),
            format!("value containing /{}/", pattern),
            |value| regex.is_match(value),
        )
    }

    /// Waits until the whole value matches `pattern`.
    pub fn verify_value_matches_pattern(
        &self,
        locator: &ElementLocator,
        pattern: &str,
    ) -> WaitResult<()> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;
        self.verify(
            locator,
            Reading::Attribute("value"),
            format!("value matching /{}/", pattern),
            |value| regex.is_match(value),
        )
    }

    pub fn verify_attribute_contains(
        &self,
        locator: &ElementLocator,
        attribute: &str,
        expected: &str,
    ) -> WaitResult<()> {
        self.verify(
            locator,
            Reading::Attribute(attribute),
            format!("a value containing '{}'", expected),
            |value| value.contains(expected),
        )
    }

    pub fn verify_css_value_contains(
        &self,
        locator: &ElementLocator,
        property: &str,
        expected: &str,
    ) -> WaitResult<()> {
        self.verify(
            locator,
            Reading::Css(property),
            format!("a value containing '{}'", expected),
            |value| value.contains(expected),
        )
    }

    /// Waits until the element carries a non-empty `attribute`.
    pub fn verify_has_attribute(&self, locator: &ElementLocator, attribute: &str) -> WaitResult<()> {
        self.verify(
            locator,
            Reading::Attribute(attribute),
            "a non-empty value".to_string(),
            |value| !value.is_empty(),
        )
    }

    pub fn verify_count_of_elements(
        &self,
        locator: &ElementLocator,
        expected: usize,
    ) -> WaitResult<()> {
        self.verify_count(locator, format!("exactly {}", expected), |count| {
            count == expected
        })
    }

    pub fn verify_minimum_count_of_elements(
        &self,
        locator: &ElementLocator,
        minimum: usize,
    ) -> WaitResult<()> {
        self.verify_count(locator, format!("at least {}", minimum), |count| {
            count >= minimum
        })
    }

    fn verify_count(
        &self,
        locator: &ElementLocator,
        expected: String,
        accept: impl Fn(usize) -> bool,
    ) -> WaitResult<()> {
        debug!(%locator, %expected, "verifying element count");
        self.poll(|| {
            let count = match self.driver.find_elements(locator) {
                Ok(elements) => elements.len(),
                Err(DriverError::NotFound(_)) => 0,
                Err(err) => return Probe::from(err),
            };
            if accept(count) {
                Probe::Ready(())
            } else {
                Probe::busy(count.to_string())
            }
        })?
        .or_else_timeout(|elapsed, observed| WaitError::Verification {
            subject: format!("number of elements matching {}", locator),
            expected,
            observed,
            elapsed,
        })
    }

    fn read_non_empty(&self, locator: &ElementLocator, reading: Reading<'_>) -> WaitResult<String> {
        self.verify_reading(
            locator,
            reading,
            "a non-empty value".to_string(),
            |value| !value.is_empty(),
        )
    }

    fn verify(
        &self,
        locator: &ElementLocator,
        reading: Reading<'_>,
        expected: String,
        accept: impl Fn(&str) -> bool,
    ) -> WaitResult<()> {
        self.verify_reading(locator, reading, expected, accept)
            .map(|_| ())
    }

    /// Polls a fresh reading until `accept` holds, returning the accepted value.
    fn verify_reading(
        &self,
        locator: &ElementLocator,
        reading: Reading<'_>,
        expected: String,
        accept: impl Fn(&str) -> bool,
    ) -> WaitResult<String> {
        let subject = reading.describe(locator);
        debug!(%subject, %expected, "polling reading");

        let started = Instant::now();
        self.poll(|| match self.remaining_since(started).observe(locator, reading) {
            Probe::Ready(value) if accept(value.as_str()) => Probe::Ready(value),
            Probe::Ready(value) => Probe::Busy(Some(value)),
            other => other,
        })?
        .or_else_timeout(|elapsed, observed| WaitError::Verification {
            subject,
            expected,
            observed,
            elapsed,
        })
    }

    /// One reading through a freshly resolved handle.
    ///
    /// Text needs a visible element; attributes and CSS only need it present,
    /// since hidden inputs still carry values. A readiness failure is fatal
    /// to the enclosing poll.
    fn observe(&self, locator: &ElementLocator, reading: Reading<'_>) -> Probe<String> {
        match reading {
            Reading::Text => {
                let element = attempt!(self.resolve_visible(locator));
                Probe::Ready(attempt!(self.driver.text(&element)))
            }
            Reading::Attribute(name) => {
                let element = attempt!(self.resolve_present(locator));
                Probe::Ready(attempt!(self.driver.attribute(&element, name)).unwrap_or_default())
            }
            Reading::Css(name) => {
                let element = attempt!(self.resolve_present(locator));
                Probe::Ready(attempt!(self.driver.css_property(&element, name)))
            }
        }
    }
}
