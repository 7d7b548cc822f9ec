use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// How a locator's selector string is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Css,
    Id,
    XPath,
    ClassName,
    Name,
    TagName,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Css => "css",
            Strategy::Id => "id",
            Strategy::XPath => "xpath",
            Strategy::ClassName => "class name",
            Strategy::Name => "name",
            Strategy::TagName => "tag name",
        };
        f.write_str(name)
    }
}

/// Immutable (strategy, selector) pair identifying zero or more elements.
///
/// Locators are the only way callers name elements. Handles resolved from
/// a locator live for a single poll attempt and are looked up again on the
/// next one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementLocator {
    strategy: Strategy,
    selector: Cow<'static, str>,
}

impl ElementLocator {
    pub fn new(strategy: Strategy, selector: impl Into<Cow<'static, str>>) -> Self {
        Self {
            strategy,
            selector: selector.into(),
        }
    }

    /// Usable in `const` page models.
    pub const fn from_static(strategy: Strategy, selector: &'static str) -> Self {
        Self {
            strategy,
            selector: Cow::Borrowed(selector),
        }
    }

    pub fn css(selector: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Strategy::Css, selector)
    }

    pub fn id(id: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Strategy::Id, id)
    }

    pub fn xpath(expression: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Strategy::XPath, expression)
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// CSS equivalent for every strategy except XPath.
    pub fn to_css(&self) -> Option<String> {
        let selector = self.selector();
        match self.strategy {
            Strategy::Css => Some(selector.to_string()),
            Strategy::Id => Some(format!("[id={}]", css_string(selector))),
            Strategy::Name => Some(format!("[name={}]", css_string(selector))),
            Strategy::ClassName => Some(format!(".{}", selector.trim())),
            Strategy::TagName => Some(selector.trim().to_string()),
            Strategy::XPath => None,
        }
    }
}

impl fmt::Display for ElementLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.strategy, self.selector)
    }
}

fn css_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_BUTTON: ElementLocator =
        ElementLocator::from_static(Strategy::Css, "[data-automationid='login-button']");

    #[test]
    fn test_equality_is_by_value() {
        let owned = ElementLocator::css(String::from("[data-automationid='login-button']"));
        assert_eq!(owned, LOGIN_BUTTON);
        assert_ne!(ElementLocator::id("popular"), ElementLocator::css("popular"));
    }

    #[test]
    fn test_css_translation() {
        assert_eq!(
            ElementLocator::id("for-you").to_css().as_deref(),
            Some("[id=\"for-you\"]")
        );
        assert_eq!(
            ElementLocator::new(Strategy::ClassName, "tile").to_css().as_deref(),
            Some(".tile")
        );
        assert_eq!(
            ElementLocator::new(Strategy::Name, "say \"hi\"").to_css().as_deref(),
            Some("[name=\"say \\\"hi\\\"\"]")
        );
        assert!(ElementLocator::xpath("//div").to_css().is_none());
    }

    #[test]
    fn test_display_names_strategy_and_selector() {
        assert_eq!(ElementLocator::id("popular").to_string(), "id 'popular'");
    }
}
