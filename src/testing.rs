//! In-memory driver for exercising the wait engine without a browser.
//!
//! Each locator is bound to a [`ScriptedElement`] describing how the element
//! behaves over wall-clock time since the driver was created: when it shows
//! up, becomes visible or enabled, how long an overlay intercepts clicks,
//! and how its text and attributes change. Every driver call is recorded so
//! tests can check how the engine used the driver.

use crate::core::{ElementLocator, UiDriver};
use crate::errors::{DriverError, DriverResult};
use crate::types::WindowId;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::{Duration, Instant};

const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Value that changes at given offsets; the latest entry not in the future wins.
#[derive(Debug, Clone, Default)]
struct Timeline<T> {
    entries: Vec<(Duration, T)>,
}

impl<T: Clone> Timeline<T> {
    fn push(&mut self, at: Duration, value: T) {
        self.entries.push((at, value));
        self.entries.sort_by_key(|(at, _)| *at);
    }

    fn at(&self, now: Duration) -> Option<T> {
        self.entries
            .iter()
            .take_while(|(at, _)| *at <= now)
            .last()
            .map(|(_, value)| value.clone())
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedElement {
    appears_at: Duration,
    removed_at: Option<Duration>,
    visible_at: Option<Duration>,
    hidden_at: Option<Duration>,
    enabled_at: Option<Duration>,
    intercepted_until: Duration,
    stale_reads: u32,
    stale_clicks: u32,
    matches: Timeline<usize>,
    text: Timeline<String>,
    attributes: HashMap<String, Timeline<String>>,
    css: HashMap<String, Timeline<String>>,
    opens_tab_after: Option<Duration>,
    invalid_selector: bool,
}

impl Default for ScriptedElement {
    fn default() -> Self {
        let mut matches = Timeline::default();
        matches.push(Duration::ZERO, 1);
        Self {
            appears_at: Duration::ZERO,
            removed_at: None,
            visible_at: Some(Duration::ZERO),
            hidden_at: None,
            enabled_at: Some(Duration::ZERO),
            intercepted_until: Duration::ZERO,
            stale_reads: 0,
            stale_clicks: 0,
            matches,
            text: Timeline::default(),
            attributes: HashMap::new(),
            css: HashMap::new(),
            opens_tab_after: None,
            invalid_selector: false,
        }
    }
}

impl ScriptedElement {
    /// Present, visible and enabled from the start.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn appears_at(mut self, at: Duration) -> Self {
        self.appears_at = at;
        if let Some(visible_at) = self.visible_at {
            self.visible_at = Some(visible_at.max(at));
        }
        self
    }

    pub fn removed_at(mut self, at: Duration) -> Self {
        self.removed_at = Some(at);
        self
    }

    pub fn visible_at(mut self, at: Duration) -> Self {
        self.visible_at = Some(at);
        self
    }

    pub fn never_visible(mut self) -> Self {
        self.visible_at = None;
        self
    }

    pub fn hidden_at(mut self, at: Duration) -> Self {
        self.hidden_at = Some(at);
        self
    }

    pub fn enabled_at(mut self, at: Duration) -> Self {
        self.enabled_at = Some(at);
        self
    }

    pub fn never_enabled(mut self) -> Self {
        self.enabled_at = None;
        self
    }

    /// Clicks before `until` land on an overlay.
    pub fn intercepted_until(mut self, until: Duration) -> Self {
        self.intercepted_until = until;
        self
    }

    /// The next `count` non-click operations on any handle report a stale reference.
    pub fn stale_reads(mut self, count: u32) -> Self {
        self.stale_reads = count;
        self
    }

    pub fn stale_clicks(mut self, count: u32) -> Self {
        self.stale_clicks = count;
        self
    }

    pub fn matches(self, count: usize) -> Self {
        self.matches_at(Duration::ZERO, count)
    }

    pub fn matches_at(mut self, at: Duration, count: usize) -> Self {
        self.matches.push(at, count);
        self
    }

    pub fn text(self, text: &str) -> Self {
        self.text_at(Duration::ZERO, text)
    }

    pub fn text_at(mut self, at: Duration, text: &str) -> Self {
        self.text.push(at, text.to_string());
        self
    }

    pub fn attribute(self, name: &str, value: &str) -> Self {
        self.attribute_at(Duration::ZERO, name, value)
    }

    pub fn attribute_at(mut self, at: Duration, name: &str, value: &str) -> Self {
        self.attributes
            .entry(name.to_string())
            .or_default()
            .push(at, value.to_string());
        self
    }

    pub fn css(self, name: &str, value: &str) -> Self {
        self.css_at(Duration::ZERO, name, value)
    }

    pub fn css_at(mut self, at: Duration, name: &str, value: &str) -> Self {
        self.css
            .entry(name.to_string())
            .or_default()
            .push(at, value.to_string());
        self
    }

    /// A successful click opens a new tab after `delay`.
    pub fn opens_tab(mut self, delay: Duration) -> Self {
        self.opens_tab_after = Some(delay);
        self
    }

    pub fn invalid_selector(mut self) -> Self {
        self.invalid_selector = true;
        self
    }

    fn present(&self, now: Duration) -> bool {
        now >= self.appears_at && self.removed_at.map_or(true, |removed| now < removed)
    }

    fn displayed(&self, now: Duration) -> bool {
        self.visible_at.map_or(false, |at| now >= at)
            && self.hidden_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptedHandle {
    pub id: u64,
    pub locator: ElementLocator,
}

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Find { locator: ElementLocator, ids: Vec<u64> },
    IsDisplayed { id: u64, shown: bool },
    IsEnabled { id: u64 },
    Click { id: u64, ok: bool },
    Clear { id: u64 },
    SendKeys { id: u64, text: String },
    Attribute { id: u64, name: String },
    Text { id: u64 },
    Css { id: u64, name: String },
    Script { script: String },
    Navigate { url: String },
    SwitchWindow { id: WindowId },
    CloseWindow,
}

pub struct ScriptedDriver {
    epoch: Instant,
    elements: RefCell<HashMap<ElementLocator, ScriptedElement>>,
    typed: RefCell<HashMap<ElementLocator, String>>,
    next_id: Cell<u64>,
    calls: RefCell<Vec<DriverCall>>,
    windows: RefCell<Vec<WindowId>>,
    pending_windows: RefCell<Vec<(Instant, WindowId)>>,
    current_window: RefCell<WindowId>,
    scripts: RefCell<Vec<(String, Value)>>,
    url: RefCell<String>,
    page_source: RefCell<String>,
    crashed: Cell<bool>,
    released: Rc<Cell<bool>>,
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDriver {
    pub fn new() -> Self {
        let first_window = "window-1".to_string();
        Self {
            epoch: Instant::now(),
            elements: RefCell::new(HashMap::new()),
            typed: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
            calls: RefCell::new(Vec::new()),
            windows: RefCell::new(vec![first_window.clone()]),
            pending_windows: RefCell::new(Vec::new()),
            current_window: RefCell::new(first_window),
            scripts: RefCell::new(Vec::new()),
            url: RefCell::new("about:blank".to_string()),
            page_source: RefCell::new(String::new()),
            crashed: Cell::new(false),
            released: Rc::new(Cell::new(false)),
        }
    }

    pub fn add_element(&self, locator: &ElementLocator, element: ScriptedElement) {
        self.elements.borrow_mut().insert(locator.clone(), element);
    }

    /// Reply for any script containing `fragment`.
    pub fn on_script(&self, fragment: &str, reply: Value) {
        self.scripts.borrow_mut().push((fragment.to_string(), reply));
    }

    pub fn set_page_source(&self, html: &str) {
        *self.page_source.borrow_mut() = html.to_string();
    }

    /// Every later call fails with a session error.
    pub fn crash(&self) {
        self.crashed.set(true);
    }

    /// Flag that turns true once this driver is dropped.
    pub fn release_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.released)
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.borrow().clone()
    }

    pub fn typed_text(&self, locator: &ElementLocator) -> Option<String> {
        self.typed.borrow().get(locator).cloned()
    }

    pub fn find_calls(&self, locator: &ElementLocator) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, DriverCall::Find { locator: l, .. } if l == locator))
            .count()
    }

    pub fn click_attempts(&self, locator: &ElementLocator) -> usize {
        let owners = self.handle_owners();
        self.calls
            .borrow()
            .iter()
            .filter(|call| match call {
                DriverCall::Click { id, .. } => owners.get(id) == Some(locator),
                _ => false,
            })
            .count()
    }

    /// Operations issued on a handle after its locator had been looked up
    /// again, i.e. handles carried over from an earlier attempt.
    pub fn reused_handles(&self) -> usize {
        let owners = self.handle_owners();
        let mut current: HashMap<ElementLocator, HashSet<u64>> = HashMap::new();
        let mut reused = 0;

        for call in self.calls.borrow().iter() {
            let id = match call {
                DriverCall::Find { locator, ids } => {
                    current.insert(locator.clone(), ids.iter().copied().collect());
                    continue;
                }
                DriverCall::IsDisplayed { id, .. }
                | DriverCall::IsEnabled { id }
                | DriverCall::Click { id, .. }
                | DriverCall::Clear { id }
                | DriverCall::SendKeys { id, .. }
                | DriverCall::Attribute { id, .. }
                | DriverCall::Text { id }
                | DriverCall::Css { id, .. } => *id,
                _ => continue,
            };
            let fresh = owners
                .get(&id)
                .and_then(|locator| current.get(locator))
                .map_or(false, |ids| ids.contains(&id));
            if !fresh {
                reused += 1;
            }
        }
        reused
    }

    pub fn current_window(&self) -> WindowId {
        self.current_window.borrow().clone()
    }

    fn handle_owners(&self) -> HashMap<u64, ElementLocator> {
        let mut owners = HashMap::new();
        for call in self.calls.borrow().iter() {
            if let DriverCall::Find { locator, ids } = call {
                for id in ids {
                    owners.insert(*id, locator.clone());
                }
            }
        }
        owners
    }

    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn record(&self, call: DriverCall) {
        self.calls.borrow_mut().push(call);
    }

    fn check_session(&self) -> DriverResult<()> {
        if self.crashed.get() {
            return Err(DriverError::Session("browser process exited".to_string()));
        }
        Ok(())
    }

    /// Resolves a handle back to its element, applying staleness rules.
    fn live(&self, handle: &ScriptedHandle, counts_as_read: bool) -> DriverResult<ScriptedElement> {
        self.check_session()?;
        let mut elements = self.elements.borrow_mut();
        let element = elements
            .get_mut(&handle.locator)
            .ok_or_else(|| DriverError::StaleReference(format!("node {}", handle.id)))?;

        if !element.present(self.now()) {
            return Err(DriverError::StaleReference(format!(
                "node {} is no longer attached",
                handle.id
            )));
        }
        if counts_as_read && element.stale_reads > 0 {
            element.stale_reads -= 1;
            return Err(DriverError::StaleReference(format!(
                "node {} was re-rendered",
                handle.id
            )));
        }
        Ok(element.clone())
    }

    fn promote_pending_windows(&self) {
        let now = Instant::now();
        let mut pending = self.pending_windows.borrow_mut();
        let (ready, waiting): (Vec<_>, Vec<_>) = pending.drain(..).partition(|(at, _)| *at <= now);
        *pending = waiting;
        self.windows
            .borrow_mut()
            .extend(ready.into_iter().map(|(_, id)| id));
    }
}

impl UiDriver for ScriptedDriver {
    type Handle = ScriptedHandle;

    fn find_element(&self, locator: &ElementLocator) -> DriverResult<ScriptedHandle> {
        self.find_elements(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NotFound(locator.to_string()))
    }

    fn find_elements(&self, locator: &ElementLocator) -> DriverResult<Vec<ScriptedHandle>> {
        self.check_session()?;
        let now = self.now();
        let count = match self.elements.borrow().get(locator) {
            Some(element) if element.invalid_selector => {
                return Err(DriverError::InvalidSelector(locator.to_string()));
            }
            Some(element) if element.present(now) => element.matches.at(now).unwrap_or(0),
            _ => 0,
        };

        let handles: Vec<ScriptedHandle> = (0..count)
            .map(|_| {
                let id = self.next_id.get();
                self.next_id.set(id + 1);
                ScriptedHandle {
                    id,
                    locator: locator.clone(),
                }
            })
            .collect();

        self.record(DriverCall::Find {
            locator: locator.clone(),
            ids: handles.iter().map(|h| h.id).collect(),
        });
        Ok(handles)
    }

    fn is_displayed(&self, element: &ScriptedHandle) -> DriverResult<bool> {
        let live = self.live(element, true);
        let shown = live.as_ref().map_or(false, |e| e.displayed(self.now()));
        self.record(DriverCall::IsDisplayed {
            id: element.id,
            shown,
        });
        live.map(|_| shown)
    }

    fn is_enabled(&self, element: &ScriptedHandle) -> DriverResult<bool> {
        self.record(DriverCall::IsEnabled { id: element.id });
        let live = self.live(element, true)?;
        Ok(live.enabled_at.map_or(false, |at| self.now() >= at))
    }

    fn click(&self, element: &ScriptedHandle) -> DriverResult<()> {
        let result = self.live(element, false).and_then(|live| {
            if live.stale_clicks > 0 {
                if let Some(scripted) = self.elements.borrow_mut().get_mut(&element.locator) {
                    scripted.stale_clicks -= 1;
                }
                return Err(DriverError::StaleReference(format!(
                    "node {} was re-rendered",
                    element.id
                )));
            }
            if self.now() < live.intercepted_until {
                return Err(DriverError::ClickIntercepted(format!(
                    "{} is covered by an overlay",
                    element.locator
                )));
            }
            if let Some(delay) = live.opens_tab_after {
                let id = format!("window-{}", self.next_id.get());
                self.next_id.set(self.next_id.get() + 1);
                self.pending_windows
                    .borrow_mut()
                    .push((Instant::now() + delay, id));
            }
            Ok(())
        });
        self.record(DriverCall::Click {
            id: element.id,
            ok: result.is_ok(),
        });
        result
    }

    fn clear(&self, element: &ScriptedHandle) -> DriverResult<()> {
        self.record(DriverCall::Clear { id: element.id });
        self.live(element, true)?;
        self.typed
            .borrow_mut()
            .insert(element.locator.clone(), String::new());
        Ok(())
    }

    fn send_keys(&self, element: &ScriptedHandle, text: &str) -> DriverResult<()> {
        self.record(DriverCall::SendKeys {
            id: element.id,
            text: text.to_string(),
        });
        self.live(element, true)?;
        self.typed
            .borrow_mut()
            .entry(element.locator.clone())
            .or_default()
            .push_str(text);
        Ok(())
    }

    fn attribute(&self, element: &ScriptedHandle, name: &str) -> DriverResult<Option<String>> {
        self.record(DriverCall::Attribute {
            id: element.id,
            name: name.to_string(),
        });
        let live = self.live(element, true)?;
        if name == "value" {
            if let Some(typed) = self.typed.borrow().get(&element.locator) {
                return Ok(Some(typed.clone()));
            }
        }
        Ok(live
            .attributes
            .get(name)
            .and_then(|timeline| timeline.at(self.now())))
    }

    fn text(&self, element: &ScriptedHandle) -> DriverResult<String> {
        self.record(DriverCall::Text { id: element.id });
        let live = self.live(element, true)?;
        Ok(live.text.at(self.now()).unwrap_or_default())
    }

    fn css_property(&self, element: &ScriptedHandle, name: &str) -> DriverResult<String> {
        self.record(DriverCall::Css {
            id: element.id,
            name: name.to_string(),
        });
        let live = self.live(element, true)?;
        Ok(live
            .css
            .get(name)
            .and_then(|timeline| timeline.at(self.now()))
            .unwrap_or_default())
    }

    fn execute_script(&self, script: &str, element: Option<&ScriptedHandle>) -> DriverResult<Value> {
        self.record(DriverCall::Script {
            script: script.to_string(),
        });
        self.check_session()?;
        if let Some(element) = element {
            self.live(element, true)?;
        }
        Ok(self
            .scripts
            .borrow()
            .iter()
            .find(|(fragment, _)| script.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Value::Null))
    }

    fn window_handles(&self) -> DriverResult<Vec<WindowId>> {
        self.check_session()?;
        self.promote_pending_windows();
        Ok(self.windows.borrow().clone())
    }

    fn switch_to_window(&self, id: &WindowId) -> DriverResult<()> {
        self.record(DriverCall::SwitchWindow { id: id.clone() });
        self.check_session()?;
        if !self.windows.borrow().contains(id) {
            return Err(DriverError::NoSuchWindow(id.clone()));
        }
        *self.current_window.borrow_mut() = id.clone();
        Ok(())
    }

    fn close_window(&self) -> DriverResult<()> {
        self.record(DriverCall::CloseWindow);
        self.check_session()?;
        let current = self.current_window();
        self.windows.borrow_mut().retain(|id| *id != current);
        Ok(())
    }

    fn current_url(&self) -> DriverResult<String> {
        self.check_session()?;
        Ok(self.url.borrow().clone())
    }

    fn navigate(&self, url: &str) -> DriverResult<()> {
        self.record(DriverCall::Navigate {
            url: url.to_string(),
        });
        self.check_session()?;
        *self.url.borrow_mut() = url.to_string();
        Ok(())
    }

    fn page_source(&self) -> DriverResult<String> {
        self.check_session()?;
        Ok(self.page_source.borrow().clone())
    }

    fn screenshot(&self) -> DriverResult<Vec<u8>> {
        self.check_session()?;
        Ok(FAKE_PNG.to_vec())
    }
}

impl Drop for ScriptedDriver {
    fn drop(&mut self) {
        self.released.set(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elements_follow_their_timeline() {
        let driver = ScriptedDriver::new();
        let locator = ElementLocator::css("#late");
        driver.add_element(
            &locator,
            ScriptedElement::new().appears_at(Duration::from_millis(100)),
        );

        assert!(matches!(
            driver.find_element(&locator),
            Err(DriverError::NotFound(_))
        ));
        std::thread::sleep(Duration::from_millis(120));
        let handle = driver.find_element(&locator).unwrap();
        assert!(driver.is_displayed(&handle).unwrap());
    }

    #[test]
    fn test_removed_elements_turn_stale() {
        let driver = ScriptedDriver::new();
        let locator = ElementLocator::css("#gone");
        driver.add_element(
            &locator,
            ScriptedElement::new().removed_at(Duration::from_millis(50)),
        );

        let handle = driver.find_element(&locator).unwrap();
        std::thread::sleep(Duration::from_millis(60));
        assert!(matches!(
            driver.text(&handle),
            Err(DriverError::StaleReference(_))
        ));
    }

    #[test]
    fn test_reused_handles_are_detected() {
        let driver = ScriptedDriver::new();
        let locator = ElementLocator::css("#title");
        driver.add_element(&locator, ScriptedElement::new().text("Popular"));

        let first = driver.find_element(&locator).unwrap();
        driver.text(&first).unwrap();
        assert_eq!(driver.reused_handles(), 0);

        let _second = driver.find_element(&locator).unwrap();
        driver.text(&first).unwrap();
        assert_eq!(driver.reused_handles(), 1);
    }

    #[test]
    fn test_typed_text_shadows_value_attribute() {
        let driver = ScriptedDriver::new();
        let locator = ElementLocator::css("input");
        driver.add_element(&locator, ScriptedElement::new().attribute("value", "old"));

        let handle = driver.find_element(&locator).unwrap();
        assert_eq!(driver.attribute(&handle, "value").unwrap().as_deref(), Some("old"));
        driver.clear(&handle).unwrap();
        driver.send_keys(&handle, "new").unwrap();
        assert_eq!(driver.attribute(&handle, "value").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn test_crash_fails_every_call() {
        let driver = ScriptedDriver::new();
        driver.crash();
        assert!(matches!(
            driver.window_handles(),
            Err(DriverError::Session(_))
        ));
        assert!(matches!(
            driver.find_elements(&ElementLocator::css("body")),
            Err(DriverError::Session(_))
        ));
    }
}
