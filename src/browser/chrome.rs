use crate::core::{ElementLocator, Strategy, UiDriver};
use crate::errors::{DriverError, DriverResult};
use crate::types::WindowId;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, Tab};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, trace};

/// Page-side registry that maps handle ids to the nodes they were created for.
const REGISTRY: &str = "window.__pageWait";

const IS_DISPLAYED: &str = r#"
    const el = arguments[0];
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') {
        return false;
    }
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
"#;

const IS_ENABLED: &str = r#"
    const el = arguments[0];
    return !(el.disabled === true || el.closest('fieldset[disabled]') !== null);
"#;

const CLICK: &str = r#"
    const el = arguments[0];
    el.scrollIntoView({ block: 'center', inline: 'center' });
    const rect = el.getBoundingClientRect();
    const hit = document.elementFromPoint(rect.left + rect.width / 2, rect.top + rect.height / 2);
    if (hit && hit !== el && !el.contains(hit)) {
        let name = hit.tagName.toLowerCase();
        if (hit.id) name += '#' + hit.id;
        if (typeof hit.className === 'string' && hit.className.trim()) {
            name += '.' + hit.className.trim().split(/\s+/).join('.');
        }
        return name;
    }
    el.click();
    return null;
"#;

const CLEAR: &str = r#"
    const el = arguments[0];
    el.focus();
    if ('value' in el) {
        el.value = '';
    } else if (el.isContentEditable) {
        el.textContent = '';
    }
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return null;
"#;

const FOCUS: &str = r#"
    arguments[0].focus();
    return document.activeElement === arguments[0];
"#;

const TEXT: &str = "return arguments[0].innerText || '';";

/// Handle to a node found by [`ChromeDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChromeElement {
    id: u64,
}

/// Envelope every script returns, serialized with `JSON.stringify`.
#[derive(Debug, Deserialize)]
struct ScriptReply {
    #[serde(default)]
    stale: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    value: Value,
    error: Option<String>,
}

/// [`UiDriver`] backed by a headless Chrome instance.
///
/// Nodes found through a locator are recorded in a page-side registry and
/// addressed by id afterwards. A node that left the document (or a registry
/// lost to navigation) reports a stale reference.
pub struct ChromeDriver {
    browser: Browser,
    current: RwLock<Arc<Tab>>,
    closed: Mutex<HashSet<WindowId>>,
}

impl ChromeDriver {
    pub fn new(browser: Browser) -> DriverResult<Self> {
        let tab = browser.wait_for_initial_tab().map_err(classify)?;
        debug!(tab = %tab.get_target_id(), "attached to initial tab");
        Ok(Self {
            browser,
            current: RwLock::new(tab),
            closed: Mutex::new(HashSet::new()),
        })
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    fn tab(&self) -> DriverResult<Arc<Tab>> {
        self.current
            .read()
            .map(|tab| Arc::clone(&*tab))
            .map_err(|_| DriverError::Session("tab lock poisoned".to_string()))
    }

    fn tabs(&self) -> DriverResult<Vec<Arc<Tab>>> {
        let closed = self
            .closed
            .lock()
            .map_err(|_| DriverError::Session("window lock poisoned".to_string()))?;
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|_| DriverError::Session("tab list lock poisoned".to_string()))?;
        Ok(tabs
            .iter()
            .filter(|tab| !closed.contains(tab.get_target_id()))
            .cloned()
            .collect())
    }

    /// Evaluates a wrapped script and unpacks its reply envelope.
    fn evaluate(&self, expression: &str) -> DriverResult<ScriptReply> {
        trace!(chars = expression.len(), "evaluating script");
        let result = self.tab()?.evaluate(expression, false).map_err(classify)?;
        let raw = match result.value {
            Some(Value::String(raw)) => raw,
            other => {
                return Err(DriverError::Session(format!(
                    "unexpected script result: {:?}",
                    other
                )))
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| DriverError::Session(format!("malformed script reply: {}", e)))
    }

    /// Runs `body` with the node behind `element` as `arguments[0]`.
    fn call_on(&self, element: &ChromeElement, body: &str) -> DriverResult<Value> {
        let reply = self.evaluate(&element_call(element.id, body))?;
        if reply.stale {
            return Err(DriverError::StaleReference(format!(
                "node {} is no longer attached to the document",
                element.id
            )));
        }
        unpack(reply)
    }

    fn lookup(&self, locator: &ElementLocator, first_only: bool) -> DriverResult<Vec<ChromeElement>> {
        let reply = self.evaluate(&find_call(locator, first_only))?;
        if reply.invalid {
            return Err(DriverError::InvalidSelector(format!(
                "{}: {}",
                locator,
                reply.error.unwrap_or_default()
            )));
        }
        let ids: Vec<u64> = serde_json::from_value(unpack(reply)?)
            .map_err(|e| DriverError::Session(format!("malformed node ids: {}", e)))?;
        trace!(%locator, matches = ids.len(), "lookup");
        Ok(ids.into_iter().map(|id| ChromeElement { id }).collect())
    }
}

fn unpack(reply: ScriptReply) -> DriverResult<Value> {
    match reply.error {
        Some(error) => Err(DriverError::Session(format!("script failed: {}", error))),
        None => Ok(reply.value),
    }
}

fn element_call(id: u64, body: &str) -> String {
    format!(
        r#"(function() {{
    const registry = {registry};
    const el = registry && registry.nodes.get({id});
    if (!el || !el.isConnected) return JSON.stringify({{ stale: true }});
    try {{
        return JSON.stringify({{ value: (function() {{ {body} }}).call(null, el) }});
    }} catch (e) {{
        return JSON.stringify({{ error: String(e) }});
    }}
}})()"#,
        registry = REGISTRY,
        id = id,
        body = body
    )
}

fn page_call(body: &str) -> String {
    format!(
        r#"(function() {{
    try {{
        return JSON.stringify({{ value: (function() {{ {body} }}).call(null) }});
    }} catch (e) {{
        return JSON.stringify({{ error: String(e) }});
    }}
}})()"#,
        body = body
    )
}

/// Script that registers the nodes matching `locator` and returns their ids.
///
/// A node that stays attached keeps the id it was first given, so repeated
/// lookups do not grow the registry. With `first_only` only the first match
/// is registered.
fn find_call(locator: &ElementLocator, first_only: bool) -> String {
    let selector = js_string(locator.selector());
    let query = match (locator.strategy(), locator.to_css()) {
        (Strategy::XPath, _) | (_, None) => format!(
            r#"(function() {{
            const snapshot = document.evaluate({selector}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
            const nodes = [];
            for (let i = 0; i < snapshot.snapshotLength; i++) nodes.push(snapshot.snapshotItem(i));
            return nodes;
        }})()"#,
            selector = selector
        ),
        (_, Some(css)) => format!(
            "Array.from(document.querySelectorAll({}))",
            js_string(&css)
        ),
    };

    format!(
        r#"(function() {{
    const registry = {registry} = {registry} || {{ next: 1, nodes: new Map(), ids: new WeakMap() }};
    for (const [id, node] of registry.nodes) {{
        if (!node.isConnected) {{
            registry.nodes.delete(id);
            registry.ids.delete(node);
        }}
    }}
    let found;
    try {{
        found = {query};
    }} catch (e) {{
        return JSON.stringify({{ invalid: true, error: String(e) }});
    }}
    if ({first_only}) found = found.slice(0, 1);
    return JSON.stringify({{ value: found.map(node => {{
        let id = registry.ids.get(node);
        if (id === undefined) {{
            id = registry.next++;
            registry.ids.set(node, id);
            registry.nodes.set(id, node);
        }}
        return id;
    }}) }});
}})()"#,
        registry = REGISTRY,
        query = query,
        first_only = first_only
    )
}

fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

/// Maps an error from the Chrome backend onto a driver error kind.
pub fn classify(err: anyhow::Error) -> DriverError {
    let message = err.to_string();
    let lower = message.to_lowercase();

    if lower.contains("no element found")
        || lower.contains("no node with given id")
        || lower.contains("could not find node")
    {
        DriverError::NotFound(message)
    } else if lower.contains("cannot find context")
        || lower.contains("execution context was destroyed")
        || lower.contains("dom error while querying")
    {
        DriverError::StaleReference(message)
    } else if lower.contains("not a valid selector") {
        DriverError::InvalidSelector(message)
    } else if lower.contains("timeout") || lower.contains("timed out") {
        DriverError::Timeout(message)
    } else {
        DriverError::Session(message)
    }
}

impl UiDriver for ChromeDriver {
    type Handle = ChromeElement;

    fn find_element(&self, locator: &ElementLocator) -> DriverResult<ChromeElement> {
        self.lookup(locator, true)?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NotFound(locator.to_string()))
    }

    fn find_elements(&self, locator: &ElementLocator) -> DriverResult<Vec<ChromeElement>> {
        self.lookup(locator, false)
    }

    fn is_displayed(&self, element: &ChromeElement) -> DriverResult<bool> {
        Ok(self.call_on(element, IS_DISPLAYED)?.as_bool().unwrap_or(false))
    }

    fn is_enabled(&self, element: &ChromeElement) -> DriverResult<bool> {
        Ok(self.call_on(element, IS_ENABLED)?.as_bool().unwrap_or(false))
    }

    fn click(&self, element: &ChromeElement) -> DriverResult<()> {
        match self.call_on(element, CLICK)? {
            Value::String(covering) => Err(DriverError::ClickIntercepted(format!(
                "{} would receive the click",
                covering
            ))),
            _ => Ok(()),
        }
    }

    fn clear(&self, element: &ChromeElement) -> DriverResult<()> {
        self.call_on(element, CLEAR).map(|_| ())
    }

    fn send_keys(&self, element: &ChromeElement, text: &str) -> DriverResult<()> {
        if self.call_on(element, FOCUS)?.as_bool() != Some(true) {
            return Err(DriverError::ClickIntercepted(format!(
                "node {} did not take focus",
                element.id
            )));
        }
        self.tab()?.type_str(text).map_err(classify)?;
        Ok(())
    }

    fn attribute(&self, element: &ChromeElement, name: &str) -> DriverResult<Option<String>> {
        let body = format!(
            r#"const el = arguments[0];
            const name = {name};
            const prop = el[name];
            if (prop !== undefined && prop !== null && typeof prop !== 'object' && typeof prop !== 'function') {{
                return String(prop);
            }}
            return el.getAttribute(name);"#,
            name = js_string(name)
        );
        Ok(match self.call_on(element, &body)? {
            Value::String(value) => Some(value),
            _ => None,
        })
    }

    fn text(&self, element: &ChromeElement) -> DriverResult<String> {
        Ok(self
            .call_on(element, TEXT)?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    fn css_property(&self, element: &ChromeElement, name: &str) -> DriverResult<String> {
        let body = format!(
            "return window.getComputedStyle(arguments[0]).getPropertyValue({});",
            js_string(name)
        );
        Ok(self
            .call_on(element, &body)?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    fn execute_script(&self, script: &str, element: Option<&ChromeElement>) -> DriverResult<Value> {
        match element {
            Some(element) => self.call_on(element, script),
            None => unpack(self.evaluate(&page_call(script))?),
        }
    }

    fn window_handles(&self) -> DriverResult<Vec<WindowId>> {
        Ok(self
            .tabs()?
            .iter()
            .map(|tab| tab.get_target_id().to_string())
            .collect())
    }

    fn switch_to_window(&self, id: &WindowId) -> DriverResult<()> {
        let tab = self
            .tabs()?
            .into_iter()
            .find(|tab| tab.get_target_id() == id)
            .ok_or_else(|| DriverError::NoSuchWindow(id.clone()))?;
        tab.activate().map_err(classify)?;

        let mut current = self
            .current
            .write()
            .map_err(|_| DriverError::Session("tab lock poisoned".to_string()))?;
        *current = tab;
        Ok(())
    }

    fn close_window(&self) -> DriverResult<()> {
        let tab = self.tab()?;
        tab.close(true).map_err(classify)?;
        self.closed
            .lock()
            .map_err(|_| DriverError::Session("window lock poisoned".to_string()))?
            .insert(tab.get_target_id().to_string());
        Ok(())
    }

    fn current_url(&self) -> DriverResult<String> {
        Ok(self.tab()?.get_url())
    }

    fn navigate(&self, url: &str) -> DriverResult<()> {
        let tab = self.tab()?;
        tab.navigate_to(url).map_err(classify)?;
        tab.wait_until_navigated().map_err(classify)?;
        Ok(())
    }

    fn page_source(&self) -> DriverResult<String> {
        self.tab()?.get_content().map_err(classify)
    }

    fn screenshot(&self) -> DriverResult<Vec<u8>> {
        self.tab()?
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(classify)
    }
}
