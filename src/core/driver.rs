use crate::core::ElementLocator;
use crate::errors::DriverResult;
use crate::types::WindowId;
use serde_json::Value;
use std::fmt::Debug;

/// Capability surface the wait engine needs from a browser automation backend.
///
/// Every call is synchronous and blocks until the backend answers. A handle
/// is a transient reference to a live DOM node: it may turn stale at any
/// moment, in which case operations on it return
/// [`DriverError::StaleReference`](crate::errors::DriverError::StaleReference).
/// The engine never keeps a handle past the poll attempt that produced it.
pub trait UiDriver {
    type Handle: Clone + Debug;

    /// First match, or `NotFound`.
    fn find_element(&self, locator: &ElementLocator) -> DriverResult<Self::Handle>;

    /// All matches, possibly none.
    fn find_elements(&self, locator: &ElementLocator) -> DriverResult<Vec<Self::Handle>>;

    fn is_displayed(&self, element: &Self::Handle) -> DriverResult<bool>;

    fn is_enabled(&self, element: &Self::Handle) -> DriverResult<bool>;

    /// Reports `ClickIntercepted` when another element would receive the click.
    fn click(&self, element: &Self::Handle) -> DriverResult<()>;

    fn clear(&self, element: &Self::Handle) -> DriverResult<()>;

    fn send_keys(&self, element: &Self::Handle, text: &str) -> DriverResult<()>;

    fn attribute(&self, element: &Self::Handle, name: &str) -> DriverResult<Option<String>>;

    fn text(&self, element: &Self::Handle) -> DriverResult<String>;

    fn css_property(&self, element: &Self::Handle, name: &str) -> DriverResult<String>;

    /// Runs a script body in the page. When `element` is given it is passed
    /// as `arguments[0]`; the body produces its result with `return`.
    fn execute_script(&self, script: &str, element: Option<&Self::Handle>) -> DriverResult<Value>;

    /// Open windows in creation order.
    fn window_handles(&self) -> DriverResult<Vec<WindowId>>;

    fn switch_to_window(&self, id: &WindowId) -> DriverResult<()>;

    /// Closes the current window. Callers switch to another one afterwards.
    fn close_window(&self) -> DriverResult<()>;

    fn current_url(&self) -> DriverResult<String>;

    fn navigate(&self, url: &str) -> DriverResult<()>;

    fn page_source(&self) -> DriverResult<String>;

    /// PNG bytes of the current viewport.
    fn screenshot(&self) -> DriverResult<Vec<u8>>;
}
