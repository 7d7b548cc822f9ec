use crate::core::{ElementLocator, Strategy, UiDriver};
use crate::errors::WaitResult;
use crate::wait::WaitEngine;

// Login flow
pub const LOGIN_MESSAGE: ElementLocator =
    ElementLocator::from_static(Strategy::Css, "[data-automationid='login-message']");
pub const EMAIL_FIELD: ElementLocator =
    ElementLocator::from_static(Strategy::Css, "[data-automationid='email-field']");
pub const PASSWORD_FIELD: ElementLocator =
    ElementLocator::from_static(Strategy::Css, "[data-automationid='password-field']");
pub const LOGIN_BUTTON: ElementLocator =
    ElementLocator::from_static(Strategy::Css, "[data-automationid='login-button']");

// Global navigation
pub const GLOBAL_NAV: ElementLocator =
    ElementLocator::from_static(Strategy::Css, "[data-testid='global-navigation']");
pub const HOME_TAB: ElementLocator =
    ElementLocator::from_static(Strategy::Css, "[data-automationid='globalnav-home']");
pub const MOVIES_TAB: ElementLocator =
    ElementLocator::from_static(Strategy::Css, "[data-automationid='globalnav-movies']");
pub const MY_STUFF_TAB: ElementLocator =
    ElementLocator::from_static(Strategy::Css, "[data-automationid='globalnav-my-stuff']");
pub const SEARCH_BUTTON: ElementLocator =
    ElementLocator::from_static(Strategy::Css, "[data-automationid='globalnav-search']");

// Catalogue sections
pub const FOR_YOU: ElementLocator = ElementLocator::from_static(Strategy::Id, "for-you");
pub const POPULAR: ElementLocator = ElementLocator::from_static(Strategy::Id, "popular");
pub const TV_FOR_YOU: ElementLocator = ElementLocator::from_static(Strategy::Id, "tv-for-you");

/// Button that switches the account to the viewing profile `name`.
pub fn profile(name: &str) -> ElementLocator {
    ElementLocator::css(format!("[aria-label='Switch profile to {}']", name))
}

/// Streaming site page model: locators above plus one-line actions.
pub struct HuluPage<'d, D: UiDriver> {
    engine: WaitEngine<'d, D>,
}

impl<'d, D: UiDriver> HuluPage<'d, D> {
    pub fn new(engine: WaitEngine<'d, D>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &WaitEngine<'d, D> {
        &self.engine
    }

    pub fn wait_for_login_form(&self) -> WaitResult<()> {
        self.engine.wait_visible(&LOGIN_MESSAGE)
    }

    pub fn enter_email(&self, email: &str) -> WaitResult<()> {
        self.engine.type_into(&EMAIL_FIELD, email)
    }

    pub fn enter_password(&self, password: &str) -> WaitResult<()> {
        self.engine.type_into(&PASSWORD_FIELD, password)
    }

    pub fn submit_login(&self) -> WaitResult<()> {
        self.engine.click(&LOGIN_BUTTON)
    }

    pub fn wait_for_login_to_finish(&self) -> WaitResult<()> {
        self.engine.wait_invisible(&LOGIN_MESSAGE)
    }

    pub fn choose_profile(&self, name: &str) -> WaitResult<()> {
        self.engine.click(&profile(name))
    }

    pub fn wait_for_global_nav(&self) -> WaitResult<()> {
        self.engine.wait_visible(&GLOBAL_NAV)
    }

    pub fn open_home(&self) -> WaitResult<()> {
        self.engine.click(&HOME_TAB)
    }

    pub fn open_movies(&self) -> WaitResult<()> {
        self.engine.click(&MOVIES_TAB)
    }

    pub fn open_my_stuff(&self) -> WaitResult<()> {
        self.engine.click(&MY_STUFF_TAB)
    }

    pub fn open_search(&self) -> WaitResult<()> {
        self.engine.click(&SEARCH_BUTTON)
    }

    /// Waits for the personalised and popular rows of a catalogue tab.
    pub fn wait_for_catalogue(&self) -> WaitResult<()> {
        self.engine.wait_visible(&FOR_YOU)?;
        self.engine.wait_visible(&POPULAR)
    }

    pub fn wait_for_tv_row(&self) -> WaitResult<()> {
        self.engine.wait_visible(&TV_FOR_YOU)
    }
}
