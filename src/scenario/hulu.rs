use super::page::HuluPage;
use super::sink::TitleSink;
use crate::core::UiDriver;
use crate::dom::TitleExtractor;
use crate::errors::Result;
use crate::wait::WaitEngine;
use tracing::info;

pub const LOGIN_URL: &str = "https://auth.hulu.com/web/login";

/// Log in, open the movies tab and scrape its titles.
pub struct HuluScenario<'d, D: UiDriver> {
    page: HuluPage<'d, D>,
    extractor: TitleExtractor,
}

impl<'d, D: UiDriver> HuluScenario<'d, D> {
    pub fn new(engine: WaitEngine<'d, D>) -> Result<Self> {
        Ok(Self {
            page: HuluPage::new(engine),
            extractor: TitleExtractor::new()?,
        })
    }

    pub fn page(&self) -> &HuluPage<'d, D> {
        &self.page
    }

    pub fn login(&self, username: &str, password: &str, profile: &str) -> Result<()> {
        info!(username, profile, "logging in");
        self.page.engine().navigate(LOGIN_URL)?;
        self.page.wait_for_login_form()?;
        self.page.enter_email(username)?;
        self.page.enter_password(password)?;
        self.page.submit_login()?;
        self.page.wait_for_login_to_finish()?;
        self.page.choose_profile(profile)?;
        Ok(())
    }

    pub fn navigate_to_movie_tab(&self) -> Result<()> {
        info!("opening movies tab");
        self.page.wait_for_global_nav()?;
        self.page.open_home()?;
        self.page.open_movies()?;
        self.page.wait_for_catalogue()?;
        Ok(())
    }

    /// Titles currently rendered on the movies tab.
    pub fn movie_tab_titles(&self) -> Result<Vec<String>> {
        let html = self.page.engine().driver().page_source()?;
        let titles = self.extractor.extract(&html);
        info!(count = titles.len(), "collected movie titles");
        Ok(titles)
    }

    /// Scrapes the movies tab into `sink`, returning how many titles were written.
    pub fn export_titles(&self, sink: &mut impl TitleSink) -> Result<usize> {
        let titles = self.movie_tab_titles()?;
        sink.write_titles(&titles)?;
        Ok(titles.len())
    }

    /// Closes the current window.
    pub fn close(&self) -> Result<()> {
        self.page.engine().driver().close_window()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WaitConfig;
    use crate::errors::{BrowserError, WaitError};
    use crate::scenario::page::{
        profile, EMAIL_FIELD, FOR_YOU, GLOBAL_NAV, HOME_TAB, LOGIN_BUTTON, LOGIN_MESSAGE,
        MOVIES_TAB, PASSWORD_FIELD, POPULAR,
    };
    use crate::testing::{DriverCall, ScriptedDriver, ScriptedElement};
    use crate::types::ReadinessLevel;
    use serde_json::json;
    use std::time::Duration;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn engine(driver: &ScriptedDriver) -> WaitEngine<'_, ScriptedDriver> {
        WaitEngine::new(driver, WaitConfig::new(ms(2000)).with_poll_interval(ms(50)))
    }

    fn login_page(driver: &ScriptedDriver) {
        driver.on_script("document.readyState", json!("complete"));
        driver.add_element(&LOGIN_MESSAGE, ScriptedElement::new().removed_at(ms(400)));
        driver.add_element(&EMAIL_FIELD, ScriptedElement::new());
        driver.add_element(&PASSWORD_FIELD, ScriptedElement::new());
        driver.add_element(&LOGIN_BUTTON, ScriptedElement::new().intercepted_until(ms(150)));
        driver.add_element(&profile("Kids"), ScriptedElement::new().appears_at(ms(450)));
    }

    #[test]
    fn test_login_fills_form_and_picks_profile() {
        let driver = ScriptedDriver::new();
        login_page(&driver);

        let scenario = HuluScenario::new(engine(&driver)).unwrap();
        scenario
            .login("viewer@example.com", "hunter2", "Kids")
            .unwrap();

        assert_eq!(
            driver.typed_text(&EMAIL_FIELD).as_deref(),
            Some("viewer@example.com")
        );
        assert_eq!(driver.typed_text(&PASSWORD_FIELD).as_deref(), Some("hunter2"));
        assert!(driver.click_attempts(&LOGIN_BUTTON) >= 1);
        assert_eq!(driver.click_attempts(&profile("Kids")), 1);
        assert_eq!(
            driver.calls().first(),
            Some(&DriverCall::Navigate {
                url: LOGIN_URL.to_string()
            })
        );
    }

    #[test]
    fn test_login_fails_on_unknown_profile() {
        let driver = ScriptedDriver::new();
        login_page(&driver);

        let scenario = HuluScenario::new(engine(&driver)).unwrap();
        let err = scenario
            .login("viewer@example.com", "hunter2", "Adults")
            .unwrap_err();
        match err {
            BrowserError::Wait(wait) => {
                assert_eq!(wait.readiness_level(), Some(ReadinessLevel::Present));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_movie_tab_titles_are_exported() {
        let driver = ScriptedDriver::new();
        driver.add_element(&GLOBAL_NAV, ScriptedElement::new());
        driver.add_element(&HOME_TAB, ScriptedElement::new());
        driver.add_element(&MOVIES_TAB, ScriptedElement::new().stale_clicks(1));
        driver.add_element(&FOR_YOU, ScriptedElement::new().visible_at(ms(200)));
        driver.add_element(&POPULAR, ScriptedElement::new());
        driver.set_page_source(
            r#"<div class="StandardEmphasisHorizontalTileThumbnail__content">
                 <img alt="Cover art for Arrival"></div>
               <div class="StandardEmphasisHorizontalTileThumbnail__content">
                 <img alt="Cover art for Paddington 2"></div>"#,
        );

        let scenario = HuluScenario::new(engine(&driver)).unwrap();
        scenario.navigate_to_movie_tab().unwrap();

        let mut sink = Vec::new();
        assert_eq!(scenario.export_titles(&mut sink).unwrap(), 2);
        assert_eq!(sink, vec!["Arrival", "Paddington 2"]);
        assert_eq!(driver.click_attempts(&MOVIES_TAB), 2);

        scenario.close().unwrap();
        assert!(driver.calls().contains(&DriverCall::CloseWindow));
    }

    #[test]
    fn test_missing_navigation_is_a_visibility_failure() {
        let driver = ScriptedDriver::new();
        driver.add_element(&GLOBAL_NAV, ScriptedElement::new().never_visible());

        let scenario = HuluScenario::new(engine(&driver).within(ms(200))).unwrap();
        match scenario.navigate_to_movie_tab().unwrap_err() {
            BrowserError::Wait(WaitError::Readiness { level, .. }) => {
                assert_eq!(level, ReadinessLevel::Visible)
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
