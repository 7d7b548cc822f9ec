pub mod config;
pub mod driver;
pub mod locator;

pub use config::{ArtifactConfig, BrowserConfig, Config, WaitConfig};
pub use driver::UiDriver;
pub use locator::{ElementLocator, Strategy};
