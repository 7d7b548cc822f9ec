pub mod browser;
pub mod core;
pub mod dom;
pub mod errors;
pub mod harness;
pub mod scenario;
pub mod testing;
pub mod types;
pub mod utils;
pub mod wait;

pub use browser::{BrowserSession, ChromeDriver};
pub use crate::core::{Config, ElementLocator, Strategy, UiDriver, WaitConfig};
pub use errors::{BrowserError, DriverError, WaitError};
pub use types::*;
pub use wait::{PollOutcome, Probe, WaitEngine};
