pub mod chrome;
pub mod session;

pub use chrome::{ChromeDriver, ChromeElement};
pub use session::{chrome_args, BrowserSession};
