//! Page model and scripted flows for a streaming site.

pub mod hulu;
pub mod page;
pub mod sink;

pub use hulu::{HuluScenario, LOGIN_URL};
pub use page::HuluPage;
pub use sink::{FileSink, TitleSink};
