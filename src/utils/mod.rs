pub mod screenshot;

pub use screenshot::FailureSnapshots;
