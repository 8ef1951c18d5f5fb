//! Conversion requests, in-page status tracking, and the headless driver

pub mod config;
pub mod driver;
pub mod poll;
pub mod request;
pub mod status;

pub use config::DriverConfig;
pub use driver::{DriverState, HeadlessDriver, SessionResult, run_headless_conversion};
pub use poll::{PollOutcome, Signal, poll_until};
pub use request::{ConversionOptions, ConversionRequest};
pub use status::{SessionStatus, StatusMarkers};
