//! # slide-convert
//!
//! Turns one HTML slide into an editable PowerPoint file without anyone clicking through the
//! browser-based converter. The conversion itself happens in-page, through the `dom-to-pptx`
//! bundle; this crate orchestrates everything around it.
//!
//! ## Features
//!
//! - **Content Server**: serves the conversion page and its scripts on a loopback port
//! - **Headless Driver**: launches Chrome, loads the page, hands it the slide, waits for the
//!   page to report success or failure, and always tears the browser and server down
//! - **Hosted page**: the same server can host the paste-and-click page for interactive use
//!
//! ## Headless conversion
//!
//! ```bash
//! # Convert slide.html into ./Slide.pptx
//! cargo run --bin slide-convert -- convert slide.html --download-dir .
//!
//! # Host the interactive page on http://127.0.0.1:3001
//! cargo run --bin slide-convert -- serve
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use slide_convert::{ConversionRequest, DriverConfig, HeadlessDriver};
//!
//! let request = ConversionRequest::new(r#"<div class="slide-container"><h1>Title</h1></div>"#);
//! let driver = HeadlessDriver::new(DriverConfig::new().download_dir("out"));
//!
//! let result = driver.run(&request);
//! if result.is_success() {
//!     println!("Wrote {:?}", result.artifact);
//! } else {
//!     eprintln!("Failed: {:?}", result.error_message);
//! }
//! ```
//!
//! The artifact lands in the configured download directory under `request.options.file_name`
//! (`Slide.pptx` by default).
//!
//! ## Module Overview
//!
//! - [`server`]: the static content server
//! - [`browser`]: browser launch options and the Chrome-backed conversion page
//! - [`conversion`]: requests, status tracking, polling, and the headless driver
//! - [`error`]: Error types and result aliases

pub mod browser;
pub mod conversion;
pub mod error;
pub mod server;

pub use browser::{BrowserLauncher, BrowserSession, ChromeLauncher, ConversionPage, LaunchOptions};
pub use conversion::{ConversionOptions, ConversionRequest, DriverConfig, DriverState, HeadlessDriver, PollOutcome,
                     SessionResult, SessionStatus, Signal, StatusMarkers, poll_until, run_headless_conversion};
pub use error::{ConverterError, FailureKind, Result};
pub use server::{ContentServer, ServerConfig};
