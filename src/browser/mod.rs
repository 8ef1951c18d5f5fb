//! Browser layer: the process boundary the headless driver talks across
//!
//! The driver only needs a handful of page operations, expressed by [`ConversionPage`]. The
//! Chrome-backed implementation lives in [`session`]; tests substitute their own launcher.

pub mod config;
pub mod session;

pub use config::LaunchOptions;
pub use session::{BrowserSession, ChromeLauncher};

use crate::{conversion::ConversionRequest, error::Result};
use std::{path::Path, time::Duration};

/// Starts a browser and hands back the page the conversion runs in
pub trait BrowserLauncher {
    type Page: ConversionPage;

    fn launch(&self) -> Result<Self::Page>;
}

/// Operations the driver performs on the conversion page
pub trait ConversionPage {
    /// Direct downloads into `dir` (absolute) without prompting
    fn set_download_dir(&self, dir: &Path) -> Result<()>;

    /// Load `url` and wait for its load event, giving up after `timeout`
    fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Hand the request to the page's conversion logic without waiting for it
    fn start_conversion(&self, request: &ConversionRequest) -> Result<()>;

    /// Current text of the element matching `selector`, if it exists
    fn status_text(&self, selector: &str) -> Result<Option<String>>;

    /// Shut the browser down; later calls are no-ops
    fn close(&mut self) -> Result<()>;
}
