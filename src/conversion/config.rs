use crate::{browser::LaunchOptions, conversion::StatusMarkers, error::Result, server::ServerConfig};
use std::{path::PathBuf, time::Duration};

pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Everything a headless run needs to know, with the converter's historical defaults
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Where and what the content server serves
    pub server: ServerConfig,

    /// Page the browser is pointed at, relative to the server root
    pub page: String,

    /// How the browser is launched
    pub browser: LaunchOptions,

    /// CSS selector of the element the page writes its status into
    pub status_selector: String,

    pub markers: StatusMarkers,

    /// Bound on loading the conversion page
    pub navigation_timeout: Duration,

    /// Bound on the in-page conversion, from trigger to terminal status
    pub conversion_timeout: Duration,

    pub poll_interval: Duration,

    /// Wait after the success marker for the download to be flushed
    pub settle_delay: Duration,

    /// Download directory; the running executable's directory when `None`
    pub download_dir: Option<PathBuf>,

    /// Require the artifact on disk before reporting success
    pub verify_artifact: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            page: "converter-auto.html".to_string(),
            browser: LaunchOptions::default(),
            status_selector: "#status".to_string(),
            markers: StatusMarkers::default(),
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            conversion_timeout: DEFAULT_CONVERSION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            download_dir: None,
            verify_artifact: true,
        }
    }
}

impl DriverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = server;
        self
    }

    pub fn page(mut self, page: impl Into<String>) -> Self {
        self.page = page.into();
        self
    }

    pub fn browser(mut self, options: LaunchOptions) -> Self {
        self.browser = options;
        self
    }

    pub fn status_selector(mut self, selector: impl Into<String>) -> Self {
        self.status_selector = selector.into();
        self
    }

    pub fn markers(mut self, markers: StatusMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn conversion_timeout(mut self, timeout: Duration) -> Self {
        self.conversion_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    pub fn verify_artifact(mut self, verify: bool) -> Self {
        self.verify_artifact = verify;
        self
    }

    /// Absolute download directory, created if missing
    ///
    /// Chrome only accepts absolute download paths.
    pub fn resolve_download_dir(&self) -> Result<PathBuf> {
        let dir = match &self.download_dir {
            Some(dir) => dir.clone(),
            None => {
                let exe = std::env::current_exe()?;
                exe.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
            }
        };

        std::fs::create_dir_all(&dir)?;
        Ok(std::fs::canonicalize(dir)?)
    }
}
