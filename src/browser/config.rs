use std::{path::PathBuf, time::Duration};

/// Options for launching the headless browser
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run without a visible window
    pub headless: bool,

    /// Viewport width in pixels
    pub window_width: u32,

    /// Viewport height in pixels
    pub window_height: u32,

    /// Chrome/Chromium binary; auto-detected when `None`
    pub chrome_path: Option<PathBuf>,

    /// Profile directory; a temporary one when `None`
    pub user_data_dir: Option<PathBuf>,

    /// Keep Chrome's sandbox enabled
    pub sandbox: bool,

    /// How long the browser may go without CDP traffic before it is torn down
    pub idle_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 720,
            chrome_path: None,
            user_data_dir: None,
            sandbox: false,
            idle_timeout: Duration::from_secs(10 * 60),
        }
    }
}

impl LaunchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }

    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}
