use crate::{browser::{BrowserLauncher, ConversionPage, config::LaunchOptions},
            conversion::ConversionRequest,
            error::{ConverterError, Result}};
use headless_chrome::{Browser, Tab, protocol::cdp::Page};
use std::{path::Path,
          sync::Arc,
          time::{Duration, Instant}};

/// Launches Chrome/Chromium through the DevTools protocol
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    options: LaunchOptions,
}

impl ChromeLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LaunchOptions {
        &self.options
    }
}

impl BrowserLauncher for ChromeLauncher {
    type Page = BrowserSession;

    fn launch(&self) -> Result<BrowserSession> {
        BrowserSession::launch(&self.options)
    }
}

/// A Chrome instance with the single tab the conversion page is loaded into
pub struct BrowserSession {
    /// Dropping the browser kills the Chrome process
    browser: Option<Browser>,

    tab: Arc<Tab>,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: &LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        launch_opts.headless = options.headless;
        launch_opts.sandbox = options.sandbox;
        launch_opts.window_size = Some((options.window_width, options.window_height));

        // Default idle timeout is 30 seconds, shorter than a slow conversion
        launch_opts.idle_browser_timeout = options.idle_timeout;

        if let Some(path) = &options.chrome_path {
            launch_opts.path = Some(path.clone());
        }

        if let Some(dir) = &options.user_data_dir {
            launch_opts.user_data_dir = Some(dir.clone());
        }

        log::info!(
            "Launching {} browser (sandbox: {})",
            if options.headless { "headless" } else { "headed" },
            options.sandbox
        );

        let browser = Browser::new(launch_opts).map_err(|e| ConverterError::LaunchFailed(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| ConverterError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        Ok(Self { browser: Some(browser), tab })
    }

    /// The tab, as long as the browser is still open
    pub fn tab(&self) -> Result<&Arc<Tab>> {
        match self.browser {
            Some(_) => Ok(&self.tab),
            None => Err(ConverterError::EvaluationFailed("Browser already closed".to_string())),
        }
    }

    pub fn is_open(&self) -> bool {
        self.browser.is_some()
    }

    /// Evaluate a script in the page and return its value
    pub fn evaluate(&self, script: &str) -> Result<Option<serde_json::Value>> {
        let result = self
            .tab()?
            .evaluate(script, false)
            .map_err(|e| ConverterError::EvaluationFailed(e.to_string()))?;

        Ok(result.value)
    }
}

impl ConversionPage for BrowserSession {
    fn set_download_dir(&self, dir: &Path) -> Result<()> {
        self.tab()?
            .call_method(Page::SetDownloadBehavior {
                behavior: Page::SetDownloadBehaviorBehaviorOption::Allow,
                download_path: Some(dir.to_string_lossy().into_owned()),
            })
            .map_err(|e| ConverterError::LaunchFailed(format!("Failed to set download directory: {}", e)))?;

        log::debug!("Downloads directed to {}", dir.display());
        Ok(())
    }

    fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let tab = self.tab()?;
        tab.set_default_timeout(timeout);

        let started = Instant::now();
        let loaded = tab.navigate_to(url).and_then(|tab| tab.wait_until_navigated());

        match loaded {
            Ok(_) => Ok(()),
            Err(_) if started.elapsed() >= timeout => Err(ConverterError::NavigationTimeout(timeout)),
            Err(e) => Err(ConverterError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e))),
        }
    }

    fn start_conversion(&self, request: &ConversionRequest) -> Result<()> {
        // The call returns a promise; progress is observed through the status element instead
        let script = format!(
            r#"(function() {{
                if (typeof window.convertSlide !== 'function') {{
                    throw new Error('convertSlide is not defined on this page');
                }}
                window.convertSlide({});
                return true;
            }})()"#,
            request.to_json()?
        );

        self.evaluate(&script)?;
        Ok(())
    }

    fn status_text(&self, selector: &str) -> Result<Option<String>> {
        let script = format!(
            r#"(function() {{
                const el = document.querySelector({});
                return el ? el.textContent : null;
            }})()"#,
            serde_json::to_string(selector)?
        );

        Ok(self.evaluate(&script)?.and_then(|value| value.as_str().map(str::to_string)))
    }

    fn close(&mut self) -> Result<()> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };

        // Errors closing the tab are irrelevant once the process goes away
        let _ = self.tab.close(false);
        drop(browser);

        log::info!("Browser closed");
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
