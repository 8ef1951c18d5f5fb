//! Headless conversion driver
//!
//! One run walks Starting → BrowserLaunching → Navigating → Polling → Succeeded | Failed, then
//! always Cleanup: the browser is closed if it was launched, then the server is stopped if it was
//! started. Every error is resolved into a failed [`SessionResult`]; nothing is retried.

use crate::{browser::{BrowserLauncher, ChromeLauncher, ConversionPage},
            conversion::{ConversionRequest, DriverConfig, PollOutcome, SessionStatus, Signal, poll_until},
            error::{ConverterError, FailureKind, Result},
            server::ContentServer};
use serde::Serialize;
use std::{path::{Path, PathBuf},
          time::{Duration, SystemTime}};

/// States of a single headless run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    Starting,
    BrowserLaunching,
    Navigating,
    Polling,
    Succeeded,
    Failed,
    Cleanup,
}

/// Outcome of one headless run
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    /// `Success` or `Error`
    pub status: SessionStatus,

    /// The page's own status text for reported errors, otherwise the driver's error
    pub error_message: Option<String>,

    pub failure: Option<FailureKind>,

    /// Last status text read from the page
    pub status_text: Option<String>,

    /// Where the artifact was expected, on success
    pub artifact: Option<PathBuf>,

    /// States visited, in order
    pub transitions: Vec<DriverState>,
}

impl SessionResult {
    pub fn is_success(&self) -> bool {
        self.status == SessionStatus::Success
    }

    pub fn visited(&self, state: DriverState) -> bool {
        self.transitions.contains(&state)
    }
}

#[derive(Default)]
struct Run {
    transitions: Vec<DriverState>,
    status_text: Option<String>,
}

impl Run {
    fn enter(&mut self, state: DriverState) {
        log::info!("State: {:?}", state);
        self.transitions.push(state);
    }
}

/// Drives one browser against one content server per run
pub struct HeadlessDriver<L: BrowserLauncher = ChromeLauncher> {
    config: DriverConfig,
    launcher: L,
}

impl HeadlessDriver<ChromeLauncher> {
    /// Driver that launches Chrome with `config.browser`
    pub fn new(config: DriverConfig) -> Self {
        let launcher = ChromeLauncher::new(config.browser.clone());
        Self { config, launcher }
    }
}

impl<L: BrowserLauncher> HeadlessDriver<L> {
    pub fn with_launcher(config: DriverConfig, launcher: L) -> Self {
        Self { config, launcher }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Convert `request` and report how it went
    pub fn run(&self, request: &ConversionRequest) -> SessionResult {
        let mut run = Run::default();
        let mut server = None;
        let mut page = None;

        let outcome = self.drive(request, &mut run, &mut server, &mut page);

        match &outcome {
            Ok(_) => run.enter(DriverState::Succeeded),
            Err(e) => {
                log::error!("Conversion failed: {}", e);
                run.enter(DriverState::Failed);
            }
        }

        run.enter(DriverState::Cleanup);
        if let Some(mut page) = page.take() {
            if let Err(e) = page.close() {
                log::warn!("Failed to close browser: {}", e);
            }
        }
        if let Some(mut server) = server.take() {
            server.stop();
        }

        if let Some(text) = &run.status_text {
            log::info!("Final status: {}", text.trim());
        }

        match outcome {
            Ok(artifact) => SessionResult {
                status: SessionStatus::Success,
                error_message: None,
                failure: None,
                status_text: run.status_text,
                artifact: Some(artifact),
                transitions: run.transitions,
            },
            Err(e) => SessionResult {
                status: SessionStatus::Error,
                failure: Some(e.kind()),
                error_message: Some(match e {
                    ConverterError::ConversionReported(text) => text,
                    other => other.to_string(),
                }),
                status_text: run.status_text,
                artifact: None,
                transitions: run.transitions,
            },
        }
    }

    fn drive(
        &self,
        request: &ConversionRequest,
        run: &mut Run,
        server_slot: &mut Option<ContentServer>,
        page_slot: &mut Option<L::Page>,
    ) -> Result<PathBuf> {
        run.enter(DriverState::Starting);

        request.validate_options()?;
        if request.is_blank() {
            log::warn!("Markup is empty; the conversion page will reject it");
        }
        let download_dir = self.config.resolve_download_dir()?;

        let server = server_slot.insert(ContentServer::start(&self.config.server)?);

        // Chrome renames a download whose name is taken, and a leftover file would pass verification
        let artifact = download_dir.join(&request.options.file_name);
        if artifact.is_file() {
            log::warn!("Removing previous artifact {}", artifact.display());
            std::fs::remove_file(&artifact)?;
        }
        let started = SystemTime::now();

        run.enter(DriverState::BrowserLaunching);
        let page = page_slot.insert(self.launcher.launch()?);
        page.set_download_dir(&download_dir)?;

        run.enter(DriverState::Navigating);
        let url = server.url_for(&self.config.page);
        log::info!("Opening {}", url);
        page.navigate(&url, self.config.navigation_timeout)?;
        page.start_conversion(request)?;

        run.enter(DriverState::Polling);
        let markers = &self.config.markers;
        let mut last_status = None;
        let outcome = poll_until(
            || {
                let text = page.status_text(&self.config.status_selector)?.unwrap_or_default();
                let status = markers.classify(&text);
                if last_status != Some(status) {
                    log::info!("Page status: {}", text.trim());
                    last_status = Some(status);
                }
                run.status_text = Some(text.clone());

                Ok(match status {
                    SessionStatus::Success => Signal::Success(text),
                    SessionStatus::Error => Signal::Error(text),
                    _ => Signal::Pending,
                })
            },
            self.config.poll_interval,
            self.config.conversion_timeout,
        )?;

        match outcome {
            PollOutcome::Success(_) => {}
            PollOutcome::Error(text) => return Err(ConverterError::ConversionReported(text.trim().to_string())),
            PollOutcome::TimedOut => return Err(ConverterError::ConversionTimeout(self.config.conversion_timeout)),
        }

        // The download flush is not observable, only waited out
        std::thread::sleep(self.config.settle_delay);

        if self.config.verify_artifact && !written_since(&artifact, started) {
            return Err(ConverterError::ArtifactMissing(artifact));
        }

        log::info!("Artifact written to {}", artifact.display());
        Ok(artifact)
    }
}

/// Whether `path` is a file modified no earlier than `started`
///
/// One second of slack covers filesystems with coarse timestamps.
fn written_since(path: &Path, started: SystemTime) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    let floor = started.checked_sub(Duration::from_secs(1)).unwrap_or(SystemTime::UNIX_EPOCH);
    metadata.modified().map(|modified| modified >= floor).unwrap_or(false)
}

/// Convert `request` with the default configuration and Chrome
///
/// Pages are served from `assets/` in the working directory, or next to the executable when the
/// working directory has none. The artifact lands next to the executable.
pub fn run_headless_conversion(request: &ConversionRequest) -> SessionResult {
    HeadlessDriver::new(DriverConfig::default()).run(request)
}
