//! Lifecycle tests for the headless driver, run against a scripted page instead of Chrome.
//!
//! The content server is real; the fake page fetches the conversion page from it over HTTP so a
//! run only gets past navigation when the server is actually up.

use slide_convert::{BrowserLauncher, ConversionPage, ConversionRequest, ConverterError, DriverConfig, DriverState,
                    FailureKind, HeadlessDriver, Result, ServerConfig, SessionStatus};
use std::{cell::{Cell, RefCell},
          net::TcpListener,
          path::{Path, PathBuf},
          sync::{Arc, Mutex,
                 atomic::{AtomicUsize, Ordering}},
          time::{Duration, Instant}};

const SUCCESS_TEXT: &str = "✅ Success! Your PowerPoint file has been downloaded.";
const MISSING_INPUT_TEXT: &str = "❌ Error: Please paste HTML code first";

#[derive(Debug, Clone)]
enum Behaviour {
    Succeed { after_polls: usize, write_artifact: bool },
    ReportError(&'static str),
    Hang,
    FailLaunch,
    NavigationTimeout,
}

#[derive(Clone, Default)]
struct Observed {
    launches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    urls: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<ConversionRequest>>>,
}

impl Observed {
    fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn last_url(&self) -> String {
        self.urls.lock().unwrap().last().cloned().expect("No navigation recorded")
    }
}

struct ScriptedLauncher {
    behaviour: Behaviour,
    observed: Observed,
}

impl BrowserLauncher for ScriptedLauncher {
    type Page = ScriptedPage;

    fn launch(&self) -> Result<ScriptedPage> {
        self.observed.launches.fetch_add(1, Ordering::SeqCst);
        if let Behaviour::FailLaunch = self.behaviour {
            return Err(ConverterError::LaunchFailed("chrome not found".to_string()));
        }

        Ok(ScriptedPage {
            behaviour: self.behaviour.clone(),
            observed: self.observed.clone(),
            download_dir: RefCell::new(None),
            request: RefCell::new(None),
            polls: Cell::new(0),
            closed: false,
        })
    }
}

struct ScriptedPage {
    behaviour: Behaviour,
    observed: Observed,
    download_dir: RefCell<Option<PathBuf>>,
    request: RefCell<Option<ConversionRequest>>,
    polls: Cell<usize>,
    closed: bool,
}

impl ConversionPage for ScriptedPage {
    fn set_download_dir(&self, dir: &Path) -> Result<()> {
        assert!(dir.is_absolute());
        *self.download_dir.borrow_mut() = Some(dir.to_path_buf());
        Ok(())
    }

    fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        self.observed.urls.lock().unwrap().push(url.to_string());
        if let Behaviour::NavigationTimeout = self.behaviour {
            return Err(ConverterError::NavigationTimeout(timeout));
        }

        let client = reqwest::blocking::Client::builder().no_proxy().build().unwrap();
        let response = client.get(url).send().map_err(|e| ConverterError::NavigationFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ConverterError::NavigationFailed(format!("{} returned {}", url, response.status())));
        }
        Ok(())
    }

    fn start_conversion(&self, request: &ConversionRequest) -> Result<()> {
        self.observed.requests.lock().unwrap().push(request.clone());
        *self.request.borrow_mut() = Some(request.clone());
        Ok(())
    }

    fn status_text(&self, selector: &str) -> Result<Option<String>> {
        assert_eq!(selector, "#status");
        assert!(!self.closed, "Polled a closed page");

        let polls = self.polls.get() + 1;
        self.polls.set(polls);

        let request = self.request.borrow().clone().expect("Polled before the conversion started");
        if request.is_blank() {
            return Ok(Some(MISSING_INPUT_TEXT.to_string()));
        }

        let text = match &self.behaviour {
            Behaviour::Succeed { after_polls, write_artifact } if polls >= *after_polls => {
                if *write_artifact {
                    let dir = self.download_dir.borrow().clone().expect("Download dir not set");
                    std::fs::write(dir.join(&request.options.file_name), b"PK\x03\x04").unwrap();
                }
                SUCCESS_TEXT
            }
            Behaviour::ReportError(text) => *text,
            _ => "Converting to PowerPoint...",
        };

        Ok(Some(text.to_string()))
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.observed.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct Fixture {
    assets: tempfile::TempDir,
    downloads: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let assets = tempfile::tempdir().unwrap();
        std::fs::write(assets.path().join("converter-auto.html"), "<div id=\"status\">Idle</div>").unwrap();
        Self { assets, downloads: tempfile::tempdir().unwrap() }
    }

    fn config(&self, port: u16) -> DriverConfig {
        DriverConfig::new()
            .server(ServerConfig::new().port(port).root(self.assets.path()))
            .download_dir(self.downloads.path())
            .navigation_timeout(Duration::from_secs(5))
            .conversion_timeout(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(5))
            .settle_delay(Duration::from_millis(10))
    }

    fn driver(&self, port: u16, behaviour: Behaviour) -> (HeadlessDriver<ScriptedLauncher>, Observed) {
        let observed = Observed::default();
        let launcher = ScriptedLauncher { behaviour, observed: observed.clone() };
        (HeadlessDriver::with_launcher(self.config(port), launcher), observed)
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

fn port_of(url: &str) -> u16 {
    let authority = url.trim_start_matches("http://").split('/').next().unwrap();
    authority.rsplit(':').next().unwrap().parse().unwrap()
}

fn assert_port_free(port: u16) {
    TcpListener::bind(("127.0.0.1", port)).expect("Port still bound after the run");
}

fn slide() -> ConversionRequest {
    ConversionRequest::new(r#"<div class="slide-container"><h1>Title</h1></div>"#)
}

#[test]
fn test_successful_run_visits_every_state_and_writes_artifact() {
    let fixture = Fixture::new();
    let (driver, observed) = fixture.driver(0, Behaviour::Succeed { after_polls: 3, write_artifact: true });

    let result = driver.run(&slide());

    assert!(result.is_success(), "{:?}", result.error_message);
    assert_eq!(result.status, SessionStatus::Success);
    assert_eq!(
        result.transitions,
        vec![
            DriverState::Starting,
            DriverState::BrowserLaunching,
            DriverState::Navigating,
            DriverState::Polling,
            DriverState::Succeeded,
            DriverState::Cleanup,
        ]
    );
    assert_eq!(result.status_text.as_deref(), Some(SUCCESS_TEXT));

    let artifact = result.artifact.expect("Artifact path missing");
    assert_eq!(artifact.file_name().unwrap(), "Slide.pptx");
    assert!(artifact.starts_with(std::fs::canonicalize(fixture.downloads.path()).unwrap()));
    assert!(artifact.is_file());

    assert_eq!(observed.launches(), 1);
    assert_eq!(observed.closes(), 1);
    assert!(observed.last_url().ends_with("/converter-auto.html"));
    assert_port_free(port_of(&observed.last_url()));
}

#[test]
fn test_default_geometry_reaches_the_page() {
    let fixture = Fixture::new();
    let (driver, observed) = fixture.driver(0, Behaviour::Succeed { after_polls: 1, write_artifact: true });

    driver.run(&slide());

    let requests = observed.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].options.slide_width, 10.0);
    assert_eq!(requests[0].options.slide_height, 5.625);
    assert_eq!(requests[0].options.file_name, "Slide.pptx");
}

#[test]
fn test_port_in_use_fails_before_launch() {
    let fixture = Fixture::new();
    let holder = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = holder.local_addr().unwrap().port();
    let (driver, observed) = fixture.driver(port, Behaviour::Succeed { after_polls: 1, write_artifact: true });

    let result = driver.run(&slide());

    assert_eq!(result.status, SessionStatus::Error);
    assert_eq!(result.failure, Some(FailureKind::ResourceBind));
    assert_eq!(result.transitions, vec![DriverState::Starting, DriverState::Failed, DriverState::Cleanup]);
    assert_eq!(observed.launches(), 0);
    assert_eq!(observed.closes(), 0);
}

#[test]
fn test_launch_failure_still_stops_server() {
    let fixture = Fixture::new();
    let port = free_port();
    let (driver, observed) = fixture.driver(port, Behaviour::FailLaunch);

    let result = driver.run(&slide());

    assert_eq!(result.failure, Some(FailureKind::Launch));
    assert!(result.visited(DriverState::BrowserLaunching));
    assert!(!result.visited(DriverState::Navigating));
    assert_eq!(observed.launches(), 1);
    assert_eq!(observed.closes(), 0);
    assert_port_free(port);
}

#[test]
fn test_navigation_timeout_fails_and_cleans_up() {
    let fixture = Fixture::new();
    let (driver, observed) = fixture.driver(0, Behaviour::NavigationTimeout);

    let result = driver.run(&slide());

    assert_eq!(result.failure, Some(FailureKind::NavigationTimeout));
    assert!(result.error_message.as_deref().unwrap().contains("did not finish loading"));
    assert!(!result.visited(DriverState::Polling));
    assert_eq!(result.transitions.last(), Some(&DriverState::Cleanup));
    assert_eq!(observed.closes(), 1);
    assert_port_free(port_of(&observed.last_url()));
}

#[test]
fn test_missing_page_is_navigation_failure() {
    let fixture = Fixture::new();
    let observed = Observed::default();
    let launcher =
        ScriptedLauncher { behaviour: Behaviour::Succeed { after_polls: 1, write_artifact: true }, observed: observed.clone() };
    let driver = HeadlessDriver::with_launcher(fixture.config(0).page("nope.html"), launcher);

    let result = driver.run(&slide());

    assert_eq!(result.failure, Some(FailureKind::Navigation));
    assert_eq!(observed.closes(), 1);
}

#[test]
fn test_page_reported_error_is_passed_through() {
    let fixture = Fixture::new();
    let (driver, observed) = fixture.driver(0, Behaviour::ReportError("❌ Error: No valid HTML element found"));

    let result = driver.run(&slide());

    assert_eq!(result.failure, Some(FailureKind::ConversionReported));
    assert_eq!(result.error_message.as_deref(), Some("❌ Error: No valid HTML element found"));
    assert_eq!(
        &result.transitions[3..],
        &[DriverState::Polling, DriverState::Failed, DriverState::Cleanup]
    );
    assert!(result.artifact.is_none());
    assert_eq!(observed.closes(), 1);
}

#[test]
fn test_blank_markup_runs_full_lifecycle_and_page_rejects_it() {
    let fixture = Fixture::new();
    let (driver, observed) = fixture.driver(0, Behaviour::Succeed { after_polls: 1, write_artifact: true });

    let result = driver.run(&ConversionRequest::new(""));

    assert_eq!(result.failure, Some(FailureKind::ConversionReported));
    assert_eq!(result.error_message.as_deref(), Some(MISSING_INPUT_TEXT));
    assert!(result.visited(DriverState::Navigating));
    assert!(result.visited(DriverState::Polling));
    assert_eq!(observed.launches(), 1);
    assert_eq!(observed.closes(), 1);
    assert!(!fixture.downloads.path().join("Slide.pptx").exists());
}

#[test]
fn test_stuck_page_times_out() {
    let fixture = Fixture::new();
    let observed = Observed::default();
    let launcher = ScriptedLauncher { behaviour: Behaviour::Hang, observed: observed.clone() };
    let config = fixture.config(0).conversion_timeout(Duration::from_millis(150));
    let driver = HeadlessDriver::with_launcher(config, launcher);

    let started = Instant::now();
    let result = driver.run(&slide());

    assert_eq!(result.failure, Some(FailureKind::ConversionTimeout));
    assert_eq!(result.status_text.as_deref(), Some("Converting to PowerPoint..."));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(observed.closes(), 1);
    assert_port_free(port_of(&observed.last_url()));
}

#[test]
fn test_missing_artifact_fails_when_verified() {
    let fixture = Fixture::new();
    let (driver, _) = fixture.driver(0, Behaviour::Succeed { after_polls: 1, write_artifact: false });

    let result = driver.run(&slide());

    assert_eq!(result.failure, Some(FailureKind::ArtifactMissing));
    assert!(result.error_message.unwrap().contains("Slide.pptx"));
}

#[test]
fn test_leftover_artifact_does_not_count_as_output() {
    let fixture = Fixture::new();
    let leftover = fixture.downloads.path().join("Slide.pptx");
    std::fs::write(&leftover, b"from an earlier run").unwrap();
    let (driver, _) = fixture.driver(0, Behaviour::Succeed { after_polls: 1, write_artifact: false });

    let result = driver.run(&slide());

    assert_eq!(result.failure, Some(FailureKind::ArtifactMissing));
    assert!(!leftover.exists());
}

#[test]
fn test_leftover_artifact_replaced_by_new_download() {
    let fixture = Fixture::new();
    let target = fixture.downloads.path().join("Slide.pptx");
    std::fs::write(&target, b"from an earlier run").unwrap();
    let (driver, _) = fixture.driver(0, Behaviour::Succeed { after_polls: 1, write_artifact: true });

    let result = driver.run(&slide());

    assert!(result.is_success(), "{:?}", result.error_message);
    assert_eq!(std::fs::read(&target).unwrap(), b"PK\x03\x04");
}

#[test]
fn test_leftover_artifact_kept_when_port_is_taken() {
    let fixture = Fixture::new();
    let leftover = fixture.downloads.path().join("Slide.pptx");
    std::fs::write(&leftover, b"from an earlier run").unwrap();
    let holder = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = holder.local_addr().unwrap().port();
    let (driver, _) = fixture.driver(port, Behaviour::Succeed { after_polls: 1, write_artifact: true });

    let result = driver.run(&slide());

    assert_eq!(result.failure, Some(FailureKind::ResourceBind));
    assert!(leftover.exists());
}

#[test]
fn test_missing_artifact_tolerated_without_verification() {
    let fixture = Fixture::new();
    let observed = Observed::default();
    let launcher = ScriptedLauncher {
        behaviour: Behaviour::Succeed { after_polls: 1, write_artifact: false },
        observed: observed.clone(),
    };
    let driver = HeadlessDriver::with_launcher(fixture.config(0).verify_artifact(false), launcher);

    let result = driver.run(&slide());

    assert!(result.is_success());
    assert!(!result.artifact.unwrap().exists());
}

#[test]
fn test_invalid_options_rejected_before_acquiring_resources() {
    let fixture = Fixture::new();
    let (driver, observed) = fixture.driver(0, Behaviour::Succeed { after_polls: 1, write_artifact: true });

    let result = driver.run(&slide().geometry(-1.0, 5.625));

    assert_eq!(result.failure, Some(FailureKind::InvalidRequest));
    assert_eq!(result.transitions, vec![DriverState::Starting, DriverState::Failed, DriverState::Cleanup]);
    assert_eq!(observed.launches(), 0);
}

#[test]
fn test_repeated_runs_on_one_port_do_not_leak() {
    let fixture = Fixture::new();
    let port = free_port();

    for attempt in 0..3 {
        let (driver, observed) = fixture.driver(port, Behaviour::Succeed { after_polls: 2, write_artifact: true });
        let result = driver.run(&slide().file_name(format!("Slide-{}.pptx", attempt)));

        assert!(result.is_success(), "attempt {}: {:?}", attempt, result.error_message);
        assert_eq!(observed.closes(), 1);
        assert_port_free(port);
    }
}
