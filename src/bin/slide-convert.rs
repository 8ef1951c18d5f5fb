//! slide-convert
//!
//! `convert` runs the headless pipeline for one slide; `serve` hosts the interactive page.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use slide_convert::{ContentServer, ConversionRequest, DriverConfig, HeadlessDriver, LaunchOptions, ServerConfig,
                    server::DEFAULT_PORT};
use std::{io::Read, path::PathBuf, process::ExitCode, time::Duration};

const SAMPLE_SLIDE: &str = r#"<div class="slide-container"><h1>Title</h1></div>"#;

#[derive(Parser)]
#[command(name = "slide-convert")]
#[command(version)]
#[command(about = "Convert an HTML slide into an editable PowerPoint file", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert one slide with a headless browser
    Convert(ConvertArgs),

    /// Host the interactive conversion page until Ctrl-C
    Serve(ServeArgs),
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// HTML file to convert, `-` for stdin; a sample slide when omitted
    input: Option<PathBuf>,

    /// Name of the generated presentation
    #[arg(long, default_value = "Slide.pptx")]
    file_name: String,

    /// Slide width in inches
    #[arg(long, default_value_t = 10.0)]
    width: f64,

    /// Slide height in inches
    #[arg(long, default_value_t = 5.625)]
    height: f64,

    /// Port for the local content server
    #[arg(long, short = 'p', default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory holding the conversion page and its scripts
    #[arg(long, value_name = "DIR", default_value = "assets")]
    assets: PathBuf,

    /// Conversion page, relative to the asset directory
    #[arg(long, default_value = "converter-auto.html")]
    page: String,

    /// Where the presentation is downloaded (default: next to this executable)
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Seconds allowed for the page to load
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    navigation_timeout: u64,

    /// Seconds allowed for the conversion to finish
    #[arg(long, value_name = "SECS", default_value_t = 120)]
    timeout: u64,

    /// Milliseconds to wait after success for the download to flush
    #[arg(long, value_name = "MS", default_value_t = 3000)]
    settle_ms: u64,

    /// Milliseconds between status checks
    #[arg(long, value_name = "MS", default_value_t = 250)]
    poll_ms: u64,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,

    /// Report success without checking that the file exists
    #[arg(long)]
    no_verify: bool,

    /// Print the session result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory holding the pages and scripts
    #[arg(long, value_name = "DIR", default_value = "assets")]
    assets: PathBuf,

    /// Page served for `/`
    #[arg(long, default_value = "index.html")]
    page: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let outcome = match cli.command {
        Command::Convert(args) => convert(args),
        Command::Serve(args) => serve(args),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn convert(args: ConvertArgs) -> anyhow::Result<ExitCode> {
    let markup = read_markup(args.input.as_ref())?;
    let request = ConversionRequest::new(markup).file_name(&args.file_name).geometry(args.width, args.height);

    let mut browser = LaunchOptions::new().headless(!args.headed);
    if let Some(path) = args.chrome_path {
        browser = browser.chrome_path(path);
    }

    let mut config = DriverConfig::new()
        .server(ServerConfig::new().port(args.port).root(args.assets).index_page(&args.page))
        .page(args.page)
        .browser(browser)
        .navigation_timeout(Duration::from_secs(args.navigation_timeout))
        .conversion_timeout(Duration::from_secs(args.timeout))
        .settle_delay(Duration::from_millis(args.settle_ms))
        .poll_interval(Duration::from_millis(args.poll_ms))
        .verify_artifact(!args.no_verify);
    if let Some(dir) = args.download_dir {
        config = config.download_dir(dir);
    }

    let result = HeadlessDriver::new(config).run(&request);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Conversion status:");
        println!("{}", result.status_text.as_deref().unwrap_or("(no status reported)").trim());
        match (&result.artifact, &result.error_message) {
            (Some(path), _) => println!("Saved {}", path.display()),
            (None, Some(message)) => eprintln!("Failed: {}", message),
            (None, None) => {}
        }
    }

    Ok(if result.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn serve(args: ServeArgs) -> anyhow::Result<ExitCode> {
    if !args.assets.is_dir() {
        bail!("asset directory {} does not exist", args.assets.display());
    }

    let config = ServerConfig::new().port(args.port).root(args.assets).index_page(args.page);
    let mut server = ContentServer::start(&config)?;

    eprintln!("Serving the converter at {}", server.base_url());
    eprintln!("Press Ctrl-C to stop");

    server.wait_for_shutdown_signal()?;
    Ok(ExitCode::SUCCESS)
}

fn read_markup(input: Option<&PathBuf>) -> anyhow::Result<String> {
    match input {
        None => {
            log::info!("No input given, converting the sample slide");
            Ok(SAMPLE_SLIDE.to_string())
        }
        Some(path) if path.as_os_str() == "-" => {
            let mut markup = String::new();
            std::io::stdin().read_to_string(&mut markup).context("Failed to read markup from stdin")?;
            Ok(markup)
        }
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display())),
    }
}
