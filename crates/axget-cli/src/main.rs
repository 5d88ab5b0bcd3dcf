mod observer;
mod output;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use axget_core::{
    Advisory, AxGetError, ConfigLoader, HttpClient, InstallKind, InstallReport, InstallRequest,
    Pipeline, SystemPrivilegeGate, Version,
};
use clap::Parser;

use observer::TerminalObserver;
use output::{Output, Verbosity};
use progress::ProgressManager;

/// Delay between advisory paragraphs
const PAUSE_SECONDS: u64 = 3;

/// Exit status for command-line usage errors
const USAGE_EXIT_CODE: u8 = 10;

/// Exit status for failures that carry no error kind of their own
const UNEXPECTED_EXIT_CODE: u8 = 11;

#[derive(Parser, Debug)]
#[command(name = "ax-get")]
#[command(version, about = "Download and assemble an Axelor release")]
#[command(after_help = "By default the deployable WAR is fetched and unpacked into <OUT>/axelor-v<VERSION>.")]
struct Args {
    /// Major version number
    major: String,

    /// Minor version number
    minor: String,

    /// Patch version number
    patch: String,

    /// Fetch the source tree instead of the WAR
    #[arg(short = 's', long = "src")]
    src: bool,

    /// Logo to inject [default: branding_logo.png in the output directory]
    #[arg(short = 'b', long = "brand-file", value_name = "PATH")]
    brand_file: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long = "out", value_name = "DIR", default_value = ".")]
    out: PathBuf,

    /// JSON configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Hide download progress bars
    #[arg(long)]
    no_progress: bool,

    /// Print advisory text without pauses
    #[arg(long)]
    no_pause: bool,

    /// Only show warnings and errors
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn install_request(&self) -> axget_core::Result<InstallRequest> {
        let version = Version::new(&self.major, &self.minor, &self.patch)?;
        let kind = if self.src {
            InstallKind::Source
        } else {
            InstallKind::Binary
        };

        let mut request = InstallRequest::new(version, kind).with_out_dir(&self.out);
        if let Some(brand_file) = &self.brand_file {
            request = request.with_brand_file(brand_file);
        }
        Ok(request)
    }
}

fn init_logging(verbosity: Verbosity) {
    // RUST_LOG refines the level chosen on the command line
    env_logger::Builder::new()
        .filter_level(verbosity.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run(args: &Args, output: &Output) -> Result<()> {
    let (config, sources) = ConfigLoader::new(true)
        .build_with_sources(args.config.as_deref())
        .context("Failed to load configuration")?;
    let sources: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
    output.verbose(&format!("Configuration from: {}", sources.join(", ")));
    let request = args.install_request()?;

    let client = HttpClient::with_config(config.http_client_config()).map_err(AxGetError::from)?;
    let gate = SystemPrivilegeGate::new(config.service_account.clone());
    let progress = ProgressManager::new(!args.no_progress && !output.is_quiet());
    let observer = TerminalObserver::new(output, &progress);

    let report = Pipeline::new(&config, request, &client, &gate)
        .with_observer(&observer)
        .run()?;
    drop(observer);

    print_summary(output, &report);
    print_advisory(output, &Advisory::for_report(&report), !args.no_pause);
    Ok(())
}

fn print_summary(output: &Output, report: &InstallReport) {
    output.success(&format!(
        "{} {} ({}) assembled in {}",
        report.product_name,
        report.version,
        report.kind.as_str(),
        report.final_dir.display()
    ));
    for source in &report.sources {
        output.verbose(&format!("  source: {}", source));
    }
    if report.ownership_repaired {
        output.verbose("  ownership handed to the service account");
    }
    output.info(&format!("Configuration file: {}", report.config_file.display()));
}

fn print_advisory(output: &Output, advisory: &Advisory, pause: bool) {
    if output.is_quiet() {
        return;
    }

    for (i, block) in advisory.blocks().iter().enumerate() {
        if pause && i > 0 {
            thread::sleep(Duration::from_secs(PAUSE_SECONDS));
        }
        output.paragraph(block);
    }
}

/// Exit status for a failed run; structured errors carry their own code.
fn exit_code(error: &anyhow::Error) -> ExitCode {
    match error.downcast_ref::<AxGetError>() {
        Some(e) => ExitCode::from(e.exit_code()),
        None => ExitCode::from(UNEXPECTED_EXIT_CODE),
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(USAGE_EXIT_CODE);
        }
    };
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);
    init_logging(verbosity);
    let output = Output::new(verbosity);

    match run(&args, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.error(&e.to_string());
            for cause in e.chain().skip(1) {
                output.error(&format!("  Caused by: {}", cause));
            }
            exit_code(&e)
        }
    }
}
