//! Command-line tool that downloads the accumulated spectrum from a
//! RadiaCode detector and saves it as XML.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use radiacode_spectrum_ble::{
    format_duration, DeviceManager, Error, Result, SessionConfig, SpectrumDocument,
    DEFAULT_SPECTRUM_NAME,
};

#[derive(Parser, Debug)]
#[command(
    name = "radiacode-spectrum",
    version,
    about = "Download the accumulated spectrum from a RadiaCode and save it as XML"
)]
struct Args {
    /// Output file
    #[arg(short, long, default_value = "output.xml")]
    file: PathBuf,

    /// Serial number of the device to use (case-insensitive)
    #[arg(short, long)]
    serial: Option<String>,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,

    /// Spectrum name written into the document
    #[arg(short, long, default_value = DEFAULT_SPECTRUM_NAME)]
    name: String,

    /// Reset the accumulated spectrum after a successful download
    #[arg(long)]
    reset: bool,

    /// Seconds to scan for devices
    #[arg(long, default_value_t = 5)]
    scan_secs: u64,

    /// Seconds to wait for each device response
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .scan_duration(Duration::from_secs(self.scan_secs))
            .response_timeout(Duration::from_secs(self.timeout_secs))
            .reset_after_read(self.reset)
    }
}

/// Progress output, silenced by `--quiet`.
struct Console<W> {
    out: W,
    quiet: bool,
}

impl<W: Write> Console<W> {
    fn new(out: W, quiet: bool) -> Self {
        Self { out, quiet }
    }

    fn say(&mut self, message: impl AsRef<str>) {
        if !self.quiet {
            // A closed stdout must not turn a good capture into a failure.
            let _ = writeln!(self.out, "{}", message.as_ref());
        }
    }
}

/// Error text plus the hints that help the user recover.
fn describe_error(err: &Error) -> String {
    match err {
        Error::DeviceNotFound { .. } => format!(
            "{}\nMake sure the device is turned on, within range \
             and not connected to another app.",
            err
        ),
        Error::AmbiguousDevice { candidates } => {
            let mut text = format!("{}\nAvailable devices:", err);
            for candidate in candidates {
                text.push_str("\n  ");
                text.push_str(candidate);
            }
            text
        }
        _ => err.to_string(),
    }
}

async fn run<W: Write>(args: &Args, console: &mut Console<W>) -> Result<()> {
    let manager = DeviceManager::new(args.session_config()).await?;

    match &args.serial {
        Some(serial) => console.say(format!(
            "Scanning for Radiacode devices with serial number {}...",
            serial
        )),
        None => console.say("Scanning for Radiacode devices..."),
    }
    let device = manager.discover(args.serial.as_deref()).await?;

    console.say(format!("Connecting to {}", device.info));
    let capture = manager
        .capture_then(device, |capture| {
            SpectrumDocument::from_capture(capture)
                .with_name(&args.name)
                .write_to(&args.file)
        })
        .await?;

    console.say(format!(
        "Spectrum collected over {}.",
        format_duration(u64::from(capture.spectrum.duration_secs))
    ));
    console.say(format!("Saved spectrum to {}", args.file.display()));
    if args.reset {
        console.say("Accumulated spectrum has been reset.");
    }

    Ok(())
}

/// Print a failed run to `err_out` and return the process exit code.
///
/// Errors are reported regardless of `--quiet`.
fn report<E: Write>(result: Result<()>, err_out: &mut E) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            let _ = writeln!(err_out, "Error: {}", describe_error(&err));
            1
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_level = if args.quiet { "error" } else { "warn" };
    let filter = if args.quiet {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut console = Console::new(io::stdout(), args.quiet);
    let result = run(&args, &mut console).await;

    let code = report(result, &mut io::stderr());
    if code != 0 {
        exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["radiacode-spectrum"]);

        assert_eq!(args.file, PathBuf::from("output.xml"));
        assert_eq!(args.serial, None);
        assert!(!args.quiet);
        assert_eq!(args.name, DEFAULT_SPECTRUM_NAME);
        assert!(!args.reset);

        let config = args.session_config();
        assert_eq!(config.scan_duration, Duration::from_secs(5));
        assert_eq!(config.response_timeout, Duration::from_secs(10));
        assert!(!config.reset_after_read);
    }

    #[test]
    fn test_short_flags() {
        let args = Args::parse_from([
            "radiacode-spectrum",
            "-f",
            "out/spec.xml",
            "-s",
            "rc-110-000123",
            "-q",
            "-n",
            "background",
            "--reset",
            "--scan-secs",
            "2",
            "--timeout-secs",
            "30",
        ]);

        assert_eq!(args.file, PathBuf::from("out/spec.xml"));
        assert_eq!(args.serial.as_deref(), Some("rc-110-000123"));
        assert!(args.quiet);
        assert_eq!(args.name, "background");

        let config = args.session_config();
        assert_eq!(config.scan_duration, Duration::from_secs(2));
        assert_eq!(config.response_timeout, Duration::from_secs(30));
        assert!(config.reset_after_read);
    }

    #[test]
    fn test_console_prints_progress() {
        let mut console = Console::new(Vec::new(), false);
        console.say("Scanning for Radiacode devices...");
        console.say(format!("Spectrum collected over {}.", format_duration(3_900)));

        assert_eq!(
            String::from_utf8(console.out).unwrap(),
            "Scanning for Radiacode devices...\nSpectrum collected over 1 hour, 5 minutes.\n"
        );
    }

    #[test]
    fn test_quiet_console_is_silent() {
        let mut console = Console::new(Vec::new(), true);
        console.say("Scanning for Radiacode devices...");
        console.say("Saved spectrum to output.xml");

        assert!(console.out.is_empty());
    }

    fn failed_run(quiet: bool) -> (Vec<u8>, String, i32) {
        let mut argv = vec!["radiacode-spectrum"];
        if quiet {
            argv.push("--quiet");
        }
        let args = Args::parse_from(argv);

        let mut console = Console::new(Vec::new(), args.quiet);
        console.say("Scanning for Radiacode devices...");

        let mut stderr = Vec::new();
        let code = report(Err(Error::DeviceNotFound { serial: None }), &mut stderr);

        (console.out, String::from_utf8(stderr).unwrap(), code)
    }

    #[test]
    fn test_failure_reported_without_quiet() {
        let (stdout, stderr, code) = failed_run(false);

        assert!(!stdout.is_empty());
        assert!(stderr.starts_with("Error: No RadiaCode device found"));
        assert_eq!(code, 1);
    }

    #[test]
    fn test_quiet_still_reports_failure() {
        let (stdout, stderr, code) = failed_run(true);

        assert!(stdout.is_empty());
        assert!(stderr.starts_with("Error: No RadiaCode device found"));
        assert!(stderr.contains("turned on"));
        assert_eq!(code, 1);
    }

    #[test]
    fn test_success_exits_zero_silently() {
        let mut stderr = Vec::new();

        assert_eq!(report(Ok(()), &mut stderr), 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn test_not_found_hint() {
        let text = describe_error(&Error::DeviceNotFound { serial: None });

        assert!(text.starts_with("No RadiaCode device found"));
        assert!(text.contains("turned on"));
        assert!(text.contains("not connected to another app"));
    }

    #[test]
    fn test_ambiguous_lists_candidates() {
        let text = describe_error(&Error::AmbiguousDevice {
            candidates: vec![
                "AA:BB:CC:DD:EE:01: RC-102#RC-102-000111".to_string(),
                "AA:BB:CC:DD:EE:02: RC-110#RC-110-000222".to_string(),
            ],
        });

        assert!(text.contains("Available devices:"));
        assert!(text.contains("\n  AA:BB:CC:DD:EE:01: RC-102#RC-102-000111"));
        assert!(text.contains("\n  AA:BB:CC:DD:EE:02: RC-110#RC-110-000222"));
    }

    #[test]
    fn test_other_errors_unchanged() {
        let err = Error::Timeout(Duration::from_secs(10));
        assert_eq!(describe_error(&err), err.to_string());
    }
}
