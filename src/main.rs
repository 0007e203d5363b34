//! useractivity - user activity tracking daemon.
//!
//! Reads input events and commands line by line from stdin, keeps the
//! `useractive` / `userinactive` marker up to date and prints transition and
//! status reports as JSON lines on stdout.

use anyhow::Result;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use useractivity::config::{Config, LogFormat, LoggingConfig};
use useractivity::host::{HostCommand, Report};
use useractivity::platform::{EventLoopPlatform, FileMarker, SharedMarker};
use useractivity::{ActivityEvent, ActivityTracker};

/// Application version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    // Parse command line arguments
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    // Load configuration
    let config = Config::load(config_path.as_deref())?;
    config.validate()?;

    // Initialize tracing
    init_tracing(&config.logging)?;

    info!("Starting useractivity v{}", VERSION);

    // Timers and input handlers share one thread
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config))?;

    info!("useractivity shutdown complete");
    Ok(())
}

/// Set up the marker surface and tracker, then serve host input.
async fn run(config: Config) -> Result<()> {
    let platform = match &config.surface.marker_path {
        Some(path) => {
            info!("Publishing marker to {:?}", path);
            EventLoopPlatform::new(FileMarker::new(path))?
        }
        None => EventLoopPlatform::new(SharedMarker::new())?,
    };

    let tracker = ActivityTracker::with_config(platform.clone(), &config.tracker);
    if config.tracker.notify_active {
        tracker.on_user_active(|| print_report(&Report::transition(ActivityEvent::UserActive)));
    }
    if config.tracker.notify_inactive {
        tracker.on_user_inactive(|| print_report(&Report::transition(ActivityEvent::UserInactive)));
    }
    tracker.register();

    // Deadlines only fire while the platform is driven
    platform.run_until(serve(&platform, &tracker)).await;

    // Cleanup
    info!("Shutting down...");
    tracker.unregister();

    Ok(())
}

/// Feed stdin commands to the tracker until `quit`, end of input or Ctrl-C.
async fn serve(platform: &EventLoopPlatform, tracker: &ActivityTracker<EventLoopPlatform>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("Reading input events from stdin");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("End of input");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                match line.parse::<HostCommand>() {
                    Ok(HostCommand::Input(channel)) => platform.dispatch(channel),
                    Ok(HostCommand::SetTimeout(timeout)) => tracker.set_timeout(timeout),
                    Ok(HostCommand::Register) => tracker.register(),
                    Ok(HostCommand::Unregister) => tracker.unregister(),
                    Ok(HostCommand::Status) => {
                        print_report(&Report::status(tracker.state(), tracker.timeout()));
                    }
                    Ok(HostCommand::Quit) => {
                        info!("Quit command received");
                        break;
                    }
                    Err(e) => warn!("Ignoring input line: {}", e),
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }
}

fn print_report(report: &Report) {
    match report.to_line() {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Failed to encode report: {}", e),
    }
    debug!("Reported {:?}", report);
}

/// Initialize tracing subscriber on stderr; stdout carries reports.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false);

    match logging.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(layer.json())
            .with(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .init(),
    }

    Ok(())
}
