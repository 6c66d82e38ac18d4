//! procsampled - Periodic process and system sampler.
//!
//! Runs a sampling cycle every interval and writes each cycle to stdout as
//! one JSON document.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use procsample::{Cycle, SamplerConfig};

/// Periodic process and system sampler.
#[derive(Parser)]
#[command(name = "procsampled", about = "Periodic process and system sampler", version)]
struct Args {
    /// Sampling interval in seconds.
    #[arg(short, long, default_value = "10")]
    interval: u64,

    /// Stop after this many cycles (runs until interrupted when omitted).
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Collect each process's command line.
    #[arg(long)]
    cmdline: bool,

    /// Do not read the swap device table.
    #[arg(long)]
    no_swap_devices: bool,

    /// Indent the JSON output.
    #[arg(long)]
    pretty: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig::default()
            .with_proc_path(&self.proc_path)
            .with_command_line(self.cmdline)
            .with_interval(Duration::from_secs(self.interval))
            .with_swap_devices(!self.no_swap_devices)
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Logs go to stderr so stdout carries only JSON.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["procsampled", "procsample"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn write_cycle(cycle: &Cycle, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, cycle)?;
    } else {
        serde_json::to_writer(&mut out, cycle)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(target_os = "linux")]
fn run(args: &Args, running: &AtomicBool) -> ExitCode {
    use procsample::Sampler;
    use procsample::collector::{ProcfsBackend, RealFs};

    let config = args.sampler_config();
    let backend = ProcfsBackend::new(RealFs::new(), config.proc_path.clone());
    let interval = config.interval;
    let mut sampler = Sampler::new(backend, config);

    if let Err(e) = sampler.init() {
        error!("Initialization failed: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting sampling loop");
    let mut cycles: u64 = 0;

    while running.load(Ordering::SeqCst) {
        match sampler.run_cycle() {
            Ok(cycle) => {
                cycles += 1;
                info!(
                    "Cycle #{}: {} processes, {} failures, {:?}",
                    cycles,
                    cycle.tree.len(),
                    cycle.failures.len(),
                    cycle.timing.total
                );
                if let Err(e) = write_cycle(&cycle, args.pretty) {
                    error!("Failed to write cycle: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            Err(e) => {
                error!("Cycle failed: {}", e);
            }
        }

        if args.count.is_some_and(|count| cycles >= count) {
            break;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    ExitCode::SUCCESS
}

#[cfg(not(target_os = "linux"))]
fn run(_args: &Args, _running: &AtomicBool) -> ExitCode {
    error!("No sampling backend for this platform");
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("procsampled {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, proc={}, cmdline={}",
        args.interval, args.proc_path, args.cmdline
    );

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let code = run(&args, &running);
    info!("Shutdown complete");
    code
}
