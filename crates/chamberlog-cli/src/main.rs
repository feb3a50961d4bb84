//! CLI for chamberlog: capture, watch and analyze chamber heater telemetry.

mod commands;
mod render;
mod tui;

use std::path::PathBuf;

use chamberlog_core::DEFAULT_LOG_FILE;
use chamberlog_core::transport::{DEFAULT_BAUD, DEFAULT_PORT};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chamberlog")]
#[command(about = "chamberlog — capture, watch and analyze chamber heater telemetry")]
#[command(version = chamberlog_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture telemetry from the serial port into a CSV session log.
    /// Runs until Ctrl+C (or until a replay file ends).
    Log {
        /// Serial port of the heater controller
        #[arg(short, long, default_value = DEFAULT_PORT)]
        port: String,

        /// Baud rate
        #[arg(short, long, default_value_t = DEFAULT_BAUD)]
        baud: u32,

        /// Session log to write (truncated if it exists)
        #[arg(short, long, default_value = DEFAULT_LOG_FILE)]
        output: PathBuf,

        /// Print every sample and every rejected line
        #[arg(short, long)]
        verbose: bool,

        /// Read wire lines from a file instead of the serial port
        #[arg(long, value_name = "FILE")]
        replay: Option<PathBuf>,
    },

    /// Print statistics for a recorded session and render charts.
    Analyze {
        /// Session log to analyze
        input: PathBuf,

        /// Chart image to write (must end in .svg)
        #[arg(short, long, default_value = commands::analyze::DEFAULT_IMAGE)]
        output: PathBuf,

        /// Print statistics only; skip the chart
        #[arg(long)]
        no_plot: bool,

        /// Also write the report as JSON
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,
    },

    /// Live terminal charts of the incoming telemetry (TUI)
    Live {
        /// Serial port of the heater controller
        #[arg(short, long, default_value = DEFAULT_PORT)]
        port: String,

        /// Baud rate
        #[arg(short, long, default_value_t = DEFAULT_BAUD)]
        baud: u32,

        /// Number of recent samples kept on screen
        #[arg(short = 'n', long, default_value_t = chamberlog_core::DEFAULT_WINDOW_CAPACITY)]
        points: usize,

        /// Redraw interval in seconds
        #[arg(long, default_value = "2.0")]
        refresh: f64,

        /// Also write a durable session log
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read wire lines from a file instead of the serial port
        #[arg(long, value_name = "FILE")]
        replay: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.command);

    match cli.command {
        Commands::Log {
            port,
            baud,
            output,
            verbose,
            replay,
        } => commands::capture::run(commands::capture::CaptureCommandConfig {
            input: commands::InputSource::new(&port, baud, replay),
            output,
            verbose,
        }),
        Commands::Analyze {
            input,
            output,
            no_plot,
            json,
        } => commands::analyze::run(&input, (!no_plot).then_some(output.as_path()), json.as_deref()),
        Commands::Live {
            port,
            baud,
            points,
            refresh,
            output,
            replay,
        } => commands::live::run(commands::live::LiveCommandConfig {
            input: commands::InputSource::new(&port, baud, replay),
            points,
            refresh,
            output,
        }),
    }
}

/// Diagnostics go to stderr through `log`. `RUST_LOG` overrides the default.
fn init_logging(command: &Commands) {
    let default = match command {
        Commands::Log { verbose: true, .. } => "warn,chamberlog_core=debug,chamberlog=debug",
        // Anything printed to stderr would tear the TUI.
        Commands::Live { .. } => "off",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_millis()
        .init();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
