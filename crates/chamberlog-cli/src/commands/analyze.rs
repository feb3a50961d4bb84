//! `chamberlog analyze`: statistics and charts for a recorded session.

use std::io::{self, Write};
use std::path::Path;

use chamberlog_core::{AnalysisError, Channel, Report, analysis, summarize};

/// Default chart output path.
pub const DEFAULT_IMAGE: &str = "analysis.svg";

const RULE: &str = "============================================================";

pub fn run(input: &Path, image: Option<&Path>, json: Option<&Path>) {
    // Refuse an unwritable chart format before doing any work.
    if let Some(path) = image
        && let Err(e) = crate::render::check_output_path(path)
    {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    println!("Loading {}", input.display());

    let samples = match analysis::load(input) {
        Ok(samples) => samples,
        Err(AnalysisError::NotFound(path)) => {
            eprintln!("Error: file not found: {}", path.display());
            std::process::exit(1);
        }
        Err(e @ AnalysisError::MalformedLog { .. }) => {
            eprintln!(
                "Error: {} exists but is not a valid session log ({e})",
                input.display()
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let report = match summarize(&samples) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}: {e}", input.display());
            std::process::exit(1);
        }
    };

    let mut stdout = io::stdout().lock();
    if let Err(e) = write_report(&mut stdout, &report) {
        log::warn!("writing report to stdout: {e}");
    }
    drop(stdout);

    if let Some(path) = json {
        let written = serde_json::to_string_pretty(&report)
            .map_err(io::Error::from)
            .and_then(|contents| std::fs::write(path, contents));
        match written {
            Ok(()) => println!("Report saved to {}", path.display()),
            Err(e) => {
                eprintln!("Error writing {}: {e}", path.display());
                std::process::exit(1);
            }
        }
    }

    if let Some(path) = image {
        println!("Rendering charts...");
        match crate::render::render_analysis(&samples, &report, path) {
            Ok(()) => println!("Chart saved to {}", path.display()),
            Err(e) => {
                eprintln!("Error rendering {}: {e}", path.display());
                std::process::exit(1);
            }
        }
    }
}

/// Print the human-readable statistics block.
pub fn write_report(out: &mut impl Write, report: &Report) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "SESSION STATISTICS")?;
    writeln!(out, "{RULE}")?;

    writeln!(out)?;
    writeln!(out, "Period:")?;
    writeln!(out, "   Start:    {}", report.started_at)?;
    writeln!(out, "   End:      {}", report.ended_at)?;
    writeln!(out, "   Duration: {}", format_duration(report.duration_secs))?;
    writeln!(out, "   Samples:  {}", report.samples)?;

    for channel in Channel::ALL {
        let stats = report.channel(channel);
        writeln!(out)?;
        writeln!(out, "{} ({}):", channel.label(), channel.unit())?;
        if channel == Channel::FanSpeed {
            // PWM is an integer duty cycle.
            writeln!(out, "   Mean:  {:.1}", stats.mean)?;
            writeln!(out, "   Min:   {:.0}", stats.min)?;
            writeln!(out, "   Max:   {:.0}", stats.max)?;
        } else {
            writeln!(out, "   Mean:  {:.2}", stats.mean)?;
            writeln!(out, "   Min:   {:.2}", stats.min)?;
            writeln!(out, "   Max:   {:.2}", stats.max)?;
            writeln!(out, "   Std:   {:.2}", stats.std_dev)?;
        }
    }

    writeln!(out)?;
    match report.humidity_fan_correlation {
        Some(r) => writeln!(out, "Humidity vs fan speed correlation: r = {r:.3}")?,
        None => writeln!(out, "Humidity vs fan speed correlation: n/a")?,
    }

    writeln!(out)?;
    writeln!(out, "{RULE}")?;
    writeln!(out)
}

/// `H:MM:SS`, with tenths when under a minute.
fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        return format!("{secs:.1}s");
    }
    let total = secs.round() as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
