//! Static analysis charts.
//!
//! Four stacked panels over elapsed minutes: both temperatures, humidity, fan
//! PWM, and a humidity-vs-fan scatter. Output is SVG; other image formats are
//! refused rather than written as mislabeled SVG.

use std::error::Error;
use std::path::{Path, PathBuf};

use chamberlog_core::{Channel, Report, Sample, TimeUnit};
use plotters::coord::Shift;
use plotters::prelude::*;

const SIZE: (u32, u32) = (1400, 1600);

const ORANGE: RGBColor = RGBColor(255, 140, 0);
const PURPLE: RGBColor = RGBColor(128, 0, 128);

#[derive(Debug, thiserror::Error)]
#[error("cannot write chart to {}: only .svg output is supported", .0.display())]
pub struct UnsupportedFormat(pub PathBuf);

/// Accept only paths with an `.svg` extension (any case).
pub fn check_output_path(path: &Path) -> Result<(), UnsupportedFormat> {
    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    if is_svg {
        Ok(())
    } else {
        Err(UnsupportedFormat(path.to_path_buf()))
    }
}

/// Render `samples` (summarized as `report`) to an SVG file at `path`.
pub fn render_analysis(samples: &[Sample], report: &Report, path: &Path) -> Result<(), Box<dyn Error>> {
    check_output_path(path)?;
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((4, 1));
    let minutes = report.elapsed(TimeUnit::Minutes);

    line_panel(
        &panels[0],
        "Temperatures over time",
        "Temperature (°C)",
        &minutes,
        samples,
        &[(Channel::BedTemp, RED, "Bed"), (Channel::AmbTemp, BLUE, "Ambient")],
    )?;
    line_panel(
        &panels[1],
        "Humidity over time",
        "Humidity (%)",
        &minutes,
        samples,
        &[(Channel::Humidity, GREEN, "Humidity")],
    )?;
    line_panel(
        &panels[2],
        "Fan speed",
        "PWM (0-255)",
        &minutes,
        samples,
        &[(Channel::FanSpeed, ORANGE, "Fan speed")],
    )?;
    scatter_panel(&panels[3], samples, report.humidity_fan_correlation)?;

    root.present()?;
    log::info!("rendered {} samples to {}", samples.len(), path.display());
    Ok(())
}

fn line_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    y_desc: &str,
    minutes: &[f64],
    samples: &[Sample],
    lines: &[(Channel, RGBColor, &str)],
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let x_max = minutes.last().copied().unwrap_or(0.0);
    let (x_lo, x_hi) = padded(0.0, x_max);
    let (y_lo, y_hi) = value_range(samples, lines.iter().map(|l| l.0)).unwrap_or((0.0, 1.0));

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("Time (min)")
        .y_desc(y_desc)
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    for &(channel, color, label) in lines {
        chart
            .draw_series(LineSeries::new(
                minutes.iter().zip(samples).map(|(&x, s)| (x, s.value(channel))),
                color.stroke_width(2),
            ))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.3))
        .draw()?;
    Ok(())
}

fn scatter_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    samples: &[Sample],
    correlation: Option<f64>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (x_lo, x_hi) = value_range(samples, [Channel::Humidity]).unwrap_or((0.0, 1.0));
    let (y_lo, y_hi) = value_range(samples, [Channel::FanSpeed]).unwrap_or((0.0, 1.0));
    let title = match correlation {
        Some(r) => format!("Humidity vs fan speed (r = {r:.2})"),
        None => "Humidity vs fan speed".to_string(),
    };

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("Humidity (%)")
        .y_desc("Fan speed (PWM)")
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    chart.draw_series(
        samples
            .iter()
            .map(|s| Circle::new((s.humidity, s.fan_speed), 3, PURPLE.mix(0.5).filled())),
    )?;
    Ok(())
}

/// Padded min/max across `channels`, or `None` with no samples.
fn value_range(samples: &[Sample], channels: impl IntoIterator<Item = Channel> + Clone) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for s in samples {
        for c in channels.clone() {
            lo = lo.min(s.value(c));
            hi = hi.max(s.value(c));
        }
    }
    (lo <= hi).then(|| padded(lo, hi))
}

/// Widen a range by 5% each side; a degenerate range gets a unit margin.
fn padded(lo: f64, hi: f64) -> (f64, f64) {
    let span = hi - lo;
    if span <= f64::EPSILON * hi.abs().max(1.0) {
        return (lo - 1.0, hi + 1.0);
    }
    (lo - span * 0.05, hi + span * 0.05)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chamberlog_core::summarize;
    use chrono::{NaiveDate, TimeDelta};

    fn session(n: i64) -> Vec<Sample> {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        (0..n)
            .map(|i| {
                let x = i as f64;
                Sample::new(
                    start + TimeDelta::seconds(i * 2),
                    [60.0 + x * 0.1, 25.0, 40.0 + (x % 7.0), 100.0 + (x % 50.0)],
                )
            })
            .collect()
    }

    #[test]
    fn renders_svg_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("analysis.svg");
        let samples = session(120);
        let report = summarize(&samples).unwrap();

        render_analysis(&samples, &report, &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Temperatures over time"));
        assert!(svg.contains("Humidity vs fan speed"));
    }

    #[test]
    fn renders_single_sample_session() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("one.svg");
        let samples = session(1);
        let report = summarize(&samples).unwrap();
        render_analysis(&samples, &report, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn refuses_non_svg_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("report.png");
        let samples = session(10);
        let report = summarize(&samples).unwrap();

        let err = render_analysis(&samples, &report, &path).unwrap_err();
        assert!(err.to_string().contains("only .svg output is supported"));
        assert!(!path.exists());

        assert!(check_output_path(Path::new("analysis")).is_err());
        assert!(check_output_path(Path::new("run.svg.png")).is_err());
        assert!(check_output_path(Path::new("Run.SVG")).is_ok());
    }

    #[test]
    fn padding() {
        assert_eq!(padded(5.0, 5.0), (4.0, 6.0));
        let (lo, hi) = padded(0.0, 100.0);
        assert!((lo + 5.0).abs() < 1e-9 && (hi - 105.0).abs() < 1e-9);
        assert_eq!(value_range(&[], [Channel::Humidity]), None);
    }
}
