//! Live view rendering.
//!
//! ┌──────────────────────────────────────────────┐
//! │  Chamber heater   /dev/ttyUSB0   #142        │
//! ├──────────────────────────────────────────────┤
//! │  Temperatures  bed 60.1°C  ambient 25.0°C    │
//! │  ⣀⡠⠤⠒⠉ ...                                  │
//! ├──────────────────────────────────────────────┤
//! │  Humidity  40.5%                             │
//! ├──────────────────────────────────────────────┤
//! │  Fan speed  128 PWM                          │
//! ├──────────────────────────────────────────────┤
//! │  logged 142  rejected 3   s: snapshot  q: quit│
//! └──────────────────────────────────────────────┘

use super::app::LiveView;
use chamberlog_core::{Channel, WindowSnapshot};
use ratatui::{prelude::*, widgets::*};

pub fn draw(f: &mut Frame, view: &LiveView) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // title
            Constraint::Ratio(1, 3),    // temperatures
            Constraint::Ratio(1, 3),    // humidity
            Constraint::Ratio(1, 3),    // fan
            Constraint::Length(1),      // status
        ])
        .split(f.area());

    draw_title(f, rows[0], view);

    let snap = &view.snapshot;
    if snap.is_empty() {
        let waiting = Paragraph::new(format!("Waiting for data from {}...", view.source))
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        let body = rows[1].union(rows[3]);
        f.render_widget(waiting, body);
    } else {
        draw_chart(
            f,
            rows[1],
            snap,
            "Temperatures",
            &[(Channel::BedTemp, Color::Red, "bed"), (Channel::AmbTemp, Color::Blue, "ambient")],
        );
        draw_chart(f, rows[2], snap, "Humidity", &[(Channel::Humidity, Color::Green, "")]);
        draw_chart(f, rows[3], snap, "Fan speed", &[(Channel::FanSpeed, Color::Yellow, "")]);
    }

    draw_status(f, rows[4], view);
}

fn draw_title(f: &mut Frame, area: Rect, view: &LiveView) {
    let state = if view.ended { "  input ended" } else { "" };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(" Chamber heater ", Style::default().bold().fg(Color::Cyan)),
            Span::raw("  "),
            Span::styled(view.source.as_str(), Style::default().bold().fg(Color::Yellow)),
            Span::styled(
                format!("  #{}{state} ", view.counts.samples_accepted),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    f.render_widget(block, area);
}

fn draw_chart(
    f: &mut Frame,
    area: Rect,
    snap: &WindowSnapshot,
    title: &str,
    lines: &[(Channel, Color, &str)],
) {
    let series: Vec<Vec<(f64, f64)>> = lines.iter().map(|(c, _, _)| snap.series(*c)).collect();
    let channels: Vec<Channel> = lines.iter().map(|(c, _, _)| *c).collect();

    let datasets: Vec<Dataset> = lines
        .iter()
        .zip(&series)
        .map(|((_, color, name), data)| {
            let dataset = Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(*color))
                .data(data);
            // Single-series panels need no legend.
            if name.is_empty() { dataset } else { dataset.name(*name) }
        })
        .collect();

    let (x_lo, x_hi) = snap.index_bounds();
    let x_hi = x_hi.max(x_lo + 1.0);
    let [y_lo, y_hi] = padded_bounds(snap.value_bounds(&channels).unwrap_or((0.0, 1.0)));

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(chart_title(title, snap, lines)),
        )
        .x_axis(Axis::default().bounds([x_lo, x_hi]).labels(vec![
            Line::from(format!("{x_lo:.0}")),
            Line::from(format!("{x_hi:.0}")),
        ]))
        .y_axis(Axis::default().bounds([y_lo, y_hi]).labels(vec![
            Line::from(format!("{y_lo:.1}")),
            Line::from(format!("{y_hi:.1}")),
        ]));

    f.render_widget(chart, area);
}

/// Panel title with the latest reading of each channel.
fn chart_title(title: &str, snap: &WindowSnapshot, lines: &[(Channel, Color, &str)]) -> String {
    let mut out = format!(" {title} ");
    if let Some(latest) = snap.latest() {
        for (channel, _, name) in lines {
            if !name.is_empty() {
                out.push_str(name);
                out.push(' ');
            }
            out.push_str(&format!("{}{}  ", latest.field_text(*channel), channel.unit()));
        }
    }
    out
}

fn draw_status(f: &mut Frame, area: Rect, view: &LiveView) {
    let logging = match &view.log_path {
        Some(p) => format!("logged {} to {}", view.counts.samples_logged, p.display()),
        None => "not logging".to_string(),
    };
    let export = view
        .last_export
        .as_ref()
        .map(|p| format!("  saved {}", p.display()))
        .unwrap_or_default();
    let text = format!(
        " {logging}  rejected {}{export}   s: snapshot  q: quit",
        view.counts.lines_rejected
    );
    let bar = Paragraph::new(text).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}

/// Y bounds with a little headroom; flat series get a unit band.
fn padded_bounds((lo, hi): (f64, f64)) -> [f64; 2] {
    let pad = if hi - lo < 1e-9 { 1.0 } else { (hi - lo) * 0.1 };
    [lo - pad, hi + pad]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
