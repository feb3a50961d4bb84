//! Bounded window of the most recent samples for live display.
//!
//! The window keeps at most `capacity` samples and evicts the oldest on
//! overflow. Evicted samples have already been written to the session log, so
//! eviction never loses data. Display code reads a [`WindowSnapshot`], an
//! independent copy, so a redraw never observes a push in progress.

use std::collections::VecDeque;

use serde::Serialize;

use crate::sample::{Channel, Sample};

/// Default number of samples kept for live display.
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Fixed-capacity FIFO of recent samples.
#[derive(Debug, Clone)]
pub struct LiveWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
    pushed: u64,
}

impl LiveWindow {
    /// Create an empty window. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            pushed: 0,
        }
    }

    /// Append a sample, returning the evicted oldest sample when full.
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        self.pushed += 1;
        evicted
    }

    /// Copy the current contents, oldest first.
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            first_index: self.pushed - self.samples.len() as u64,
            samples: self.samples.iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples pushed since the window was created, evicted ones included.
    pub fn total_pushed(&self) -> u64 {
        self.pushed
    }
}

impl Default for LiveWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

/// Point-in-time copy of a [`LiveWindow`].
///
/// The display x-axis is the sample's sequence number since the live session
/// started, not wall-clock time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowSnapshot {
    /// Sequence number of `samples[0]`.
    pub first_index: u64,
    pub samples: Vec<Sample>,
}

impl WindowSnapshot {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// `(sequence number, value)` pairs for one channel.
    pub fn series(&self, channel: Channel) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .enumerate()
            .map(|(i, s)| ((self.first_index + i as u64) as f64, s.value(channel)))
            .collect()
    }

    /// Sequence-number range covered, as chart x bounds.
    pub fn index_bounds(&self) -> (f64, f64) {
        let start = self.first_index as f64;
        let end = (self.first_index + self.samples.len().saturating_sub(1) as u64) as f64;
        (start, end)
    }

    /// Minimum and maximum over the given channels, or `None` when empty.
    pub fn value_bounds(&self, channels: &[Channel]) -> Option<(f64, f64)> {
        let mut values = self
            .samples
            .iter()
            .flat_map(|s| channels.iter().map(move |&c| s.value(c)));
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, s % 60)
            .unwrap()
    }

    fn sample(n: u32) -> Sample {
        Sample::new(at(n), [60.0 + n as f64, 25.0, 40.0, n as f64])
    }

    #[test]
    fn push_below_capacity_evicts_nothing() {
        let mut w = LiveWindow::new(3);
        assert_eq!(w.push(sample(0)), None);
        assert_eq!(w.push(sample(1)), None);
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn push_beyond_capacity_evicts_oldest() {
        let mut w = LiveWindow::new(3);
        for n in 0..3 {
            w.push(sample(n));
        }
        let evicted = w.push(sample(3)).unwrap();
        assert_eq!(evicted.fan_speed, 0.0);
        let evicted = w.push(sample(4)).unwrap();
        assert_eq!(evicted.fan_speed, 1.0);
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn keeps_last_n_in_arrival_order() {
        let mut w = LiveWindow::new(5);
        for n in 0..23 {
            w.push(sample(n));
            assert!(w.snapshot().len() <= 5);
        }
        let snap = w.snapshot();
        let fans: Vec<f64> = snap.samples.iter().map(|s| s.fan_speed).collect();
        assert_eq!(fans, vec![18.0, 19.0, 20.0, 21.0, 22.0]);
        assert_eq!(snap.first_index, 18);
        assert_eq!(w.total_pushed(), 23);
    }

    #[test]
    fn snapshot_is_independent_of_later_pushes() {
        let mut w = LiveWindow::new(2);
        w.push(sample(0));
        let snap = w.snapshot();
        w.push(sample(1));
        w.push(sample(2));
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.samples[0].fan_speed, 0.0);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut w = LiveWindow::new(0);
        assert_eq!(w.capacity(), 1);
        w.push(sample(0));
        assert!(w.push(sample(1)).is_some());
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn default_capacity() {
        assert_eq!(LiveWindow::default().capacity(), DEFAULT_WINDOW_CAPACITY);
    }

    // -----------------------------------------------------------------------
    // Snapshot helpers
    // -----------------------------------------------------------------------

    #[test]
    fn series_uses_sequence_numbers() {
        let mut w = LiveWindow::new(2);
        for n in 0..4 {
            w.push(sample(n));
        }
        let snap = w.snapshot();
        assert_eq!(snap.series(Channel::FanSpeed), vec![(2.0, 2.0), (3.0, 3.0)]);
        assert_eq!(snap.index_bounds(), (2.0, 3.0));
    }

    #[test]
    fn value_bounds_span_channels() {
        let mut w = LiveWindow::new(10);
        w.push(Sample::new(at(0), [60.0, 25.0, 40.0, 128.0]));
        w.push(Sample::new(at(1), [61.0, 24.0, 41.0, 130.0]));
        let snap = w.snapshot();
        assert_eq!(
            snap.value_bounds(&[Channel::BedTemp, Channel::AmbTemp]),
            Some((24.0, 61.0))
        );
        assert_eq!(WindowSnapshot::default().value_bounds(&[Channel::Humidity]), None);
        assert_eq!(snap.latest().unwrap().fan_speed, 130.0);
    }
}
