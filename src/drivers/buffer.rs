use std::collections::VecDeque;
use crate::drivers::offset::corrected;
use crate::drivers::scheduler::MAX_TIMER_INTERVAL_MS;
use crate::drivers::DriverError;
/// Upper bound for both the visible window and the retained history.
pub const MAX_WINDOW_SECONDS: f64 = 6.0 * 3600.0;
/// Samples reserved up front; longer histories grow on demand.
const PREALLOC_SAMPLES: f64 = 4096.0;
/// Fewer samples than this and the y range is left to the caller.
const MIN_SAMPLES_FOR_Y_RANGE: usize = 5;
const Y_PAD_FRACTION: f64 = 0.15;
const Y_PAD_MIN: f64 = 0.1;
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePoint {
    /// Seconds since the last reset.
    pub time: f64,
    /// Offset-corrected value.
    pub value: f64,
}
/// Rolling buffer of corrected samples backing the live plot.
///
/// Owns the calibration offset: every `ingest` subtracts it, and changing it
/// restarts the timeline at zero.
pub struct DisplayBuffer {
    data: VecDeque<SamplePoint>,
    first_point: Option<SamplePoint>,
    last_raw: f64,
    offset: f64,
    ticks: u64,
    tick_ms: u64,
    window_seconds: f64,
    retention_seconds: f64,
}
impl DisplayBuffer {
    pub fn with_window(
        window_seconds: f64,
        retention_seconds: f64,
        tick_ms: u64,
    ) -> Result<Self, DriverError> {
        if tick_ms == 0 || tick_ms > MAX_TIMER_INTERVAL_MS {
            return Err(DriverError::InvalidTickInterval);
        }
        if !(window_seconds.is_finite() && window_seconds > 0.0 && window_seconds <= MAX_WINDOW_SECONDS) {
            return Err(DriverError::InvalidWindow(window_seconds));
        }
        let retention_seconds = if retention_seconds.is_finite() {
            retention_seconds.clamp(window_seconds, MAX_WINDOW_SECONDS)
        } else {
            window_seconds
        };
        let capacity = (retention_seconds * 1000.0 / tick_ms as f64)
            .ceil()
            .min(PREALLOC_SAMPLES) as usize
            + 1;
        Ok(Self {
            data: VecDeque::with_capacity(capacity),
            first_point: None,
            last_raw: 0.0,
            offset: 0.0,
            ticks: 0,
            tick_ms,
            window_seconds,
            retention_seconds,
        })
    }
    /// Stores the raw reading, appends its corrected value at the current time
    /// and advances the clock by one tick.
    pub fn ingest(&mut self, raw: f64) {
        self.last_raw = raw;
        let point = SamplePoint {
            time: self.elapsed_seconds(),
            value: corrected(raw, self.offset),
        };
        if self.first_point.is_none() {
            self.first_point = Some(point);
        }
        self.data.push_back(point);
        self.ticks += 1;
        self.prune(point.time);
    }
    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
        self.ticks = 0;
        self.data.clear();
        self.first_point = None;
    }
    pub fn reset_offset(&mut self) {
        self.set_offset(0.0);
    }
    pub fn offset(&self) -> f64 {
        self.offset
    }
    pub fn last_raw(&self) -> f64 {
        self.last_raw
    }
    pub fn elapsed_seconds(&self) -> f64 {
        (self.ticks * self.tick_ms) as f64 / 1000.0
    }
    pub fn window_seconds(&self) -> f64 {
        self.window_seconds
    }
    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }
    /// `(t_min, t_max)` of the scrolling x axis.
    pub fn visible_range(&self) -> (f64, f64) {
        let t_max = self.elapsed_seconds();
        ((t_max - self.window_seconds).max(0.0), t_max)
    }
    /// Padded y range over the newest window of samples, once there is enough data.
    pub fn visible_y_range(&self) -> Option<(f64, f64)> {
        if self.data.len() <= MIN_SAMPLES_FOR_Y_RANGE {
            return None;
        }
        let take = self.window_len().min(self.data.len());
        padded_range(self.data.iter().rev().take(take).map(|p| p.value))
    }
    /// Number of ticks that fit into the display window.
    pub fn window_len(&self) -> usize {
        let window_ms = (self.window_seconds * 1000.0).round() as u64;
        ((window_ms / self.tick_ms) as usize).max(1)
    }
    pub fn first_point(&self) -> Option<SamplePoint> {
        self.first_point
    }
    pub fn now_point(&self) -> Option<SamplePoint> {
        self.data.back().copied()
    }
    pub fn samples(&self) -> impl Iterator<Item = &SamplePoint> {
        self.data.iter()
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    /// Samples inside the visible window, ready for `egui_plot::PlotPoints`.
    pub fn plot_points(&self) -> Vec<[f64; 2]> {
        let (t_min, _) = self.visible_range();
        self.data
            .iter()
            .filter(|p| p.time >= t_min)
            .map(|p| [p.time, p.value])
            .collect()
    }
    fn prune(&mut self, newest_time: f64) {
        let threshold = newest_time - self.retention_seconds;
        while let Some(front) = self.data.front() {
            if front.time < threshold {
                self.data.pop_front();
            } else {
                break;
            }
        }
    }
}
/// Min/max of `values` widened by `max(0.1, span * 0.15)` on both sides.
pub fn padded_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    let pad = ((max - min) * Y_PAD_FRACTION).max(Y_PAD_MIN);
    Some((min - pad, max + pad))
}
#[cfg(test)]
mod tests {
    use super::*;
    fn buffer() -> DisplayBuffer {
        DisplayBuffer::with_window(10.0, 20.0, 50).unwrap()
    }
    #[test]
    fn rejects_bad_geometry() {
        assert_eq!(
            DisplayBuffer::with_window(10.0, 20.0, 0).err(),
            Some(DriverError::InvalidTickInterval)
        );
        assert!(DisplayBuffer::with_window(0.0, 20.0, 50).is_err());
        assert!(DisplayBuffer::with_window(f64::NAN, 20.0, 50).is_err());
        assert!(DisplayBuffer::with_window(1e300, 1e300, 50).is_err());
        assert_eq!(
            DisplayBuffer::with_window(10.0, 20.0, u64::MAX).err(),
            Some(DriverError::InvalidTickInterval)
        );
    }
    #[test]
    fn huge_retention_is_clamped() {
        let mut buf = DisplayBuffer::with_window(10.0, 1e300, 50).unwrap();
        assert!(buf.data.capacity() <= 8192);
        buf.ingest(0.5);
        assert_eq!(buf.len(), 1);
        let buf = DisplayBuffer::with_window(10.0, f64::INFINITY, 50).unwrap();
        assert_eq!(buf.retention_seconds, 10.0);
    }
    #[test]
    fn ingest_applies_offset_and_advances_time() {
        let mut buf = buffer();
        buf.ingest(1.0);
        buf.ingest(0.5);
        let pts: Vec<_> = buf.samples().copied().collect();
        assert_eq!(pts[0], SamplePoint { time: 0.0, value: 1.0 });
        assert_eq!(pts[1], SamplePoint { time: 0.05, value: 0.5 });
        assert_eq!(buf.last_raw(), 0.5);
        assert!((buf.elapsed_seconds() - 0.1).abs() < 1e-12);
    }
    #[test]
    fn set_offset_restarts_timeline() {
        let mut buf = buffer();
        for v in [0.2, 0.4, 0.6] {
            buf.ingest(v);
        }
        buf.set_offset(0.25);
        assert!(buf.is_empty());
        assert_eq!(buf.elapsed_seconds(), 0.0);
        assert_eq!(buf.first_point(), None);
        assert_eq!(buf.offset(), 0.25);
        buf.ingest(1.0);
        assert_eq!(buf.first_point(), Some(SamplePoint { time: 0.0, value: 0.75 }));
        buf.ingest(-1.0);
        buf.ingest(3.0);
        // The start marker does not follow later samples.
        assert_eq!(buf.first_point(), Some(SamplePoint { time: 0.0, value: 0.75 }));
    }
    #[test]
    fn visible_range_stays_inside_window() {
        let mut buf = buffer();
        assert_eq!(buf.visible_range(), (0.0, 0.0));
        for i in 0..1000 {
            buf.ingest((i as f64 * 0.1).sin());
            let (t_min, t_max) = buf.visible_range();
            assert!(t_min >= 0.0);
            assert!(t_max - t_min <= buf.window_seconds() + 1e-9);
        }
        let (t_min, t_max) = buf.visible_range();
        assert!((t_max - 50.0).abs() < 1e-9);
        assert!((t_min - 40.0).abs() < 1e-9);
    }
    #[test]
    fn padded_range_uses_fraction_of_span() {
        let (lo, hi) = padded_range([1.0, -1.0].into_iter()).unwrap();
        assert!((lo + 1.3).abs() < 1e-9);
        assert!((hi - 1.3).abs() < 1e-9);
        let (lo, hi) = padded_range([0.2, 0.2].into_iter()).unwrap();
        assert!((lo - 0.1).abs() < 1e-9);
        assert!((hi - 0.3).abs() < 1e-9);
        assert_eq!(padded_range(std::iter::empty()), None);
    }
    #[test]
    fn y_range_needs_more_than_five_samples() {
        let mut buf = buffer();
        for v in [1.0, -1.0, 1.0, -1.0, 1.0] {
            buf.ingest(v);
        }
        assert_eq!(buf.visible_y_range(), None);
        buf.ingest(-1.0);
        let (lo, hi) = buf.visible_y_range().unwrap();
        assert!((lo + 1.3).abs() < 1e-9);
        assert!((hi - 1.3).abs() < 1e-9);
    }
    #[test]
    fn y_range_ignores_samples_older_than_window() {
        let mut buf = buffer();
        buf.ingest(100.0);
        for _ in 0..buf.window_len() {
            buf.ingest(0.0);
        }
        let (lo, hi) = buf.visible_y_range().unwrap();
        assert!((lo + 0.1).abs() < 1e-9);
        assert!((hi - 0.1).abs() < 1e-9);
    }
    #[test]
    fn long_sessions_are_trimmed_to_retention() {
        let mut buf = buffer();
        for _ in 0..10_000 {
            buf.ingest(0.0);
        }
        assert!(buf.len() <= 401);
        assert!(buf.plot_points().len() <= buf.window_len() + 1);
        assert_eq!(buf.first_point(), Some(SamplePoint { time: 0.0, value: 0.0 }));
    }
    #[test]
    fn reset_offset_is_idempotent() {
        let mut buf = buffer();
        buf.set_offset(0.7);
        buf.ingest(1.0);
        buf.reset_offset();
        buf.reset_offset();
        assert_eq!(buf.offset(), 0.0);
        assert!(buf.is_empty());
        assert_eq!(buf.elapsed_seconds(), 0.0);
    }
}
