//! Repetition metrics aggregation.
//!
//! Reduces the ordered `(angle, timestamp)` window of one repetition into
//! its summary statistics. The window is split at the deepest sample: the
//! part before it is the descent (flexion), the part after it the ascent.
//! Missing frames are simply absent from the window, so every statistic is
//! computed over the samples that are present.

use std::collections::VecDeque;

use crate::analysis::types::{RepMetrics, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepSample {
    pub angle_deg: f64,
    pub timestamp_ms: Timestamp,
}

impl RepSample {
    pub fn new(angle_deg: f64, timestamp_ms: Timestamp) -> Self {
        Self {
            angle_deg,
            timestamp_ms,
        }
    }
}

/// Bounded, ordered sample buffer; the oldest sample is evicted first.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<RepSample>,
    capacity: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    pub fn push(&mut self, sample: RepSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Drops everything and starts over from `sample`.
    pub fn restart_at(&mut self, sample: RepSample) {
        self.samples.clear();
        self.samples.push_back(sample);
    }

    pub fn last(&self) -> Option<&RepSample> {
        self.samples.back()
    }

    pub fn first(&self) -> Option<&RepSample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn aggregate(&mut self) -> RepMetrics {
        aggregate(self.samples.make_contiguous())
    }
}

pub fn aggregate(samples: &[RepSample]) -> RepMetrics {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return RepMetrics::default();
    };

    let mut min_idx = 0;
    let mut min_angle = f64::INFINITY;
    let mut max_angle = f64::NEG_INFINITY;
    for (i, sample) in samples.iter().enumerate() {
        if sample.angle_deg < min_angle {
            min_angle = sample.angle_deg;
            min_idx = i;
        }
        max_angle = max_angle.max(sample.angle_deg);
    }

    let execution_ms = last.timestamp_ms.saturating_sub(first.timestamp_ms);

    RepMetrics {
        min_angle,
        max_angle,
        amplitude: (max_angle - min_angle).abs(),
        execution_time_sec: execution_ms as f64 / 1000.0,
        ascent_velocity_deg_per_sec: segment_velocity(&samples[min_idx..]),
        descent_velocity_deg_per_sec: segment_velocity(&samples[..=min_idx]),
    }
}

/// Angle span of the segment per second; 0 for segments that cannot
/// express a rate.
fn segment_velocity(segment: &[RepSample]) -> f64 {
    if segment.len() < 2 {
        return 0.0;
    }
    let (Some(first), Some(last)) = (segment.first(), segment.last()) else {
        return 0.0;
    };
    let duration_sec = last.timestamp_ms.saturating_sub(first.timestamp_ms) as f64 / 1000.0;
    if duration_sec <= 0.0 {
        return 0.0;
    }

    let (lo, hi) = segment
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s.angle_deg), hi.max(s.angle_deg))
        });
    (hi - lo).abs() / duration_sec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(angles: &[f64], step_ms: u64) -> Vec<RepSample> {
        angles
            .iter()
            .enumerate()
            .map(|(i, a)| RepSample::new(*a, i as u64 * step_ms))
            .collect()
    }

    #[test]
    fn reference_window() {
        let window = samples(&[170.0, 150.0, 120.0, 100.0, 130.0, 160.0, 175.0], 100);
        let m = aggregate(&window);
        assert_eq!(m.min_angle, 100.0);
        assert_eq!(m.max_angle, 175.0);
        assert_eq!(m.amplitude, 75.0);
        assert!((m.execution_time_sec - 0.6).abs() < 1e-9);
        // descent 170 -> 100 over 300 ms, ascent 100 -> 175 over 300 ms
        assert!((m.descent_velocity_deg_per_sec - 70.0 / 0.3).abs() < 1e-9);
        assert!((m.ascent_velocity_deg_per_sec - 75.0 / 0.3).abs() < 1e-9);
    }

    #[test]
    fn gaps_only_count_present_samples() {
        let window = vec![
            RepSample::new(170.0, 0),
            RepSample::new(90.0, 400),
            RepSample::new(172.0, 1400),
        ];
        let m = aggregate(&window);
        assert_eq!(m.min_angle, 90.0);
        assert!((m.execution_time_sec - 1.4).abs() < 1e-9);
        assert!((m.descent_velocity_deg_per_sec - 200.0).abs() < 1e-9);
        assert!((m.ascent_velocity_deg_per_sec - 82.0).abs() < 1e-9);
    }

    #[test]
    fn single_sample_segments_have_zero_velocity() {
        // minimum is the first sample: no descent segment to speak of
        let window = samples(&[90.0, 120.0, 170.0], 100);
        let m = aggregate(&window);
        assert_eq!(m.descent_velocity_deg_per_sec, 0.0);
        assert!(m.ascent_velocity_deg_per_sec > 0.0);

        let m = aggregate(&samples(&[120.0], 100));
        assert_eq!(m.amplitude, 0.0);
        assert_eq!(m.execution_time_sec, 0.0);
        assert_eq!(m.ascent_velocity_deg_per_sec, 0.0);
    }

    #[test]
    fn identical_timestamps_do_not_divide_by_zero() {
        let window = vec![RepSample::new(170.0, 50), RepSample::new(80.0, 50)];
        let m = aggregate(&window);
        assert_eq!(m.descent_velocity_deg_per_sec, 0.0);
        assert!(m.descent_velocity_deg_per_sec.is_finite());
    }

    #[test]
    fn empty_window_yields_zeroed_metrics() {
        assert_eq!(aggregate(&[]), RepMetrics::default());
    }

    #[test]
    fn window_evicts_oldest_when_full() {
        let mut window = SampleWindow::new(3);
        for (i, angle) in [170.0, 160.0, 150.0, 140.0].iter().enumerate() {
            window.push(RepSample::new(*angle, i as u64));
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.first().map(|s| s.angle_deg), Some(160.0));

        window.restart_at(RepSample::new(175.0, 10));
        assert_eq!(window.len(), 1);
        assert_eq!(window.aggregate().max_angle, 175.0);
    }
}
