use std::ops::Range;
use std::time::SystemTime;
use serde::{Deserialize, Serialize};
use crate::analysis::config::FiducialWindow;
use crate::analysis::error::AnalysisError;
/// Bookkeeping attached to every acquisition of one RF pulse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventMeta {
    pub version: u32,
    pub timestamp: SystemTime,
    /// Accumulated pulse count at acquisition time.
    pub event_id: u64,
    pub log_type: u32,
    pub breakdown_flag: bool,
    pub delta_f: f64,
    pub line: u32,
}
impl Default for EventMeta {
    fn default() -> Self {
        Self {
            version: 0,
            timestamp: SystemTime::UNIX_EPOCH,
            event_id: 0,
            log_type: 0,
            breakdown_flag: false,
            delta_f: 0.0,
            line: 0,
        }
    }
}
/// Immutable snapshot of one uniformly sampled acquisition channel.
///
/// Sample `i` sits at `start_offset + i * increment`. Time shifts never mutate a
/// snapshot, [`Waveform::shifted`] hands back a new one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WaveformRecord")]
pub struct Waveform {
    samples: Vec<f64>,
    start_offset: f64,
    increment: f64,
    meta: EventMeta,
}
/// Serialized form, checked through [`Waveform::new`] on the way in.
#[derive(Deserialize)]
struct WaveformRecord {
    samples: Vec<f64>,
    start_offset: f64,
    increment: f64,
    #[serde(default)]
    meta: EventMeta,
}
impl TryFrom<WaveformRecord> for Waveform {
    type Error = AnalysisError;
    fn try_from(record: WaveformRecord) -> Result<Self, Self::Error> {
        Ok(Waveform::new(record.samples, record.start_offset, record.increment)?.with_meta(record.meta))
    }
}
impl Waveform {
    pub fn new(samples: Vec<f64>, start_offset: f64, increment: f64) -> Result<Self, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::EmptyWaveform);
        }
        if !(increment.is_finite() && increment > 0.0) {
            return Err(AnalysisError::InvalidIncrement(increment));
        }
        Ok(Self {
            samples,
            start_offset,
            increment,
            meta: EventMeta::default(),
        })
    }
    pub fn with_meta(mut self, meta: EventMeta) -> Self {
        self.meta = meta;
        self
    }
    pub fn meta(&self) -> &EventMeta {
        &self.meta
    }
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    /// Always false, construction rejects empty records.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn start_offset(&self) -> f64 {
        self.start_offset
    }
    pub fn increment(&self) -> f64 {
        self.increment
    }
    pub fn time_at(&self, index: usize) -> f64 {
        self.start_offset + index as f64 * self.increment
    }
    /// Times of the first and the last sample.
    pub fn bounds(&self) -> (f64, f64) {
        (self.start_offset, self.time_at(self.samples.len() - 1))
    }
    /// Maps fractional window limits onto absolute times of this record.
    pub fn fiducial(&self, window: &FiducialWindow) -> (f64, f64) {
        let (lb, ub) = self.bounds();
        (window.min * (ub - lb) + lb, window.max * (ub - lb) + lb)
    }
    pub fn shifted(&self, delta: f64) -> Waveform {
        Waveform {
            samples: self.samples.clone(),
            start_offset: self.start_offset + delta,
            increment: self.increment,
            meta: self.meta.clone(),
        }
    }
    /// Sample index range covering `[t0, t1]`, never empty.
    ///
    /// An inverted window (`t0 > t1`) selects the whole record.
    pub fn index_range(&self, t0: f64, t1: f64) -> Range<usize> {
        let n = self.samples.len();
        if t0 > t1 {
            return 0..n;
        }
        let i0 = clamp_index(((t0 - self.start_offset) / self.increment).floor(), 0, n - 1);
        let i1 = clamp_index(((t1 - self.start_offset) / self.increment).floor() + 1.0, 1, n);
        i0..i1.max(i0 + 1)
    }
    pub fn samples_in(&self, t0: f64, t1: f64) -> &[f64] {
        &self.samples[self.index_range(t0, t1)]
    }
    pub fn time_axis(&self, t0: f64, t1: f64) -> Vec<f64> {
        self.index_range(t0, t1).map(|i| self.time_at(i)).collect()
    }
    pub fn min(&self, t0: f64, t1: f64) -> f64 {
        self.samples_in(t0, t1).iter().copied().fold(f64::INFINITY, f64::min)
    }
    pub fn max(&self, t0: f64, t1: f64) -> f64 {
        self.samples_in(t0, t1).iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
    /// Largest absolute sample value.
    pub fn magnitude(&self, t0: f64, t1: f64) -> f64 {
        self.samples_in(t0, t1).iter().fold(0.0, |acc: f64, v| acc.max(v.abs()))
    }
    pub fn span(&self, t0: f64, t1: f64) -> f64 {
        (self.max(t0, t1) - self.min(t0, t1)).abs()
    }
    pub fn sum(&self, t0: f64, t1: f64) -> f64 {
        self.samples_in(t0, t1).iter().sum()
    }
    pub fn mean(&self, t0: f64, t1: f64) -> f64 {
        let window = self.samples_in(t0, t1);
        window.iter().sum::<f64>() / window.len() as f64
    }
    /// Population standard deviation.
    pub fn stddev(&self, t0: f64, t1: f64) -> f64 {
        let window = self.samples_in(t0, t1);
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window.len() as f64;
        var.sqrt()
    }
    pub fn median(&self, t0: f64, t1: f64) -> f64 {
        let mut window = self.samples_in(t0, t1).to_vec();
        window.sort_by(|a, b| a.total_cmp(b));
        let mid = window.len() / 2;
        if window.len() % 2 == 0 {
            0.5 * (window[mid - 1] + window[mid])
        } else {
            window[mid]
        }
    }
    /// Rectangle-rule integral, `sum * increment`.
    pub fn integral(&self, t0: f64, t1: f64) -> f64 {
        self.sum(t0, t1) * self.increment
    }
    /// Absolute level sitting at `threshold` between the window minimum and maximum.
    pub fn threshold_level(&self, threshold: f64, t0: f64, t1: f64) -> f64 {
        let min = self.min(t0, t1);
        threshold * (self.max(t0, t1) - min) + min
    }
    /// First crossing of the relative `threshold` scanning forward through `[t0, t1]`.
    ///
    /// A sample sitting exactly on the level counts as the crossing.
    pub fn rising_edge(&self, threshold: f64, t0: f64, t1: f64) -> Option<f64> {
        let range = self.index_range(t0, t1);
        let level = self.threshold_level(threshold, t0, t1);
        let y = &self.samples;
        (range.start + 1..range.end)
            .find(|&i| crosses(y[i - 1] - level, y[i] - level))
            .map(|i| {
                let frac = (y[i] - level) / (y[i] - y[i - 1]);
                self.start_offset + (i as f64 - frac) * self.increment
            })
    }
    /// Last crossing of the relative `threshold`, found scanning backward from `t1`.
    pub fn falling_edge(&self, threshold: f64, t0: f64, t1: f64) -> Option<f64> {
        let range = self.index_range(t0, t1);
        if range.len() < 2 {
            return None;
        }
        let level = self.threshold_level(threshold, t0, t1);
        let y = &self.samples;
        (range.start..range.end - 1)
            .rev()
            .find(|&i| crosses(y[i + 1] - level, y[i] - level))
            .map(|i| {
                let frac = (y[i] - level) / (y[i] - y[i + 1]);
                self.start_offset + (i as f64 + frac) * self.increment
            })
    }
}
/// `from` and `to` are offsets from the level, `to` lands on or beyond it.
fn crosses(from: f64, to: f64) -> bool {
    from * to < 0.0 || (to == 0.0 && from != 0.0)
}
fn clamp_index(value: f64, lo: usize, hi: usize) -> usize {
    if !(value >= lo as f64) {
        lo
    } else if value >= hi as f64 {
        hi
    } else {
        value as usize
    }
}
