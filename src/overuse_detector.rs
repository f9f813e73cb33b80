use super::time::{TimeDelta, Timestamp};

const MAX_ADAPT_OFFSET_MS: f64 = 15.0;
const MIN_NUM_DELTAS: i64 = 60;

const INITIAL_THRESHOLD_MS: f64 = 12.5;
const THRESHOLD_MIN_MS: f64 = 6.0;
const THRESHOLD_MAX_MS: f64 = 600.0;

const K_UP: f64 = 0.01;
const K_DOWN: f64 = 0.00018;

const MAX_THRESHOLD_UPDATE_DELTA: TimeDelta = TimeDelta::from_millis(100);

/// Classification of the estimated delay gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandwidthUsage {
    Normal,
    Overusing,
    Underusing,
}

/// Compares the filtered delay gradient against an adaptive threshold and
/// latches the resulting signal until the next sample.
///
/// Overuse is only reported once the gradient has stayed above the threshold
/// for `overuse_time_threshold` across more than one sample without
/// decreasing; a single spike never triggers a back-off.
pub struct OveruseDetector {
    overuse_time_threshold: TimeDelta,
    threshold_ms: f64,
    time_over_using: Option<TimeDelta>,
    overuse_counter: i32,
    prev_offset_ms: f64,
    last_threshold_update: Timestamp,
    hypothesis: BandwidthUsage,
}

impl OveruseDetector {
    pub fn new(overuse_time_threshold: TimeDelta) -> Self {
        Self {
            overuse_time_threshold,
            threshold_ms: INITIAL_THRESHOLD_MS,
            time_over_using: None,
            overuse_counter: 0,
            prev_offset_ms: 0.0,
            last_threshold_update: Timestamp::minus_infinity(),
            hypothesis: BandwidthUsage::Normal,
        }
    }

    /// The latched signal from the most recent sample.
    pub fn state(&self) -> BandwidthUsage {
        self.hypothesis
    }

    /// Evaluates one filtered sample. `offset_ms` is the filter's gradient
    /// estimate, `num_deltas` the number of samples behind it, `send_delta`
    /// the spacing of the burst pair and `now` the arrival clock.
    pub fn detect(
        &mut self,
        offset_ms: f64,
        num_deltas: i64,
        send_delta: TimeDelta,
        now: Timestamp,
    ) -> BandwidthUsage {
        if num_deltas < 2 {
            return BandwidthUsage::Normal;
        }
        let modified_offset = std::cmp::min(num_deltas, MIN_NUM_DELTAS) as f64 * offset_ms;
        if modified_offset > self.threshold_ms {
            let accumulated = match self.time_over_using {
                // Assume overuse for half the spacing since the last sample.
                None => send_delta / 2.0,
                Some(so_far) => so_far + send_delta,
            };
            self.time_over_using = Some(accumulated);
            self.overuse_counter += 1;
            if accumulated > self.overuse_time_threshold
                && self.overuse_counter > 1
                && offset_ms >= self.prev_offset_ms
            {
                self.time_over_using = Some(TimeDelta::zero());
                self.overuse_counter = 0;
                self.hypothesis = BandwidthUsage::Overusing;
            }
        } else if modified_offset < -self.threshold_ms {
            self.time_over_using = None;
            self.overuse_counter = 0;
            self.hypothesis = BandwidthUsage::Underusing;
        } else {
            self.time_over_using = None;
            self.overuse_counter = 0;
            self.hypothesis = BandwidthUsage::Normal;
        }
        self.prev_offset_ms = offset_ms;
        self.adapt_threshold(modified_offset, now);
        self.hypothesis
    }

    fn adapt_threshold(&mut self, modified_offset: f64, now: Timestamp) {
        if self.last_threshold_update.is_infinite() {
            self.last_threshold_update = now;
        }
        if modified_offset.abs() > self.threshold_ms + MAX_ADAPT_OFFSET_MS {
            // Don't chase big latency spikes, e.g. a sudden capacity drop.
            self.last_threshold_update = now;
            return;
        }
        let k = if modified_offset.abs() < self.threshold_ms {
            K_DOWN
        } else {
            K_UP
        };
        let time_delta = std::cmp::min(
            now - self.last_threshold_update,
            MAX_THRESHOLD_UPDATE_DELTA,
        );
        self.threshold_ms += k * (modified_offset.abs() - self.threshold_ms) * time_delta.ms_f64();
        self.threshold_ms = self.threshold_ms.clamp(THRESHOLD_MIN_MS, THRESHOLD_MAX_MS);
        self.last_threshold_update = now;
    }
}
