use super::{
    config::EstimatorConfig,
    data_rate::{DataRate, DataSize},
    overuse_detector::BandwidthUsage,
    time::{TimeDelta, Timestamp},
};

const DEFAULT_RTT: TimeDelta = TimeDelta::from_millis(200);
const BACKOFF_FACTOR: f64 = 0.85;
const MULTIPLICATIVE_GROWTH_PER_SECOND: f64 = 1.08;
const NEAR_MAX_FRACTION: f64 = 0.9;
const MIN_INCREASE: DataRate = DataRate::from_bits_per_sec(1_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControlState {
    Hold,
    Increase,
    Decrease,
}

/// FSM advance on one detector signal. Overuse always forces a decrease,
/// underuse always holds (the queues are draining; wait them out), and a
/// normal signal resumes growth except directly after a decrease.
pub(crate) fn transition(state: RateControlState, signal: BandwidthUsage) -> RateControlState {
    match signal {
        BandwidthUsage::Overusing => RateControlState::Decrease,
        BandwidthUsage::Underusing => RateControlState::Hold,
        BandwidthUsage::Normal => match state {
            RateControlState::Hold | RateControlState::Increase => RateControlState::Increase,
            RateControlState::Decrease => RateControlState::Hold,
        },
    }
}

/// Delay-based rate controller: a {Hold, Increase, Decrease} state machine
/// driven by the overuse detector.
///
/// While increasing, growth is multiplicative when the target sits well below
/// the largest recently delivered rate (ramp back quickly after a back-off)
/// and additive once it closes in on it. A decrease steps to 85% of the
/// delivered rate, never landing above 85% of the previous target.
pub struct DelayRateController {
    state: RateControlState,
    target: DataRate,
    min_rate: DataRate,
    max_rate: DataRate,
    max_delivered: Option<DataRate>,
    time_last_change: Timestamp,
    rtt: TimeDelta,
}

impl DelayRateController {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            state: RateControlState::Hold,
            target: config.initial_rate,
            min_rate: config.min_rate,
            max_rate: config.max_rate,
            max_delivered: None,
            time_last_change: Timestamp::minus_infinity(),
            rtt: DEFAULT_RTT,
        }
    }

    pub fn state(&self) -> RateControlState {
        self.state
    }

    pub fn latest_estimate(&self) -> DataRate {
        self.target
    }

    /// Advances the FSM on the latched detector signal and recomputes the
    /// delay-based target.
    pub fn update(
        &mut self,
        signal: BandwidthUsage,
        delivered: DataRate,
        rtt: TimeDelta,
        now: Timestamp,
    ) -> DataRate {
        if rtt > TimeDelta::zero() {
            self.rtt = rtt;
        }
        if !delivered.is_zero() {
            self.max_delivered = Some(match self.max_delivered {
                Some(max) => std::cmp::max(max, delivered),
                None => delivered,
            });
        }
        self.state = transition(self.state, signal);
        match self.state {
            RateControlState::Hold => {}
            RateControlState::Increase => {
                let near_max = match self.max_delivered {
                    Some(max) => self.target >= max * NEAR_MAX_FRACTION,
                    None => false,
                };
                let increase = if near_max {
                    self.additive_increase(now)
                } else {
                    self.multiplicative_increase(now)
                };
                self.target = self.target + increase;
                self.time_last_change = now;
            }
            RateControlState::Decrease => {
                // A vanished delivery measurement must not collapse the
                // target to zero; keep the previous value instead.
                if !delivered.is_zero() {
                    let backed_off = std::cmp::min(
                        delivered * BACKOFF_FACTOR,
                        self.target * BACKOFF_FACTOR,
                    );
                    self.target = backed_off;
                }
                self.time_last_change = now;
            }
        }
        self.target = self.target.clamp(self.min_rate, self.max_rate);
        self.target
    }

    fn multiplicative_increase(&self, now: Timestamp) -> DataRate {
        let mut growth = MULTIPLICATIVE_GROWTH_PER_SECOND;
        if self.time_last_change.is_finite() {
            let elapsed = now - self.time_last_change;
            if elapsed.is_zero() {
                return DataRate::zero();
            }
            growth = growth.powf(elapsed.seconds_f64().min(1.0));
        }
        std::cmp::max(self.target * (growth - 1.0), MIN_INCREASE)
    }

    fn additive_increase(&self, now: Timestamp) -> DataRate {
        let elapsed_seconds = if self.time_last_change.is_finite() {
            (now - self.time_last_change).seconds_f64().clamp(0.0, 1.0)
        } else {
            0.0
        };
        let rate_per_second = self.near_max_increase_rate_bps_per_second();
        DataRate::from_bits_per_sec((rate_per_second * elapsed_seconds) as i64)
    }

    /// Additive growth budget: roughly one average packet per response time,
    /// where the response time covers the feedback path and detector delay.
    fn near_max_increase_rate_bps_per_second(&self) -> f64 {
        const FRAME_INTERVAL: TimeDelta = TimeDelta::from_micros(1_000_000 / 30);
        const PACKET_SIZE: DataSize = DataSize::from_bytes(1_200);
        let frame_size = self.target * FRAME_INTERVAL;
        let packets_per_frame =
            (frame_size.bytes() as f64 / PACKET_SIZE.bytes() as f64).ceil().max(1.0);
        let avg_packet_size = frame_size / packets_per_frame;
        let response_time = (self.rtt + TimeDelta::from_millis(100)) * 2.0;
        let increase_per_second = (avg_packet_size / response_time).bps() as f64;
        increase_per_second.max(MIN_INCREASE.bps() as f64)
    }
}
