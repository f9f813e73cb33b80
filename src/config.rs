use super::{
    data_rate::DataRate,
    error::{Error, Result},
    time::TimeDelta,
};

const MIN_DELIVERY_WINDOW: TimeDelta = TimeDelta::from_millis(100);
const MAX_DELIVERY_WINDOW: TimeDelta = TimeDelta::from_seconds(10);

/// Construction-time configuration for the send-side estimator.
///
/// All fields are plain data with working defaults; overriding a subset via
/// struct update syntax is the expected usage. Validation happens once, when
/// the controller is built.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Target emitted before any feedback has been processed.
    pub initial_rate: DataRate,
    /// Hard lower clamp on every emitted target.
    pub min_rate: DataRate,
    /// Hard upper clamp on every emitted target.
    pub max_rate: DataRate,
    /// Length of the delivery-rate window. Valid range 100 ms ..= 10 s.
    pub delivery_window: TimeDelta,
    /// How long the delay gradient must stay above the adaptive threshold
    /// before overuse is signalled.
    pub overuse_time_threshold: TimeDelta,
    /// Loss fraction below which the loss controller probes upward.
    pub loss_up_threshold: f64,
    /// Loss fraction above which the loss controller backs off.
    pub loss_down_threshold: f64,
    /// Scale applied to the observed loss fraction when backing off.
    pub loss_down_factor: f64,
    /// Multiplicative step used when probing upward.
    pub loss_up_factor: f64,
    /// Cap on upward probing, as a multiple of the measured delivery rate.
    pub delivery_headroom: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            initial_rate: DataRate::from_kilobits_per_sec(1_000),
            min_rate: DataRate::from_bits_per_sec(10_000),
            max_rate: DataRate::from_bits_per_sec(100_000_000),
            delivery_window: TimeDelta::from_seconds(1),
            overuse_time_threshold: TimeDelta::from_millis(10),
            loss_up_threshold: 0.02,
            loss_down_threshold: 0.10,
            loss_down_factor: 0.5,
            loss_up_factor: 1.05,
            delivery_headroom: 1.5,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_rate > self.max_rate {
            return Err(Error::InvalidConfiguration(format!(
                "min_rate {} bps exceeds max_rate {} bps",
                self.min_rate.bps(),
                self.max_rate.bps()
            )));
        }
        if self.initial_rate < self.min_rate || self.initial_rate > self.max_rate {
            return Err(Error::InvalidConfiguration(format!(
                "initial_rate {} bps outside [{}, {}] bps",
                self.initial_rate.bps(),
                self.min_rate.bps(),
                self.max_rate.bps()
            )));
        }
        if self.min_rate <= DataRate::zero() {
            return Err(Error::InvalidConfiguration(
                "min_rate must be positive".to_owned(),
            ));
        }
        if self.delivery_window < MIN_DELIVERY_WINDOW || self.delivery_window > MAX_DELIVERY_WINDOW
        {
            return Err(Error::InvalidConfiguration(format!(
                "delivery_window {} ms outside [{}, {}] ms",
                self.delivery_window.ms(),
                MIN_DELIVERY_WINDOW.ms(),
                MAX_DELIVERY_WINDOW.ms()
            )));
        }
        if self.overuse_time_threshold <= TimeDelta::zero() {
            return Err(Error::InvalidConfiguration(
                "overuse_time_threshold must be positive".to_owned(),
            ));
        }
        if !(0.0..1.0).contains(&self.loss_up_threshold)
            || !(0.0..1.0).contains(&self.loss_down_threshold)
            || self.loss_up_threshold > self.loss_down_threshold
        {
            return Err(Error::InvalidConfiguration(
                "loss thresholds must satisfy 0 <= up <= down < 1".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&self.loss_down_factor) {
            return Err(Error::InvalidConfiguration(
                "loss_down_factor must be in (0, 1]".to_owned(),
            ));
        }
        if self.loss_up_factor < 1.0 {
            return Err(Error::InvalidConfiguration(
                "loss_up_factor must be >= 1".to_owned(),
            ));
        }
        if self.delivery_headroom < 1.0 {
            return Err(Error::InvalidConfiguration(
                "delivery_headroom must be >= 1".to_owned(),
            ));
        }
        Ok(())
    }
}
