use super::inter_arrival::DeltaSample;

// Process noise added per millisecond between samples.
const PROCESS_NOISE_PER_MS: f64 = 1e-3;

const INITIAL_STATE_VARIANCE: f64 = 0.1;
const STATE_VARIANCE_FLOOR: f64 = 1e-7;

// Forgetting factor for the measurement-noise estimate, applied per 30
// samples per second of send spacing.
const CHI: f64 = 0.01;
const MEASUREMENT_NOISE_FLOOR: f64 = 1e-3;

const DELTA_COUNTER_MAX: i64 = 1000;

/// Kalman filter over the per-burst delay variation.
///
/// Each completed burst pair contributes one measurement
/// `z = arrival_delta - send_delta` (milliseconds); the filter tracks the
/// instantaneous one-way-delay gradient `m` and its variance. Measurement
/// noise is an exponentially weighted variance of the innovation, so a noisy
/// path slows the filter down on its own.
pub struct ArrivalTimeFilter {
    m: f64,
    var_m: f64,
    measurement_noise: f64,
    num_deltas: i64,
}

impl ArrivalTimeFilter {
    pub fn new() -> Self {
        Self {
            m: 0.0,
            var_m: INITIAL_STATE_VARIANCE,
            measurement_noise: 0.0,
            num_deltas: 0,
        }
    }

    /// Folds one grouped sample into the estimate. Non-finite measurements
    /// leave the state untouched.
    pub fn update(&mut self, sample: &DeltaSample) {
        let z = (sample.arrival_delta - sample.send_delta).ms_f64();
        if !z.is_finite() {
            return;
        }
        self.num_deltas = std::cmp::min(self.num_deltas + 1, DELTA_COUNTER_MAX);

        let elapsed_ms = sample.send_delta.ms_f64().max(0.0);
        self.var_m += PROCESS_NOISE_PER_MS * elapsed_ms;

        let residual = z - self.m;
        let alpha = (1.0 - CHI).powf(30.0 * elapsed_ms / 1000.0);
        self.measurement_noise = (alpha * self.measurement_noise
            + (1.0 - alpha) * residual * residual)
            .max(MEASUREMENT_NOISE_FLOOR);

        let gain = self.var_m / (self.var_m + self.measurement_noise);
        self.m += gain * residual;
        self.var_m = ((1.0 - gain) * self.var_m).max(STATE_VARIANCE_FLOOR);
    }

    /// Current delay-gradient estimate in milliseconds per burst pair.
    pub fn offset_ms(&self) -> f64 {
        self.m
    }

    pub fn variance(&self) -> f64 {
        self.var_m
    }

    /// Grouped samples folded in since creation, saturating.
    pub fn num_deltas(&self) -> i64 {
        self.num_deltas
    }
}

impl Default for ArrivalTimeFilter {
    fn default() -> Self {
        Self::new()
    }
}
