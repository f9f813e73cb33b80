use super::{config::EstimatorConfig, data_rate::DataRate};

/// Adjusts a held bitrate multiplicatively from the loss fraction observed
/// since the previous update: fast back-off above `loss_down_threshold`, slow
/// probing below `loss_up_threshold`, capped so the probe never runs ahead of
/// what the path recently delivered.
pub struct LossRateController {
    current: DataRate,
    min_rate: DataRate,
    max_rate: DataRate,
    up_threshold: f64,
    down_threshold: f64,
    down_factor: f64,
    up_factor: f64,
    delivery_headroom: f64,
    packets_in_window: u64,
    arrived_in_window: u64,
    lost_in_window: u64,
}

impl LossRateController {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            current: config.initial_rate,
            min_rate: config.min_rate,
            max_rate: config.max_rate,
            up_threshold: config.loss_up_threshold,
            down_threshold: config.loss_down_threshold,
            down_factor: config.loss_down_factor,
            up_factor: config.loss_up_factor,
            delivery_headroom: config.delivery_headroom,
            packets_in_window: 0,
            arrived_in_window: 0,
            lost_in_window: 0,
        }
    }

    pub fn on_ack(&mut self, arrived: bool) {
        self.packets_in_window += 1;
        if arrived {
            self.arrived_in_window += 1;
        } else {
            self.lost_in_window += 1;
        }
    }

    pub fn latest_estimate(&self) -> DataRate {
        self.current
    }

    /// Folds the counters gathered since the last call into the held rate and
    /// resets them. With no packets in the window the rate is left untouched.
    pub fn update(&mut self, last_delivery_rate: DataRate) -> DataRate {
        if self.packets_in_window == 0 {
            return self.current;
        }
        let loss = self.lost_in_window as f64 / self.packets_in_window as f64;
        if loss > self.down_threshold {
            let backed_off = self.current * (1.0 - self.down_factor * loss);
            self.current = std::cmp::max(backed_off, self.min_rate);
        } else if loss < self.up_threshold {
            let probed = self.current * self.up_factor;
            // Never probe beyond delivery_headroom times what the path just
            // delivered, but a stale delivery measurement must not pull the
            // rate downward either.
            let ceiling = std::cmp::max(
                std::cmp::min(probed, last_delivery_rate * self.delivery_headroom),
                self.current,
            );
            self.current = std::cmp::min(ceiling, self.max_rate);
        }
        log::trace!(
            "loss controller: {}/{} lost, {} arrived, rate {} bps",
            self.lost_in_window,
            self.packets_in_window,
            self.arrived_in_window,
            self.current.bps()
        );
        self.packets_in_window = 0;
        self.arrived_in_window = 0;
        self.lost_in_window = 0;
        self.current
    }
}
