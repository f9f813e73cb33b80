use super::{
    ack::Acknowledgement,
    arrival_filter::ArrivalTimeFilter,
    config::EstimatorConfig,
    data_rate::DataRate,
    delay_controller::DelayRateController,
    delivery_rate::DeliveryRateEstimator,
    error::Result,
    inter_arrival::InterArrival,
    loss_controller::LossRateController,
    overuse_detector::OveruseDetector,
    time::{TimeDelta, Timestamp},
};

/// Hook invoked whenever `on_acks` settles on a different target than the
/// previous call. Leaving it unset costs nothing on the hot path.
pub trait TargetTransferRateObserver: Send {
    fn on_target_change(&mut self, target: DataRate);
}

/// Send-side congestion controller: the single owner of the loss, delivery
/// and delay estimators.
///
/// Each call to [`on_acks`](Self::on_acks) is one logical tick. Acks are
/// consumed in the order given, duplicates (by unwrapped sequence number) are
/// dropped, and the emitted target is `min(loss_target, delay_target)`
/// clamped to the configured range. The controller performs no I/O and holds
/// no locks; sharing it across threads needs external mutual exclusion.
pub struct SendSideController {
    min_rate: DataRate,
    max_rate: DataRate,
    highest_acked: Option<u64>,
    delivery_rate: DeliveryRateEstimator,
    loss_controller: LossRateController,
    inter_arrival: InterArrival,
    arrival_filter: ArrivalTimeFilter,
    overuse_detector: OveruseDetector,
    delay_controller: DelayRateController,
    current_target: DataRate,
    observer: Option<Box<dyn TargetTransferRateObserver>>,
}

impl SendSideController {
    pub fn new(config: EstimatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            min_rate: config.min_rate,
            max_rate: config.max_rate,
            highest_acked: None,
            delivery_rate: DeliveryRateEstimator::new(config.delivery_window),
            loss_controller: LossRateController::new(&config),
            inter_arrival: InterArrival::new(InterArrival::default_burst_length()),
            arrival_filter: ArrivalTimeFilter::new(),
            overuse_detector: OveruseDetector::new(config.overuse_time_threshold),
            delay_controller: DelayRateController::new(&config),
            current_target: config.initial_rate,
            observer: None,
        })
    }

    pub fn set_observer(&mut self, observer: Box<dyn TargetTransferRateObserver>) {
        self.observer = Some(observer);
    }

    /// The target emitted by the most recent tick.
    pub fn target_rate(&self) -> DataRate {
        self.current_target
    }

    /// Processes one feedback batch and returns the new target bitrate.
    ///
    /// Batches must be submitted in non-decreasing `now` order. An empty
    /// batch is a no-op and re-emits the previous target. Never fails:
    /// malformed acks are skipped and logged at trace level.
    pub fn on_acks(
        &mut self,
        now: Timestamp,
        rtt: TimeDelta,
        acks: &[Acknowledgement],
    ) -> DataRate {
        if acks.is_empty() {
            return self.current_target;
        }
        for ack in acks {
            if let Some(highest) = self.highest_acked {
                if ack.seq_nr <= highest {
                    log::trace!("ack {} at or below highest {}, ignored", ack.seq_nr, highest);
                    continue;
                }
            }
            self.highest_acked = Some(ack.seq_nr);
            self.loss_controller.on_ack(ack.arrived);
            if !ack.arrived {
                continue;
            }
            if ack.arrival.is_zero() {
                log::trace!("ack {} arrived without an arrival time, ignored", ack.seq_nr);
                continue;
            }
            if let Err(err) = self.delivery_rate.on_packet_acked(ack.arrival, ack.size) {
                log::trace!("ack {} rejected by delivery window: {}", ack.seq_nr, err);
                continue;
            }
            if let Some(sample) = self
                .inter_arrival
                .on_packet(ack.departure, ack.arrival, ack.size)
            {
                self.arrival_filter.update(&sample);
                self.overuse_detector.detect(
                    self.arrival_filter.offset_ms(),
                    self.arrival_filter.num_deltas(),
                    sample.send_delta,
                    ack.arrival,
                );
            }
        }
        let delivered = self.delivery_rate.get_rate();
        let loss_target = self.loss_controller.update(delivered);
        let delay_target =
            self.delay_controller
                .update(self.overuse_detector.state(), delivered, rtt, now);
        let target = std::cmp::min(loss_target, delay_target).clamp(self.min_rate, self.max_rate);
        log::trace!(
            "bwe tick: rtt_ns={} delivered_bps={} loss_target_bps={} delay_target_bps={} chosen_bps={}",
            rtt.ns(),
            delivered.bps(),
            loss_target.bps(),
            delay_target.bps(),
            target.bps()
        );
        if target != self.current_target {
            if let Some(observer) = &mut self.observer {
                observer.on_target_change(target);
            }
        }
        self.current_target = target;
        target
    }
}
