use super::{
    data_rate::DataSize,
    time::{TimeDelta, Timestamp},
};

// After this many groups with negative arrival deltas the grouper resets,
// assuming receive-side reordering or a clock jump.
const REORDERED_RESET_THRESHOLD: i32 = 3;

const BURST_DELTA_THRESHOLD: TimeDelta = TimeDelta::from_millis(5);
const MAX_BURST_DURATION: TimeDelta = TimeDelta::from_millis(100);

/// Deltas between two completed send bursts.
#[derive(Debug, Clone, Copy)]
pub struct DeltaSample {
    pub send_delta: TimeDelta,
    pub arrival_delta: TimeDelta,
    pub size_delta: i64,
}

/// Coalesces acknowledgements into send bursts and emits one
/// [`DeltaSample`] per completed pair of bursts.
///
/// A burst is all packets whose departure lies within `burst_length` of the
/// burst's first departure; a packet delivered faster than its predecessor is
/// also absorbed while the burst stays short.
pub struct InterArrival {
    burst_length: TimeDelta,
    current_burst: SendBurst,
    prev_burst: SendBurst,
    num_consecutive_reordered: i32,
}

impl InterArrival {
    pub fn new(burst_length: TimeDelta) -> Self {
        Self {
            burst_length,
            current_burst: SendBurst::new(),
            prev_burst: SendBurst::new(),
            num_consecutive_reordered: 0,
        }
    }

    pub const fn default_burst_length() -> TimeDelta {
        BURST_DELTA_THRESHOLD
    }

    /// Feeds one arrived packet. Returns the deltas of the burst pair the
    /// packet completed, if any.
    pub fn on_packet(
        &mut self,
        departure: Timestamp,
        arrival: Timestamp,
        size: DataSize,
    ) -> Option<DeltaSample> {
        let mut sample = None;
        if self.current_burst.is_empty() {
            self.current_burst.departure = departure;
            self.current_burst.first_departure = departure;
            self.current_burst.first_arrival = arrival;
        } else if self.current_burst.first_departure > departure {
            // Reordered across bursts; the grouper only moves forward.
            return None;
        } else if self.starts_new_burst(departure, arrival) {
            if self.prev_burst.complete_time.is_finite() {
                let send_delta = self.current_burst.departure - self.prev_burst.departure;
                let arrival_delta =
                    self.current_burst.complete_time - self.prev_burst.complete_time;
                if arrival_delta < TimeDelta::zero() {
                    self.num_consecutive_reordered += 1;
                    if self.num_consecutive_reordered >= REORDERED_RESET_THRESHOLD {
                        log::warn!(
                            "bursts arrived out of order, resetting: arrival_delta_ms={}, send_delta_ms={}",
                            arrival_delta.ms(),
                            send_delta.ms()
                        );
                        self.reset();
                    }
                    return None;
                }
                self.num_consecutive_reordered = 0;
                sample = Some(DeltaSample {
                    send_delta,
                    arrival_delta,
                    size_delta: self.current_burst.size.bytes() - self.prev_burst.size.bytes(),
                });
            }
            self.prev_burst = self.current_burst.clone();
            self.current_burst.first_departure = departure;
            self.current_burst.departure = departure;
            self.current_burst.first_arrival = arrival;
            self.current_burst.size = DataSize::zero();
        } else {
            self.current_burst.departure = std::cmp::max(self.current_burst.departure, departure);
        }
        self.current_burst.size = self.current_burst.size + size;
        self.current_burst.complete_time = arrival;
        sample
    }

    /// True when the current burst is complete and the packet at `departure`
    /// opens a new one.
    fn starts_new_burst(&self, departure: Timestamp, arrival: Timestamp) -> bool {
        if self.current_burst.is_empty() || self.belongs_to_burst(departure, arrival) {
            return false;
        }
        departure - self.current_burst.first_departure > self.burst_length
    }

    fn belongs_to_burst(&self, departure: Timestamp, arrival: Timestamp) -> bool {
        let arrival_delta = arrival - self.current_burst.complete_time;
        let send_delta = departure - self.current_burst.departure;
        if send_delta.is_zero() {
            return true;
        }
        let propagation_delta = arrival_delta - send_delta;
        propagation_delta < TimeDelta::zero()
            && arrival_delta <= BURST_DELTA_THRESHOLD
            && arrival - self.current_burst.first_arrival < MAX_BURST_DURATION
    }

    fn reset(&mut self) {
        self.num_consecutive_reordered = 0;
        self.current_burst = SendBurst::new();
        self.prev_burst = SendBurst::new();
    }
}

#[derive(Debug, Clone)]
struct SendBurst {
    size: DataSize,
    first_departure: Timestamp,
    departure: Timestamp,
    first_arrival: Timestamp,
    complete_time: Timestamp,
}

impl SendBurst {
    fn new() -> Self {
        Self {
            size: DataSize::zero(),
            first_departure: Timestamp::minus_infinity(),
            departure: Timestamp::minus_infinity(),
            first_arrival: Timestamp::minus_infinity(),
            complete_time: Timestamp::minus_infinity(),
        }
    }

    fn is_empty(&self) -> bool {
        self.complete_time.is_infinite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouper() -> InterArrival {
        InterArrival::new(InterArrival::default_burst_length())
    }

    #[test]
    fn needs_two_completed_bursts_before_emitting() {
        let mut ia = grouper();
        assert!(ia
            .on_packet(
                Timestamp::from_millis(0),
                Timestamp::from_millis(50),
                DataSize::from_bytes(1200)
            )
            .is_none());
        // Completes the first burst, but there is no previous one to diff.
        assert!(ia
            .on_packet(
                Timestamp::from_millis(20),
                Timestamp::from_millis(70),
                DataSize::from_bytes(1200)
            )
            .is_none());
        // Completes the second burst; first delta pair is ready.
        let sample = ia
            .on_packet(
                Timestamp::from_millis(40),
                Timestamp::from_millis(90),
                DataSize::from_bytes(1200),
            )
            .expect("third burst start completes a pair");
        assert_eq!(sample.send_delta, TimeDelta::from_millis(20));
        assert_eq!(sample.arrival_delta, TimeDelta::from_millis(20));
        assert_eq!(sample.size_delta, 0);
    }

    #[test]
    fn packets_within_five_ms_share_a_burst() {
        let mut ia = grouper();
        // Two packets 2 ms apart form one burst.
        ia.on_packet(
            Timestamp::from_millis(0),
            Timestamp::from_millis(50),
            DataSize::from_bytes(1200),
        );
        ia.on_packet(
            Timestamp::from_millis(2),
            Timestamp::from_millis(52),
            DataSize::from_bytes(1200),
        );
        ia.on_packet(
            Timestamp::from_millis(20),
            Timestamp::from_millis(70),
            DataSize::from_bytes(1200),
        );
        let sample = ia
            .on_packet(
                Timestamp::from_millis(40),
                Timestamp::from_millis(90),
                DataSize::from_bytes(1200),
            )
            .expect("delta between the 2-packet burst and its successor");
        // Burst send time is its last departure: 20 - 2.
        assert_eq!(sample.send_delta, TimeDelta::from_millis(18));
        assert_eq!(sample.arrival_delta, TimeDelta::from_millis(18));
        assert_eq!(sample.size_delta, -1200);
    }

    #[test]
    fn queue_growth_shows_up_as_positive_delay() {
        let mut ia = grouper();
        // Departures 20 ms apart, arrivals stretching 30 ms apart.
        let mut samples = Vec::new();
        for i in 0..5 {
            if let Some(sample) = ia.on_packet(
                Timestamp::from_millis(20 * i),
                Timestamp::from_millis(50 + 30 * i),
                DataSize::from_bytes(1200),
            ) {
                samples.push(sample);
            }
        }
        assert!(!samples.is_empty());
        for sample in samples {
            assert_eq!(
                sample.arrival_delta - sample.send_delta,
                TimeDelta::from_millis(10)
            );
        }
    }

    #[test]
    fn departure_reordering_is_ignored() {
        let mut ia = grouper();
        ia.on_packet(
            Timestamp::from_millis(100),
            Timestamp::from_millis(150),
            DataSize::from_bytes(1200),
        );
        assert!(ia
            .on_packet(
                Timestamp::from_millis(40),
                Timestamp::from_millis(160),
                DataSize::from_bytes(1200)
            )
            .is_none());
        // The grouper still advances on in-order input afterwards.
        ia.on_packet(
            Timestamp::from_millis(120),
            Timestamp::from_millis(170),
            DataSize::from_bytes(1200),
        );
        assert!(ia
            .on_packet(
                Timestamp::from_millis(140),
                Timestamp::from_millis(190),
                DataSize::from_bytes(1200)
            )
            .is_some());
    }
}
