use std::collections::VecDeque;

use super::{
    data_rate::{DataRate, DataSize},
    error::{Error, Result},
    time::{TimeDelta, Timestamp},
};

/// Measures the throughput actually realised by the path: acknowledged bytes
/// over a sliding window indexed by arrival time.
///
/// Entries older than `newest_arrival - window` are evicted on read, so the
/// window trails the most recent arrival rather than the caller's clock.
pub struct DeliveryRateEstimator {
    window: TimeDelta,
    samples: VecDeque<(Timestamp, DataSize)>,
    window_bytes: i64,
    newest_arrival: Timestamp,
}

impl DeliveryRateEstimator {
    pub fn new(window: TimeDelta) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
            window_bytes: 0,
            newest_arrival: Timestamp::minus_infinity(),
        }
    }

    /// Records an acknowledged packet. Acks without an arrival time cannot be
    /// placed in the window and are rejected.
    pub fn on_packet_acked(&mut self, arrival: Timestamp, size: DataSize) -> Result<()> {
        if arrival.is_zero() {
            return Err(Error::InvalidArrival);
        }
        self.samples.push_back((arrival, size));
        self.window_bytes += size.bytes();
        self.newest_arrival = std::cmp::max(self.newest_arrival, arrival);
        Ok(())
    }

    /// The delivery rate over the configured window, in bits per second.
    /// Zero until at least one packet has been recorded.
    pub fn get_rate(&mut self) -> DataRate {
        if self.newest_arrival.is_infinite() {
            return DataRate::zero();
        }
        let horizon = self.newest_arrival - self.window;
        while let Some(&(arrival, size)) = self.samples.front() {
            if arrival >= horizon {
                break;
            }
            self.window_bytes -= size.bytes();
            self.samples.pop_front();
        }
        if self.samples.is_empty() || self.window.is_zero() {
            return DataRate::zero();
        }
        DataSize::from_bytes(self.window_bytes) / self.window
    }
}
