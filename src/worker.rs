use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};
use waitgroup::WaitGroup;

use super::{
    ack::Acknowledgement,
    config::EstimatorConfig,
    controller::SendSideController,
    data_rate::DataRate,
    error::{Error, Result},
    time::{TimeDelta, Timestamp},
};

const FEEDBACK_QUEUE_DEPTH: usize = 16;
const HOLD_LOG_INTERVAL: Duration = Duration::from_secs(1);

/// One unit of transport feedback: everything `on_acks` needs for a tick.
pub struct FeedbackBatch {
    pub now: Timestamp,
    pub rtt: TimeDelta,
    pub acks: Vec<Acknowledgement>,
}

/// Receives the chosen target whenever it changes. Implementations typically
/// forward to an encoder's `set_target_bitrate`.
#[async_trait]
pub trait TargetRateSink: Send + Sync {
    async fn on_target_rate(&self, target: DataRate);
}

/// Single-producer wrapper around [`SendSideController`] for multi-threaded
/// surroundings.
///
/// The controller is owned by one spawned task; feedback batches are queued
/// through a channel, so the estimator itself never takes a lock. The most
/// recent target is published on a watch channel and can be read at any time
/// without waiting for the worker.
pub struct SendSideBwe {
    feedback_tx: mpsc::Sender<FeedbackBatch>,
    target_rx: watch::Receiver<DataRate>,
    close_tx: Mutex<Option<mpsc::Sender<()>>>,
    wait_group: Mutex<Option<WaitGroup>>,
}

impl SendSideBwe {
    pub fn new(config: EstimatorConfig) -> Result<Self> {
        Self::with_sink(config, None)
    }

    pub fn with_sink(
        config: EstimatorConfig,
        sink: Option<Arc<dyn TargetRateSink>>,
    ) -> Result<Self> {
        let mut controller = SendSideController::new(config)?;
        let (feedback_tx, mut feedback_rx) = mpsc::channel::<FeedbackBatch>(FEEDBACK_QUEUE_DEPTH);
        let (close_tx, mut close_rx) = mpsc::channel::<()>(1);
        let (target_tx, target_rx) = watch::channel(controller.target_rate());
        let wait_group = WaitGroup::new();
        let worker = wait_group.worker();

        tokio::spawn(async move {
            let _worker = worker;
            let mut hold_log = tokio::time::interval(HOLD_LOG_INTERVAL);
            loop {
                tokio::select! {
                    _ = close_rx.recv() => break,
                    batch = feedback_rx.recv() => {
                        let Some(batch) = batch else { break };
                        let previous = controller.target_rate();
                        let target = controller.on_acks(batch.now, batch.rtt, &batch.acks);
                        if target != previous {
                            if let Some(sink) = &sink {
                                sink.on_target_rate(target).await;
                            }
                            let _ = target_tx.send(target);
                        }
                    }
                    _ = hold_log.tick() => {
                        log::trace!(
                            "send-side bwe holding at {} bps",
                            controller.target_rate().bps()
                        );
                    }
                }
            }
        });

        Ok(Self {
            feedback_tx,
            target_rx,
            close_tx: Mutex::new(Some(close_tx)),
            wait_group: Mutex::new(Some(wait_group)),
        })
    }

    /// Queues one feedback batch for the worker. Fails once the estimator is
    /// closed.
    pub async fn write_feedback(&self, batch: FeedbackBatch) -> Result<()> {
        self.feedback_tx
            .send(batch)
            .await
            .map_err(|_| Error::Closed)
    }

    /// The most recently published target.
    pub fn target_rate(&self) -> DataRate {
        *self.target_rx.borrow()
    }

    /// Stops the worker and waits for it to finish. Calling close twice is an
    /// error, mirroring the single-owner lifecycle of the flow.
    pub async fn close(&self) -> Result<()> {
        let mut close_tx = self.close_tx.lock().await;
        if close_tx.is_none() {
            return Err(Error::Closed);
        }
        close_tx.take();
        let wait_group = self.wait_group.lock().await.take();
        if let Some(wait_group) = wait_group {
            wait_group.wait().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_rate::DataSize;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn lossy_batch(first_seq: u64, now: Timestamp) -> FeedbackBatch {
        let start = now - TimeDelta::from_millis(900);
        let acks = (0..50)
            .map(|i| {
                let departure = start + TimeDelta::from_millis(10 * i as i64);
                if i % 2 == 0 {
                    Acknowledgement::arrived(
                        first_seq + i,
                        DataSize::from_bytes(1200),
                        departure,
                        departure + TimeDelta::from_millis(50),
                    )
                } else {
                    Acknowledgement::lost(first_seq + i, DataSize::from_bytes(1200), departure)
                }
            })
            .collect();
        FeedbackBatch {
            now,
            rtt: TimeDelta::from_millis(100),
            acks,
        }
    }

    #[tokio::test]
    async fn publishes_updated_targets() {
        let bwe = SendSideBwe::new(EstimatorConfig::default()).unwrap();
        assert_eq!(bwe.target_rate(), DataRate::from_bits_per_sec(1_000_000));

        // 50% loss must drag the published rate down.
        let mut target_rx = bwe.target_rx.clone();
        bwe.write_feedback(lossy_batch(0, Timestamp::from_seconds(1)))
            .await
            .unwrap();
        target_rx.changed().await.unwrap();
        assert!(bwe.target_rate() < DataRate::from_bits_per_sec(1_000_000));

        bwe.close().await.unwrap();
    }

    #[tokio::test]
    async fn forwards_changes_to_the_sink() {
        struct Recorder(AtomicI64);
        #[async_trait]
        impl TargetRateSink for Recorder {
            async fn on_target_rate(&self, target: DataRate) {
                self.0.store(target.bps(), Ordering::SeqCst);
            }
        }
        let recorder = Arc::new(Recorder(AtomicI64::new(0)));
        let bwe = SendSideBwe::with_sink(
            EstimatorConfig::default(),
            Some(Arc::clone(&recorder) as Arc<dyn TargetRateSink>),
        )
        .unwrap();

        let mut target_rx = bwe.target_rx.clone();
        bwe.write_feedback(lossy_batch(0, Timestamp::from_seconds(1)))
            .await
            .unwrap();
        target_rx.changed().await.unwrap();
        assert_eq!(recorder.0.load(Ordering::SeqCst), bwe.target_rate().bps());

        bwe.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_is_terminal() {
        let bwe = SendSideBwe::new(EstimatorConfig::default()).unwrap();
        bwe.close().await.unwrap();
        assert_eq!(bwe.close().await, Err(Error::Closed));
        assert!(bwe
            .write_feedback(lossy_batch(0, Timestamp::from_seconds(1)))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn rejects_invalid_configuration() {
        let config = EstimatorConfig {
            min_rate: DataRate::from_bits_per_sec(1_000_000),
            max_rate: DataRate::from_bits_per_sec(10_000),
            ..Default::default()
        };
        assert!(SendSideBwe::new(config).is_err());
    }
}
