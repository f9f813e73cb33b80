//! Send-side bandwidth estimation for real-time media flows.
//!
//! Per-packet acknowledgement feedback (departure and arrival times, sizes,
//! loss and ECN marks) drives three coupled estimators: a delivery-rate
//! window, a loss-based rate controller and a delay-based controller built
//! from an arrival-time Kalman filter, an adaptive overuse detector and a
//! hold/increase/decrease state machine. Every feedback batch updates all
//! three; the emitted target is the minimum of the loss-based and
//! delay-based estimates.
//!
//! [`SendSideController`] is the single-threaded core; [`SendSideBwe`] wraps
//! it in a queue-fed worker task for multi-threaded surroundings.

#![warn(rust_2018_idioms)]

pub mod ack;
pub mod arrival_filter;
pub mod config;
pub mod controller;
pub mod data_rate;
pub mod delay_controller;
pub mod delivery_rate;
pub mod error;
pub mod inter_arrival;
pub mod loss_controller;
pub mod overuse_detector;
pub mod time;
pub mod worker;

#[cfg(test)]
mod random;

pub use ack::{Acknowledgement, EcnCodepoint};
pub use config::EstimatorConfig;
pub use controller::{SendSideController, TargetTransferRateObserver};
pub use data_rate::{DataRate, DataSize};
pub use error::{Error, Result};
pub use overuse_detector::BandwidthUsage;
pub use time::{TimeDelta, Timestamp};
pub use worker::{FeedbackBatch, SendSideBwe, TargetRateSink};
