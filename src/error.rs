use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Construction-time rejection: inconsistent rate bounds or an
    /// out-of-range window. The controller refuses to start.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An acknowledgement reported as arrived carried no arrival time.
    /// Recoverable; the offending ack is skipped and the batch continues.
    #[error("acknowledgement arrival time is unset")]
    InvalidArrival,

    /// The estimator worker has already been shut down.
    #[error("estimator is closed")]
    Closed,
}
