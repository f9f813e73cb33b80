use super::{
    data_rate::DataSize,
    time::Timestamp,
};

/// ECN codepoint reported with an acknowledgement.
///
/// Carried through the data model for forward compatibility; no estimator
/// consults it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EcnCodepoint {
    #[default]
    NotEct,
    Ect0,
    Ect1,
    Ce,
}

/// A single per-packet report from the receiver: whether the packet made it,
/// and when.
///
/// `seq_nr` is the unwrapped (64-bit, monotonic per flow) transport sequence
/// number. `arrival` is on the receiver clock and stays `Timestamp::zero()`
/// when the packet was declared lost or the report carried no arrival time.
#[derive(Debug, Clone, Copy)]
pub struct Acknowledgement {
    pub seq_nr: u64,
    pub size: DataSize,
    pub departure: Timestamp,
    pub arrived: bool,
    pub arrival: Timestamp,
    pub ecn: EcnCodepoint,
}

impl Acknowledgement {
    /// An ack for a packet that arrived at `arrival`.
    pub fn arrived(seq_nr: u64, size: DataSize, departure: Timestamp, arrival: Timestamp) -> Self {
        Self {
            seq_nr,
            size,
            departure,
            arrived: true,
            arrival,
            ecn: EcnCodepoint::default(),
        }
    }

    /// An ack declaring the packet lost.
    pub fn lost(seq_nr: u64, size: DataSize, departure: Timestamp) -> Self {
        Self {
            seq_nr,
            size,
            departure,
            arrived: false,
            arrival: Timestamp::zero(),
            ecn: EcnCodepoint::default(),
        }
    }
}
