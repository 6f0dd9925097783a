//! Driver error types.

use thiserror_no_std::Error;

/// Errors surfaced by shield operations.
///
/// `E` is the error type of the underlying I2C implementation. The chip
/// itself never reports anything back during writes, so every failure here
/// originates on the host side of the wire.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error<E> {
    /// The bus transaction failed (missing device, NACK, arbitration loss).
    #[error("bus transaction failed")]
    Bus(E),
    /// A multi-register write did not fit the transaction buffer.
    #[error("register write exceeds the transaction buffer")]
    TransactionTooLong,
}
