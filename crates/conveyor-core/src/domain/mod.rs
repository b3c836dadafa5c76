//! Domain model (envelope, cycle outcome, error taxonomy).

pub mod cycle;
pub mod envelope;
pub mod errors;

pub use self::cycle::{AckResult, Cycle, Delivery};
pub use self::envelope::{Envelope, RECEIVE_COUNT_ATTRIBUTE};
pub use self::errors::{
    BoxError, ConfigurationError, ErrorKind, GatewayError, ProcessingError, WorkerError,
};
