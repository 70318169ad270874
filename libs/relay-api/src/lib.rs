pub mod error;
pub mod hash;
mod outcome;
mod record;
mod transport;
mod util;

pub use error::{EncodingError, Rejection, SchemaLoadError, TransportError};
pub use outcome::{Delivery, DeliveryHandler, PublishOutcome, latency_ms};
pub use record::{Axis, Channel, Readings, SensorRecord};
pub use transport::{SendFuture, Transport};
pub use util::now_ms;
