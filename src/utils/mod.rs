pub mod error;
pub mod logging;

pub use error::{DeliveryError, FetchError, SourceError};
pub use logging::{init_logging, LogSettings};
