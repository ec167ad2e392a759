pub mod decoder;
pub mod mixpanel;

pub use decoder::{ConcatenatedJsonDecoder, DecodeError};
pub use mixpanel::{normalize, NormalizedRecord, RawRecord, SkipReason};
