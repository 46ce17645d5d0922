mod accumulator;
mod error;
mod source;
mod types;

pub use accumulator::{wait_for_fix, Acquisition, FixAccumulator, DEFAULT_MAX_HDOP};
pub use error::SourceError;
pub use source::{NmeaSource, SentenceSource};
pub use types::{Fix, FixQuality, PositionRecord};
