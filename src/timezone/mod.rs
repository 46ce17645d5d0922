mod error;
mod lookup;
mod resolver;

pub use error::TimezoneError;
pub use lookup::{TimezoneLookup, TzfLookup};
pub use resolver::{resolve, ResolvedTime};
