mod connector;
mod error;
mod report;
mod sequencer;

pub use connector::{SerialConnector, SerialLink};
pub use error::{SyncError, SyncStep};
pub use report::{Identity, NoFix, Readback, SyncOutcome, SyncReport, TimeReport};
pub use sequencer::Synchronizer;
