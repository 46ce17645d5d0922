mod controller;
mod error;
mod types;

pub use controller::{Controller, NexstarController};
pub use error::ControllerError;
pub use types::{ControllerTime, Location, Model, Position, Version};
