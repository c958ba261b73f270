//! Engine object: search control, time management and options.

mod controller;
mod time;

pub use controller::{EngineController, GoRequest, SearchType};
pub use time::{TimeConfig, TimeControl};
