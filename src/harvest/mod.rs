//! Log harvesting: throttled pagination over every stream in a group.

pub mod queue;
pub mod stream;

pub use queue::ThrottledWorkQueue;
pub use stream::{HarvestReport, HarvestSettings, LineFilter, StreamFailure, StreamHarvester};
