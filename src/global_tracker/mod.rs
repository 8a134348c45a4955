pub mod assign;
pub mod identity;
pub mod postprocess;
pub mod queue;
pub mod state;
mod tracker;

pub use identity::{TrackId, TrackLabels};
pub use queue::TrackQueue;
pub use state::TrackerState;
pub use tracker::GlobalTracker;
