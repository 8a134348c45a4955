pub mod association_matrix;
pub mod config;
pub mod detection;
pub mod error;
pub mod frame;
pub mod global_tracker;
pub mod producer;
pub mod rect;

mod lapjv;

pub use association_matrix::{AssociationMatrix, Label, ScoreTable};
pub use config::{IouMode, TrackerConfig};
pub use detection::{Appearance, Crop, Detection, DetectionId};
pub use error::{Result, TrackError};
pub use frame::{Frame, ImageShape, TrackedFrame, TrajScoreKind, TrajectoryRecord, Window};
pub use global_tracker::{GlobalTracker, TrackId, TrackLabels, TrackerState};
pub use producer::ScoreProducer;
pub use rect::Rect;
