use crate::detection::DetectionId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackError>;

#[derive(Debug, Clone, Error)]
pub enum TrackError {
    #[error("Error: {0}")]
    LapjvError(String),
    #[error("{what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error(
        "score producer returned a {actual:?} matrix for frame {frame_id}, expected {expected:?}"
    )]
    MalformedScores {
        frame_id: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("score producer returned non-finite scores for frame {frame_id}")]
    InvalidScores { frame_id: usize },
    #[error("score producer failed on frame {frame_id}: {message}")]
    ScoreProducer { frame_id: usize, message: String },
    #[error("frame {frame_id} has detections without feature vectors")]
    MissingFeatures { frame_id: usize },
    #[error("detection {0:?} has no predicted track id")]
    UnlabeledDetection(DetectionId),
    #[error("invalid tracker config: {0}")]
    InvalidConfig(String),
    #[error("could not parse tracker config: {0}")]
    ConfigParse(String),
    #[error("lookup failed: {0}")]
    LookupError(String),
    #[error("frame {frame_id} of video {video_id} is already in the track queue")]
    DuplicateFrame { video_id: usize, frame_id: usize },
    #[error("could not serialize: {0}")]
    Serialization(String),
}

impl TrackError {
    pub(crate) fn producer<E: std::fmt::Display>(frame_id: usize, err: E) -> Self {
        Self::ScoreProducer {
            frame_id,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TrackError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
