use crate::rect::Rect;
use serde::{Deserialize, Serialize};

/*------------------------------------------------------------------------------
DetectionId
------------------------------------------------------------------------------*/

/// Stable identity of one detection: its frame plus its position in that
/// frame. Assigned when the detection is placed in a [`crate::Frame`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DetectionId {
    pub video_id: usize,
    pub frame_id: usize,
    pub index: usize,
}

impl DetectionId {
    pub fn new(video_id: usize, frame_id: usize, index: usize) -> Self {
        Self {
            video_id,
            frame_id,
            index,
        }
    }
}

/*------------------------------------------------------------------------------
Crop / Appearance
------------------------------------------------------------------------------*/

/// Image patch cut around a detection, channel-major (`c x h x w`).
#[derive(Debug, Clone, PartialEq)]
pub struct Crop {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    pub data: Vec<f32>,
}

impl Crop {
    pub fn new(channels: usize, height: usize, width: usize, data: Vec<f32>) -> Self {
        Self {
            channels,
            height,
            width,
            data,
        }
    }
}

/// What the scorer gets to see of a detection. Frames entering a tracking
/// window always hold `Embedded`.
#[derive(Debug, Clone, PartialEq)]
pub enum Appearance {
    Raw(Crop),
    Embedded(Vec<f32>),
}

/*------------------------------------------------------------------------------
Detection
------------------------------------------------------------------------------*/

/// One object observed in one frame.
///
/// Immutable once it sits in a frame. Predicted identities live in
/// [`crate::global_tracker::TrackLabels`], keyed by [`DetectionId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    id: DetectionId,
    rect: Rect<f32>,
    appearance: Appearance,
    gt_track_id: Option<i64>,
    score: f32,
}

impl Detection {
    pub fn new(rect: Rect<f32>, appearance: Appearance) -> Self {
        Self {
            id: DetectionId::new(0, 0, 0),
            rect,
            appearance,
            gt_track_id: None,
            score: 1.0,
        }
    }

    pub fn with_features(rect: Rect<f32>, features: Vec<f32>) -> Self {
        Self::new(rect, Appearance::Embedded(features))
    }

    pub fn with_crop(rect: Rect<f32>, crop: Crop) -> Self {
        Self::new(rect, Appearance::Raw(crop))
    }

    pub fn with_gt_track_id(self, gt_track_id: i64) -> Self {
        Self {
            gt_track_id: Some(gt_track_id),
            ..self
        }
    }

    pub fn with_score(self, score: f32) -> Self {
        Self { score, ..self }
    }

    pub(crate) fn stamped(self, id: DetectionId) -> Self {
        Self { id, ..self }
    }

    pub(crate) fn embedded(self, features: Vec<f32>) -> Self {
        Self {
            appearance: Appearance::Embedded(features),
            ..self
        }
    }

    #[inline(always)]
    pub fn id(&self) -> DetectionId {
        self.id
    }

    #[inline(always)]
    pub fn rect(&self) -> &Rect<f32> {
        &self.rect
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    pub fn features(&self) -> Option<&[f32]> {
        match &self.appearance {
            Appearance::Embedded(features) => Some(features),
            Appearance::Raw(_) => None,
        }
    }

    pub fn crop(&self) -> Option<&Crop> {
        match &self.appearance {
            Appearance::Raw(crop) => Some(crop),
            Appearance::Embedded(_) => None,
        }
    }

    pub fn has_features(&self) -> bool {
        self.features().is_some()
    }

    pub fn gt_track_id(&self) -> Option<i64> {
        self.gt_track_id
    }

    pub fn score(&self) -> f32 {
        self.score
    }
}
