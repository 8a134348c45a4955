use crate::association_matrix::{AssociationMatrix, ScoreTable};
use crate::detection::{Detection, DetectionId};
use crate::error::{Result, TrackError};
use crate::global_tracker::TrackId;
use crate::rect::Rect;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/*------------------------------------------------------------------------------
Frame
------------------------------------------------------------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

/// All detections observed at one time step of one video.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    video_id: usize,
    frame_id: usize,
    detections: Vec<Detection>,
    img_shape: Option<ImageShape>,
}

impl Frame {
    /// Detections get their [`DetectionId`] from their position in `detections`.
    pub fn new(video_id: usize, frame_id: usize, detections: Vec<Detection>) -> Self {
        let detections = detections
            .into_iter()
            .enumerate()
            .map(|(i, det)| det.stamped(DetectionId::new(video_id, frame_id, i)))
            .collect();
        Self {
            video_id,
            frame_id,
            detections,
            img_shape: None,
        }
    }

    pub fn with_img_shape(self, channels: usize, height: usize, width: usize) -> Self {
        Self {
            img_shape: Some(ImageShape {
                channels,
                height,
                width,
            }),
            ..self
        }
    }

    #[inline(always)]
    pub fn video_id(&self) -> usize {
        self.video_id
    }

    #[inline(always)]
    pub fn frame_id(&self) -> usize {
        self.frame_id
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn img_shape(&self) -> Option<ImageShape> {
        self.img_shape
    }

    pub fn num_detected(&self) -> usize {
        self.detections.len()
    }

    pub fn has_detections(&self) -> bool {
        !self.detections.is_empty()
    }

    /// True when every detection carries a feature vector.
    pub fn has_features(&self) -> bool {
        self.detections.iter().all(Detection::has_features)
    }

    pub fn rects(&self) -> Vec<Rect<f32>> {
        self.detections.iter().map(|det| *det.rect()).collect()
    }

    pub(crate) fn map_detections<F>(self, f: F) -> Result<Self>
    where
        F: FnMut(Detection) -> Result<Detection>,
    {
        let detections = self
            .detections
            .into_iter()
            .map(f)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { detections, ..self })
    }
}

/*------------------------------------------------------------------------------
Window
------------------------------------------------------------------------------*/

/// Ordered frames handed to the score producer in one call, together with
/// their features concatenated into a single `total_instances x d` batch.
#[derive(Debug, Clone)]
pub struct Window {
    frames: Vec<Arc<Frame>>,
    features: DMatrix<f32>,
}

impl Window {
    /// Fails if a detection has no feature vector or the vectors disagree in
    /// length.
    pub fn new(frames: Vec<Arc<Frame>>) -> Result<Self> {
        let mut dim = None;
        let mut flat = Vec::new();
        for frame in frames.iter() {
            for det in frame.detections() {
                let features = det.features().ok_or(TrackError::MissingFeatures {
                    frame_id: frame.frame_id(),
                })?;
                let expected = *dim.get_or_insert(features.len());
                if features.len() != expected {
                    return Err(TrackError::DimensionMismatch {
                        what: "feature vector length",
                        expected,
                        actual: features.len(),
                    });
                }
                flat.extend_from_slice(features);
            }
        }
        let total: usize = frames.iter().map(|f| f.num_detected()).sum();
        let features = DMatrix::from_row_slice(total, dim.unwrap_or(0), &flat);
        Ok(Self { frames, features })
    }

    pub fn frames(&self) -> &[Arc<Frame>] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `total_instances x feature_dim`, rows in window order.
    pub fn features(&self) -> &DMatrix<f32> {
        &self.features
    }

    pub fn instances_per_frame(&self) -> Vec<usize> {
        self.frames.iter().map(|f| f.num_detected()).collect()
    }

    pub fn total_instances(&self) -> usize {
        self.features.nrows()
    }

    /// Every detection of the window, in window order.
    pub fn detections(&self) -> impl Iterator<Item = &Detection> {
        self.frames.iter().flat_map(|f| f.detections().iter())
    }
}

/*------------------------------------------------------------------------------
TrackedFrame
------------------------------------------------------------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrajScoreKind {
    /// Track scores after temporal decay, before IoU reweighting.
    DecayTime,
    /// Track scores the assignment was solved on.
    Final,
}

/// A frame after identity assignment.
#[derive(Debug, Clone)]
pub struct TrackedFrame {
    frame: Arc<Frame>,
    pred_track_ids: Vec<TrackId>,
    association: Option<AssociationMatrix>,
    traj_scores: BTreeMap<TrajScoreKind, ScoreTable>,
    matches: Vec<(usize, usize)>,
}

impl TrackedFrame {
    pub(crate) fn new(frame: Arc<Frame>, pred_track_ids: Vec<TrackId>) -> Self {
        Self {
            frame,
            pred_track_ids,
            association: None,
            traj_scores: BTreeMap::new(),
            matches: Vec::new(),
        }
    }

    pub(crate) fn with_association(self, association: AssociationMatrix) -> Self {
        Self {
            association: Some(association),
            ..self
        }
    }

    pub(crate) fn with_matches(self, matches: Vec<(usize, usize)>) -> Self {
        Self { matches, ..self }
    }

    pub(crate) fn add_traj_score(&mut self, kind: TrajScoreKind, table: ScoreTable) {
        self.traj_scores.insert(kind, table);
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn video_id(&self) -> usize {
        self.frame.video_id()
    }

    pub fn frame_id(&self) -> usize {
        self.frame.frame_id()
    }

    /// One id per detection, in detection order.
    pub fn pred_track_ids(&self) -> &[TrackId] {
        &self.pred_track_ids
    }

    /// Normalised query-vs-window scores of the window this frame was the query of.
    pub fn association(&self) -> Option<&AssociationMatrix> {
        self.association.as_ref()
    }

    pub fn traj_score(&self, kind: TrajScoreKind) -> Option<&ScoreTable> {
        self.traj_scores.get(&kind)
    }

    /// Solver pairs `(query row, track column)` before threshold acceptance.
    pub fn matches(&self) -> &[(usize, usize)] {
        &self.matches
    }

    pub fn trajectory_records(&self) -> Vec<TrajectoryRecord> {
        self.frame
            .detections()
            .iter()
            .zip(self.pred_track_ids.iter())
            .map(|(det, &track_id)| {
                let (x, y) = det.rect().center();
                TrajectoryRecord {
                    video_id: self.frame.video_id(),
                    frame_id: self.frame.frame_id(),
                    x,
                    y,
                    pred_track_id: track_id,
                }
            })
            .collect()
    }
}

/// One row of tracking output: where a detection was and which track it joined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryRecord {
    pub video_id: usize,
    pub frame_id: usize,
    pub x: f32,
    pub y: f32,
    pub pred_track_id: TrackId,
}
