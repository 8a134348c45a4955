//! Sliding-window global tracker.

use super::assign::{accept_matches, solve_max_assignment};
use super::identity::{TrackId, TrackLabels};
use super::postprocess::{
    collapse_to_tracks, filter_max_center_dist, iou_batch, last_boxes, nonquery_columns,
    select_columns, softmax_asso, track_membership, track_support, weight_decay_time, weight_iou,
};
use super::state::TrackerState;
use crate::association_matrix::{AssociationMatrix, ScoreTable};
use crate::config::TrackerConfig;
use crate::detection::Detection;
use crate::error::{Result, TrackError};
use crate::frame::{Frame, TrackedFrame, TrajScoreKind, Window};
use crate::producer::ScoreProducer;
use crate::rect::Rect;
use log::{debug, info};
use nalgebra::DMatrix;
use std::sync::Arc;

/// Outcome of one window, computed without touching the tracker state.
#[derive(Debug)]
struct Assignment {
    track_ids: Vec<TrackId>,
    id_count: TrackId,
    association: AssociationMatrix,
    decay_time_scores: ScoreTable,
    final_scores: ScoreTable,
    matches: Vec<(usize, usize)>,
}

/// Assigns track ids frame by frame using association scores from a
/// [`ScoreProducer`] over a sliding window of already tracked frames.
///
/// The tracker only holds configuration; the per-video state lives in a
/// [`TrackerState`] owned by the caller.
///
/// # Example
/// ```
/// use gtrack_rs::{GlobalTracker, TrackerConfig};
/// let tracker = GlobalTracker::new(TrackerConfig::default().with_window_size(4)).unwrap();
/// let state = tracker.new_state();
/// assert_eq!(state.id_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct GlobalTracker {
    config: TrackerConfig,
}

impl GlobalTracker {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn new_state(&self) -> TrackerState {
        TrackerState::new(&self.config)
    }

    /// Track a batch of consecutive frames of one video.
    ///
    /// Without persistent tracking the state is reset once the batch is done,
    /// whether it succeeded or not.
    pub fn track<P: ScoreProducer>(
        &self,
        state: &mut TrackerState,
        producer: &P,
        frames: Vec<Frame>,
    ) -> Result<Vec<TrackedFrame>> {
        let result = frames
            .into_iter()
            .map(|frame| self.prepare_frame(frame, producer))
            .collect::<Result<Vec<_>>>()
            .and_then(|frames| self.sliding_inference(state, producer, frames));

        if !self.config.persistent_tracking {
            info!("Clearing queue after tracking");
            state.reset();
        }
        result
    }

    /// Give every detection a feature vector: zeros when visual features are
    /// disabled, otherwise the producer's embedding of its crop.
    pub fn prepare_frame<P: ScoreProducer>(&self, frame: Frame, producer: &P) -> Result<Frame> {
        if !frame.has_detections() {
            return Ok(frame);
        }
        let frame_id = frame.frame_id();

        if !self.config.use_visual_features {
            let dim = producer.feature_dim();
            return frame.map_detections(|det| Ok(det.embedded(vec![0.0; dim])));
        }
        if frame.has_features() {
            return Ok(frame);
        }

        let crops: Vec<_> = frame.detections().iter().filter_map(Detection::crop).collect();
        let mut embeddings = producer
            .embed(&crops)
            .map_err(|e| TrackError::producer(frame_id, e))?
            .into_iter();
        if embeddings.len() != crops.len() {
            return Err(TrackError::DimensionMismatch {
                what: "embeddings returned for crops",
                expected: crops.len(),
                actual: embeddings.len(),
            });
        }
        frame.map_detections(|det| {
            if det.has_features() {
                return Ok(det);
            }
            let features = embeddings
                .next()
                .ok_or(TrackError::MissingFeatures { frame_id })?;
            Ok(det.embedded(features))
        })
    }

    /// Assign ids to `frames` in order, reusing and updating `state`.
    ///
    /// Frames must already hold feature vectors (see
    /// [`GlobalTracker::prepare_frame`]).
    pub fn sliding_inference<P: ScoreProducer>(
        &self,
        state: &mut TrackerState,
        producer: &P,
        frames: Vec<Frame>,
    ) -> Result<Vec<TrackedFrame>> {
        let mut tracked = Vec::with_capacity(frames.len());
        for frame in frames {
            debug!("Current number of tracks is {}", state.id_count());
            tracked.push(self.track_frame(state, producer, frame)?);
        }
        Ok(tracked)
    }

    fn track_frame<P: ScoreProducer>(
        &self,
        state: &mut TrackerState,
        producer: &P,
        frame: Frame,
    ) -> Result<TrackedFrame> {
        if self.config.persistent_tracking && frame.frame_id() == 0 {
            info!("New video {} detected, clearing track queue", frame.video_id());
            state.reset();
        }
        if state.contains_frame(frame.video_id(), frame.frame_id()) {
            return Err(TrackError::DuplicateFrame {
                video_id: frame.video_id(),
                frame_id: frame.frame_id(),
            });
        }
        let frame = Arc::new(frame);

        if state.needs_cold_start() {
            let ids = state.labels_mut().cold_start(&frame);
            debug!("Initializing tracks on frame {}: {:?}", frame.frame_id(), ids);
            if frame.has_detections() {
                state.push_tracked(Arc::clone(&frame));
            } else {
                state.record_gap(frame.frame_id());
            }
            return Ok(TrackedFrame::new(frame, ids));
        }

        if !frame.has_detections() {
            state.record_gap(frame.frame_id());
            return Ok(TrackedFrame::new(frame, Vec::new()));
        }

        let (window_frames, query_index) = state.window_for(Arc::clone(&frame));
        let window = Window::new(window_frames)?;
        let assignment = self.run_global_tracker(state.labels(), producer, &window, query_index)?;

        state
            .labels_mut()
            .commit(&frame, &assignment.track_ids, assignment.id_count);
        state.push_tracked(Arc::clone(&frame));

        let mut tracked = TrackedFrame::new(frame, assignment.track_ids)
            .with_association(assignment.association)
            .with_matches(assignment.matches);
        tracked.add_traj_score(TrajScoreKind::DecayTime, assignment.decay_time_scores);
        tracked.add_traj_score(TrajScoreKind::Final, assignment.final_scores);
        Ok(tracked)
    }

    fn run_global_tracker<P: ScoreProducer>(
        &self,
        labels: &TrackLabels,
        producer: &P,
        window: &Window,
        query_index: usize,
    ) -> Result<Assignment> {
        // n_query: detections in the query frame
        // n_nonquery: detections in the rest of the window
        // n_traj: tracks present among the non-query detections
        let query_frame = &window.frames()[query_index];
        let frame_id = query_frame.frame_id();
        let instances_per_frame = window.instances_per_frame();
        let total_instances = window.total_instances();
        let n_query = query_frame.num_detected();

        let raw = producer
            .score(window, query_index)
            .map_err(|e| TrackError::producer(frame_id, e))?;
        if raw.shape() != (n_query, total_instances) {
            return Err(TrackError::MalformedScores {
                frame_id,
                expected: (n_query, total_instances),
                actual: raw.shape(),
            });
        }
        if raw.iter().any(|v| !v.is_finite()) {
            return Err(TrackError::InvalidScores { frame_id });
        }

        // (n_query, total_instances)
        let asso_output = softmax_asso(&raw, &instances_per_frame);
        let detections: Vec<&Detection> = window.detections().collect();
        let association = AssociationMatrix::new(
            asso_output.clone(),
            query_frame.detections().to_vec(),
            detections.iter().map(|&det| det.clone()).collect(),
        )?;

        let (nonquery_inds, nonquery_frames) = nonquery_columns(&instances_per_frame, query_index);
        let instance_ids = nonquery_inds
            .iter()
            .map(|&c| {
                let id = detections[c].id();
                labels.get(id).ok_or(TrackError::UnlabeledDetection(id))
            })
            .collect::<Result<Vec<_>>>()?;
        // (n_query, n_nonquery)
        let asso_nonquery = select_columns(&asso_output, &nonquery_inds);

        let boxes = window_boxes(window);
        let query_start: usize = instances_per_frame[..query_index].iter().sum();
        let query_boxes = &boxes[query_start..query_start + n_query];
        let nonquery_boxes: Vec<Rect<f32>> = nonquery_inds.iter().map(|&c| boxes[c]).collect();

        // (n_nonquery, n_traj)
        let (unique_ids, id_inds) = track_membership(&instance_ids);

        let decayed = weight_decay_time(
            &asso_nonquery,
            self.config.decay_time,
            &nonquery_frames,
            query_index,
        );
        // (n_query, n_traj)
        let traj_score = collapse_to_tracks(&decayed, &id_inds);
        let decay_time_scores = traj_table(&traj_score, &unique_ids)?;

        let last_ious = iou_batch(query_boxes, &last_boxes(&id_inds, &nonquery_boxes));
        let traj_score = weight_iou(traj_score, self.config.iou, &last_ious);

        let traj_score = filter_max_center_dist(
            traj_score,
            self.config.max_center_dist,
            query_boxes,
            &nonquery_boxes,
            &id_inds,
        );

        let matches = solve_max_assignment(&traj_score)?;
        let support = track_support(&id_inds);
        let accepted = accept_matches(
            &traj_score,
            &matches,
            self.config.overlap_thresh,
            self.config.mult_thresh.then_some(support.as_slice()),
        );

        let mut id_count = labels.id_count();
        let track_ids: Vec<TrackId> = accepted
            .into_iter()
            .map(|col| match col {
                Some(j) => unique_ids[j],
                None => {
                    let id = id_count;
                    id_count += 1;
                    id
                }
            })
            .collect();
        debug!(
            "Frame {}: {} queries against {} tracks, {} solver matches, ids {:?}",
            frame_id,
            n_query,
            unique_ids.len(),
            matches.len(),
            track_ids
        );

        // query columns take the ids just assigned, context columns their committed ones
        let query_end = query_start + n_query;
        let ref_track_ids = detections
            .iter()
            .enumerate()
            .map(|(c, det)| {
                if (query_start..query_end).contains(&c) {
                    Some(track_ids[c - query_start])
                } else {
                    labels.get(det.id())
                }
            })
            .collect();
        let association = association
            .with_track_ids(track_ids.iter().map(|&id| Some(id)).collect(), ref_track_ids)?;

        let final_scores = traj_table(&traj_score, &unique_ids)?;
        Ok(Assignment {
            track_ids,
            id_count,
            association,
            decay_time_scores,
            final_scores,
            matches,
        })
    }
}

/// Boxes of every window detection, scaled by the first frame's image size
/// when it is known.
fn window_boxes(window: &Window) -> Vec<Rect<f32>> {
    let shape = window.frames().first().and_then(|f| f.img_shape());
    window
        .detections()
        .map(|det| match shape {
            Some(shape) if shape.width > 0 && shape.height > 0 => det
                .rect()
                .normalized(shape.width as f32, shape.height as f32),
            _ => *det.rect(),
        })
        .collect()
}

fn traj_table(traj_score: &DMatrix<f32>, unique_ids: &[TrackId]) -> Result<ScoreTable> {
    Ok(ScoreTable::new(
        traj_score.clone(),
        (0..traj_score.nrows() as i64).collect(),
        unique_ids.iter().map(|&id| id as i64).collect(),
    )?
    .with_axis_names("Current Frame Instances", "Unique IDs"))
}
