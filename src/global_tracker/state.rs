use super::identity::{TrackId, TrackLabels};
use super::queue::TrackQueue;
use crate::config::TrackerConfig;
use crate::frame::Frame;
use log::warn;
use std::sync::Arc;

/// Everything the tracker mutates for one video: the context queue, the gap
/// counter, the identity overlay and the id counter.
///
/// Owned by the caller and passed by `&mut` into every tracking call; one
/// state per video.
#[derive(Debug, Clone)]
pub struct TrackerState {
    queue: TrackQueue,
    labels: TrackLabels,
}

impl TrackerState {
    /// States come from [`crate::GlobalTracker::new_state`], which only holds
    /// validated configs.
    pub(crate) fn new(config: &TrackerConfig) -> Self {
        Self {
            queue: TrackQueue::new(config.window_size, config.effective_max_gap()),
            labels: TrackLabels::default(),
        }
    }

    pub fn queue(&self) -> &TrackQueue {
        &self.queue
    }

    pub fn labels(&self) -> &TrackLabels {
        &self.labels
    }

    pub fn id_count(&self) -> TrackId {
        self.labels.id_count()
    }

    pub fn curr_gap(&self) -> usize {
        self.queue.curr_gap()
    }

    /// True when a frame with this video and frame index is held as context.
    pub fn contains_frame(&self, video_id: usize, frame_id: usize) -> bool {
        self.queue
            .frames()
            .any(|f| f.video_id() == video_id && f.frame_id() == frame_id)
    }

    /// True when there is no labelled context to associate against.
    pub fn needs_cold_start(&self) -> bool {
        self.queue.is_empty() || !self.labels.has_any_label(self.queue.frames())
    }

    pub(crate) fn labels_mut(&mut self) -> &mut TrackLabels {
        &mut self.labels
    }

    pub(crate) fn window_for(&self, frame: Arc<Frame>) -> (Vec<Arc<Frame>>, usize) {
        self.queue.build_window(frame)
    }

    pub(crate) fn push_tracked(&mut self, frame: Arc<Frame>) {
        self.queue.reset_gap();
        if let Some(evicted) = self.queue.push(frame) {
            self.labels.forget_frame(&evicted);
        }
    }

    /// Count an empty frame; drops the context once the gap limit is hit.
    pub(crate) fn record_gap(&mut self, frame_id: usize) {
        if self.queue.record_gap() {
            warn!(
                "{} consecutive frames without detections at frame {}, dropping track queue; ids restart at the next detection",
                self.queue.max_gap().unwrap_or_default(),
                frame_id
            );
            self.labels.clear();
        } else {
            warn!(
                "No detections in frame {}, skipping it in the queue; current gap size: {}",
                frame_id,
                self.queue.curr_gap()
            );
        }
    }

    /// Back to the freshly constructed state.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.queue.reset_gap();
        self.labels.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Detection;
    use crate::error::TrackError;
    use crate::global_tracker::GlobalTracker;
    use crate::rect::Rect;

    fn frame(frame_id: usize) -> Arc<Frame> {
        let det = Detection::with_features(Rect::new(0.0, 0.0, 1.0, 1.0), vec![1.0]);
        Arc::new(Frame::new(0, frame_id, vec![det]))
    }

    #[test]
    fn test_state_follows_tracker_config() {
        let config = TrackerConfig::default()
            .with_window_size(3)
            .with_max_gap(Some(1));
        let state = GlobalTracker::new(config).unwrap().new_state();
        assert_eq!(state.queue().capacity(), 3);
        assert_eq!(state.queue().max_gap(), Some(3));
        assert!(state.needs_cold_start());
    }

    #[test]
    fn test_zero_window_never_yields_a_state() {
        let res = GlobalTracker::new(TrackerConfig::default().with_window_size(0));
        assert!(matches!(res, Err(TrackError::InvalidConfig(_))));
    }

    #[test]
    fn test_contains_frame_tracks_queue_contents() {
        let mut state = TrackerState::new(&TrackerConfig::default().with_window_size(1));
        let f0 = frame(0);
        state.labels_mut().cold_start(&f0);
        state.push_tracked(f0);
        assert!(state.contains_frame(0, 0));
        assert!(!state.contains_frame(1, 0));

        state.push_tracked(frame(1));
        assert!(!state.contains_frame(0, 0));
        assert!(state.contains_frame(0, 1));
    }

    #[test]
    fn test_gap_reset_drops_labels_but_keeps_counter() {
        let config = TrackerConfig::default()
            .with_window_size(2)
            .with_max_gap(Some(2));
        let mut state = TrackerState::new(&config);
        let f0 = frame(0);
        state.labels_mut().cold_start(&f0);
        state.push_tracked(f0);

        state.record_gap(1);
        assert!(!state.needs_cold_start());
        state.record_gap(2);
        assert!(state.needs_cold_start());
        assert!(state.labels().is_empty());
        assert_eq!(state.id_count(), 1);
    }
}
