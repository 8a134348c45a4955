use crate::detection::DetectionId;
use crate::frame::Frame;
use std::collections::HashMap;

pub type TrackId = usize;

/*------------------------------------------------------------------------------
TrackLabels
------------------------------------------------------------------------------*/

/// Predicted identities of the detections currently held as context, plus the
/// counter new identities are minted from.
///
/// A track has no object of its own: it exists while some labelled detection
/// carries its id.
#[derive(Debug, Clone, Default)]
pub struct TrackLabels {
    labels: HashMap<DetectionId, TrackId>,
    id_count: TrackId,
}

impl TrackLabels {
    pub fn get(&self, id: DetectionId) -> Option<TrackId> {
        self.labels.get(&id).copied()
    }

    pub fn assign(&mut self, id: DetectionId, track_id: TrackId) {
        self.labels.insert(id, track_id);
    }

    /// Next id that would be minted.
    pub fn id_count(&self) -> TrackId {
        self.id_count
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn has_any_label<'a, I>(&self, frames: I) -> bool
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        frames
            .into_iter()
            .flat_map(|f| f.detections().iter())
            .any(|det| self.labels.contains_key(&det.id()))
    }

    pub fn frame_labels(&self, frame: &Frame) -> Vec<Option<TrackId>> {
        frame.detections().iter().map(|det| self.get(det.id())).collect()
    }

    /// Label detections `0..n` in detection order and restart the counter at `n`.
    pub fn cold_start(&mut self, frame: &Frame) -> Vec<TrackId> {
        let ids: Vec<TrackId> = (0..frame.num_detected()).collect();
        for (det, &track_id) in frame.detections().iter().zip(ids.iter()) {
            self.assign(det.id(), track_id);
        }
        self.id_count = frame.num_detected();
        ids
    }

    pub(crate) fn commit(&mut self, frame: &Frame, track_ids: &[TrackId], id_count: TrackId) {
        debug_assert!(id_count >= self.id_count, "id counter must not decrease");
        for (det, &track_id) in frame.detections().iter().zip(track_ids.iter()) {
            self.assign(det.id(), track_id);
        }
        self.id_count = id_count;
    }

    pub fn forget_frame(&mut self, frame: &Frame) {
        for det in frame.detections() {
            self.labels.remove(&det.id());
        }
    }

    /// Drop all labels but keep counting from the current id.
    pub fn clear(&mut self) {
        self.labels.clear();
    }

    pub fn reset(&mut self) {
        self.labels.clear();
        self.id_count = 0;
    }
}
