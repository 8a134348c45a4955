use crate::frame::Frame;
use std::collections::VecDeque;
use std::sync::Arc;

/*------------------------------------------------------------------------------
TrackQueue
------------------------------------------------------------------------------*/

/// FIFO of already tracked frames used as context for the next window, and
/// the count of consecutive empty frames seen since the last tracked one.
#[derive(Debug, Clone)]
pub struct TrackQueue {
    frames: VecDeque<Arc<Frame>>,
    capacity: usize,
    max_gap: Option<usize>,
    curr_gap: usize,
}

impl TrackQueue {
    /// `max_gap` is taken as given; see
    /// [`crate::TrackerConfig::effective_max_gap`] for the clamp.
    pub(crate) fn new(capacity: usize, max_gap: Option<usize>) -> Self {
        debug_assert!(capacity > 0, "queue capacity must be positive");
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            max_gap,
            curr_gap: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_gap(&self) -> Option<usize> {
        self.max_gap
    }

    pub fn curr_gap(&self) -> usize {
        self.curr_gap
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().map(|f| &**f)
    }

    /// Queue contents followed by `frame`, keeping the last `capacity`
    /// frames, and the index of `frame` in it.
    pub fn build_window(&self, frame: Arc<Frame>) -> (Vec<Arc<Frame>>, usize) {
        let mut window: Vec<Arc<Frame>> = self.frames.iter().cloned().collect();
        window.push(frame);
        if window.len() > self.capacity {
            window.drain(..window.len() - self.capacity);
        }
        let query_index = (self.capacity - 1).min(window.len() - 1);
        (window, query_index)
    }

    /// Append a tracked frame, returning the evicted oldest frame when full.
    pub fn push(&mut self, frame: Arc<Frame>) -> Option<Arc<Frame>> {
        let evicted = if self.frames.len() == self.capacity {
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        evicted
    }

    /// Count one more empty frame. Returns true when this reached `max_gap`,
    /// in which case the queue and the gap counter have been cleared.
    pub fn record_gap(&mut self) -> bool {
        self.curr_gap += 1;
        match self.max_gap {
            Some(max_gap) if self.curr_gap == max_gap => {
                self.frames.clear();
                self.curr_gap = 0;
                true
            }
            _ => false,
        }
    }

    pub fn reset_gap(&mut self) {
        self.curr_gap = 0;
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(frame_id: usize) -> Arc<Frame> {
        Arc::new(Frame::new(0, frame_id, vec![]))
    }

    #[test]
    fn test_build_window_on_partial_queue() {
        let mut queue = TrackQueue::new(4, None);
        queue.push(frame(0));
        queue.push(frame(1));
        let (window, query_index) = queue.build_window(frame(2));
        let ids: Vec<usize> = window.iter().map(|f| f.frame_id()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(query_index, 2);
    }

    #[test]
    fn test_build_window_truncates_to_capacity() {
        let mut queue = TrackQueue::new(3, None);
        for i in 0..3 {
            queue.push(frame(i));
        }
        let (window, query_index) = queue.build_window(frame(3));
        let ids: Vec<usize> = window.iter().map(|f| f.frame_id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(query_index, 2);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut queue = TrackQueue::new(2, None);
        assert!(queue.push(frame(0)).is_none());
        assert!(queue.push(frame(1)).is_none());
        let evicted = queue.push(frame(2)).map(|f| f.frame_id());
        assert_eq!(evicted, Some(0));
        let ids: Vec<usize> = queue.frames().map(|f| f.frame_id()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_gap_reaching_max_clears_queue() {
        let mut queue = TrackQueue::new(2, Some(3));
        queue.push(frame(0));
        assert!(!queue.record_gap());
        assert!(!queue.record_gap());
        assert_eq!(queue.curr_gap(), 2);
        assert!(queue.record_gap());
        assert!(queue.is_empty());
        assert_eq!(queue.curr_gap(), 0);
    }

    #[test]
    fn test_gap_without_limit_never_clears() {
        let mut queue = TrackQueue::new(2, None);
        queue.push(frame(0));
        for _ in 0..100 {
            assert!(!queue.record_gap());
        }
        assert_eq!(queue.len(), 1);
        queue.reset_gap();
        assert_eq!(queue.curr_gap(), 0);
    }
}
