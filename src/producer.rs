use crate::detection::Crop;
use crate::frame::Window;
use nalgebra::DMatrix;

/// The association model the tracker consumes.
///
/// Calls are blocking and never retried; any error fails the window it was
/// raised for.
pub trait ScoreProducer {
    type Error: std::fmt::Display;

    /// Length of the feature vectors produced by [`ScoreProducer::embed`].
    fn feature_dim(&self) -> usize;

    /// Encode crops into feature vectors, one per crop, in order.
    fn embed(&self, crops: &[&Crop]) -> Result<Vec<Vec<f32>>, Self::Error>;

    /// Raw logits of the query frame's detections against every detection of
    /// the window, query frame included: `n_query x window.total_instances()`.
    /// Must not be normalised.
    fn score(&self, window: &Window, query_index: usize) -> Result<DMatrix<f32>, Self::Error>;
}

impl<P: ScoreProducer + ?Sized> ScoreProducer for &P {
    type Error = P::Error;

    fn feature_dim(&self) -> usize {
        (**self).feature_dim()
    }

    fn embed(&self, crops: &[&Crop]) -> Result<Vec<Vec<f32>>, Self::Error> {
        (**self).embed(crops)
    }

    fn score(&self, window: &Window, query_index: usize) -> Result<DMatrix<f32>, Self::Error> {
        (**self).score(window, query_index)
    }
}
