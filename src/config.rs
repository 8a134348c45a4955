//! Tracker configuration.
//!
//! Options can be set with the `with_*` builder methods or read from JSON;
//! missing keys fall back to the defaults of [`TrackerConfig::default`].

use crate::error::{Result, TrackError};
use serde::{Deserialize, Deserializer, Serialize};

/// How box overlap with a track's last known box is folded into its score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IouMode {
    #[default]
    Off,
    /// `score * iou`
    Mult,
    /// `max(score, iou)`
    Max,
}

impl<'de> Deserialize<'de> for IouMode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        match value.as_deref().map(str::to_lowercase).as_deref() {
            None | Some("") | Some("off") | Some("none") => Ok(IouMode::Off),
            Some("mult") => Ok(IouMode::Mult),
            Some("max") => Ok(IouMode::Max),
            Some(other) => Err(serde::de::Error::unknown_variant(
                other,
                &["off", "mult", "max"],
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Number of frames, query included, a window may hold.
    pub window_size: usize,
    /// When false every detection gets a zero feature vector.
    pub use_visual_features: bool,
    /// Minimum score for a query detection to join an existing track.
    pub overlap_thresh: f32,
    /// Scale `overlap_thresh` by the number of window detections already on the track.
    pub mult_thresh: bool,
    pub decay_time: Option<f32>,
    pub iou: IouMode,
    pub max_center_dist: Option<f32>,
    /// Keep the queue and id counter between calls to `track`.
    pub persistent_tracking: bool,
    /// Consecutive empty frames after which the queue is dropped. `-1` or
    /// `null` disables the reset.
    #[serde(deserialize_with = "deserialize_max_gap")]
    pub max_gap: Option<usize>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window_size: 8,
            use_visual_features: true,
            overlap_thresh: 0.01,
            mult_thresh: true,
            decay_time: None,
            iou: IouMode::Off,
            max_center_dist: None,
            persistent_tracking: false,
            max_gap: None,
        }
    }
}

fn deserialize_max_gap<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<i64>::deserialize(deserializer)?;
    Ok(value.and_then(|v| usize::try_from(v).ok()))
}

impl TrackerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TrackError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(TrackError::InvalidConfig(
                "window_size must be at least 1".to_string(),
            ));
        }
        if !self.overlap_thresh.is_finite() {
            return Err(TrackError::InvalidConfig(format!(
                "overlap_thresh must be finite, got {}",
                self.overlap_thresh
            )));
        }
        if let Some(decay_time) = self.decay_time {
            if !decay_time.is_finite() || decay_time <= 0.0 {
                return Err(TrackError::InvalidConfig(format!(
                    "decay_time must be positive and finite, got {}",
                    decay_time
                )));
            }
        }
        if let Some(dist) = self.max_center_dist {
            if !dist.is_finite() || dist < 0.0 {
                return Err(TrackError::InvalidConfig(format!(
                    "max_center_dist must be non-negative and finite, got {}",
                    dist
                )));
            }
        }
        Ok(())
    }

    /// `max_gap` as enforced: values in `0..=window_size` are raised to
    /// `window_size`.
    // TODO: confirm whether small explicit max_gap values were meant to be honoured.
    pub fn effective_max_gap(&self) -> Option<usize> {
        self.max_gap.map(|gap| gap.max(self.window_size))
    }

    pub fn with_window_size(self, window_size: usize) -> Self {
        Self {
            window_size,
            ..self
        }
    }

    pub fn with_visual_features(self, use_visual_features: bool) -> Self {
        Self {
            use_visual_features,
            ..self
        }
    }

    pub fn with_overlap_thresh(self, overlap_thresh: f32, mult_thresh: bool) -> Self {
        Self {
            overlap_thresh,
            mult_thresh,
            ..self
        }
    }

    pub fn with_decay_time(self, decay_time: Option<f32>) -> Self {
        Self { decay_time, ..self }
    }

    pub fn with_iou(self, iou: IouMode) -> Self {
        Self { iou, ..self }
    }

    pub fn with_max_center_dist(self, max_center_dist: Option<f32>) -> Self {
        Self {
            max_center_dist,
            ..self
        }
    }

    pub fn with_persistent_tracking(self, persistent_tracking: bool) -> Self {
        Self {
            persistent_tracking,
            ..self
        }
    }

    pub fn with_max_gap(self, max_gap: Option<usize>) -> Self {
        Self { max_gap, ..self }
    }
}
