use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use gtrack_rs::{
    Crop, Detection, Frame, GlobalTracker, IouMode, Rect, ScoreProducer, TrackerConfig, Window,
};
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng, rngs::StdRng};

const NUM_FRAMES: usize = 200;
const NUM_OBJECTS: usize = 20;

/* ----------------------------------------------------------------------------
 * Synthetic association model
 * ---------------------------------------------------------------------------- */

/// Logits from the dot product of the precomputed feature vectors.
struct DotProductProducer {
    dim: usize,
}

impl ScoreProducer for DotProductProducer {
    type Error = String;

    fn feature_dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, crops: &[&Crop]) -> Result<Vec<Vec<f32>>, String> {
        Ok(crops.iter().map(|c| c.data.clone()).collect())
    }

    fn score(&self, window: &Window, query_index: usize) -> Result<DMatrix<f32>, String> {
        let features = window.features();
        let start: usize = window.instances_per_frame()[..query_index].iter().sum();
        let n_query = window.frames()[query_index].num_detected();
        let query = features.rows(start, n_query);
        Ok(10.0 * (query * features.transpose()))
    }
}

/* ----------------------------------------------------------------------------
 * Synthetic video
 * ---------------------------------------------------------------------------- */

fn synthetic_video(dim: usize) -> Vec<Frame> {
    let mut rng = StdRng::seed_from_u64(42);
    let identities: Vec<Vec<f32>> = (0..NUM_OBJECTS)
        .map(|_| {
            let v: Vec<f32> = (0..dim).map(|_| rng.r#gen::<f32>() - 0.5).collect();
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            v.into_iter().map(|x| x / norm).collect()
        })
        .collect();

    let mut frames = Vec::with_capacity(NUM_FRAMES);
    for frame_id in 0..NUM_FRAMES {
        let mut detections = Vec::new();
        for (k, features) in identities.iter().enumerate() {
            if !rng.gen_bool(0.9) {
                continue;
            }
            let x = k as f32 * 60.0 + frame_id as f32 * 0.5 + rng.gen_range(-2.0f32..2.0);
            let rect = Rect::new(x, 100.0, 40.0, 80.0);
            let crop = Crop::new(1, 1, dim, features.clone());
            detections.push(Detection::with_crop(rect, crop));
        }
        frames.push(Frame::new(0, frame_id, detections).with_img_shape(3, 720, 1280));
    }
    frames
}

fn bench_global_tracker(c: &mut Criterion) {
    let producer = DotProductProducer { dim: 32 };
    let frames = synthetic_video(producer.dim);

    for (name, config) in [
        ("global_tracker", TrackerConfig::default()),
        (
            "global_tracker_reweighted",
            TrackerConfig::default()
                .with_decay_time(Some(0.9))
                .with_iou(IouMode::Mult)
                .with_max_center_dist(Some(0.2)),
        ),
    ] {
        let tracker = GlobalTracker::new(config).unwrap();
        c.bench_function(name, |b| {
            b.iter(|| {
                let mut state = tracker.new_state();
                let _ = tracker.track(&mut state, &producer, frames.clone());
            });
        });
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(20)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(3));
    targets = bench_global_tracker
}
criterion_main!(benches);
