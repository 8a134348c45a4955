//! Score post-processing for one window.
//!
//! Turns the producer's raw `n_query x total_instances` logits into a
//! `n_query x n_traj` track score matrix. Reweighting stages run in the fixed
//! order decay -> IoU -> center gate and are no-ops when unconfigured.

use super::identity::TrackId;
use crate::config::IouMode;
use crate::rect::Rect;
use nalgebra::DMatrix;

/// Row-wise softmax per frame partition of the columns, with one extra zero
/// logit per partition ("no match") that is absorbed and dropped.
pub fn softmax_asso(raw: &DMatrix<f32>, instances_per_frame: &[usize]) -> DMatrix<f32> {
    let mut out = DMatrix::zeros(raw.nrows(), raw.ncols());
    let mut start = 0;
    for &n in instances_per_frame {
        for i in 0..raw.nrows() {
            let mut max = 0.0f32;
            for j in start..start + n {
                max = max.max(raw[(i, j)]);
            }
            let mut sum = (-max).exp();
            for j in start..start + n {
                let e = (raw[(i, j)] - max).exp();
                out[(i, j)] = e;
                sum += e;
            }
            for j in start..start + n {
                out[(i, j)] /= sum;
            }
        }
        start += n;
    }
    out
}

/// Columns that do not belong to the query frame, with the window index of
/// the frame each one comes from.
pub fn nonquery_columns(instances_per_frame: &[usize], query_index: usize) -> (Vec<usize>, Vec<usize>) {
    let mut cols = Vec::new();
    let mut col_frames = Vec::new();
    let mut start = 0;
    for (t, &n) in instances_per_frame.iter().enumerate() {
        if t != query_index {
            cols.extend(start..start + n);
            col_frames.extend(std::iter::repeat(t).take(n));
        }
        start += n;
    }
    (cols, col_frames)
}

pub fn select_columns(matrix: &DMatrix<f32>, cols: &[usize]) -> DMatrix<f32> {
    DMatrix::from_fn(matrix.nrows(), cols.len(), |i, j| matrix[(i, cols[j])])
}

/// Sorted unique track ids and the `n_nonquery x n_traj` one-hot membership
/// matrix of each non-query detection.
pub fn track_membership(instance_ids: &[TrackId]) -> (Vec<TrackId>, DMatrix<f32>) {
    let mut unique_ids = instance_ids.to_vec();
    unique_ids.sort_unstable();
    unique_ids.dedup();

    let mut id_inds = DMatrix::zeros(instance_ids.len(), unique_ids.len());
    for (i, id) in instance_ids.iter().enumerate() {
        if let Ok(j) = unique_ids.binary_search(id) {
            id_inds[(i, j)] = 1.0;
        }
    }
    (unique_ids, id_inds)
}

/// Number of non-query detections on each track.
pub fn track_support(id_inds: &DMatrix<f32>) -> Vec<usize> {
    id_inds
        .column_iter()
        .map(|col| col.iter().filter(|&&v| v > 0.0).count())
        .collect()
}

/// Scale each column by `decay_time ^ (|query_index - t| - 1)`, `t` being the
/// window index of the column's frame. Adjacent frames keep their score.
pub fn weight_decay_time(
    asso_nonquery: &DMatrix<f32>,
    decay_time: Option<f32>,
    col_frames: &[usize],
    query_index: usize,
) -> DMatrix<f32> {
    let mut out = asso_nonquery.clone();
    let decay_time = match decay_time {
        Some(d) if d > 0.0 => d,
        _ => return out,
    };
    debug_assert_eq!(col_frames.len(), out.ncols());
    for (j, &t) in col_frames.iter().enumerate() {
        let dt = (query_index.abs_diff(t) as i32 - 1).max(0);
        let factor = decay_time.powi(dt);
        out.column_mut(j).scale_mut(factor);
    }
    out
}

/// Sum of the scores of every detection on a track:
/// `(n_query x n_nonquery) x (n_nonquery x n_traj)`.
pub fn collapse_to_tracks(asso_nonquery: &DMatrix<f32>, id_inds: &DMatrix<f32>) -> DMatrix<f32> {
    if asso_nonquery.ncols() == 0 || id_inds.ncols() == 0 {
        return DMatrix::zeros(asso_nonquery.nrows(), id_inds.ncols());
    }
    asso_nonquery * id_inds
}

/// Box of the latest non-query detection of each track.
pub fn last_boxes(id_inds: &DMatrix<f32>, nonquery_boxes: &[Rect<f32>]) -> Vec<Rect<f32>> {
    id_inds
        .column_iter()
        .filter_map(|col| {
            (0..col.len())
                .rev()
                .find(|&i| col[i] > 0.0)
                .map(|i| nonquery_boxes[i])
        })
        .collect()
}

pub fn iou_batch(query_boxes: &[Rect<f32>], track_boxes: &[Rect<f32>]) -> DMatrix<f32> {
    DMatrix::from_fn(query_boxes.len(), track_boxes.len(), |i, j| {
        query_boxes[i].calc_iou(&track_boxes[j])
    })
}

pub fn weight_iou(traj_score: DMatrix<f32>, method: IouMode, last_ious: &DMatrix<f32>) -> DMatrix<f32> {
    match method {
        IouMode::Off => traj_score,
        IouMode::Mult => traj_score.component_mul(last_ious),
        IouMode::Max => traj_score.zip_map(last_ious, f32::max),
    }
}

/// Zero every (query, track) pair where no detection of the track has its
/// center within `max_center_dist` of the query's center.
pub fn filter_max_center_dist(
    mut traj_score: DMatrix<f32>,
    max_center_dist: Option<f32>,
    query_boxes: &[Rect<f32>],
    nonquery_boxes: &[Rect<f32>],
    id_inds: &DMatrix<f32>,
) -> DMatrix<f32> {
    let max_center_dist = match max_center_dist {
        Some(d) => d,
        None => return traj_score,
    };
    for (i, query_box) in query_boxes.iter().enumerate() {
        for j in 0..id_inds.ncols() {
            let valid = nonquery_boxes.iter().enumerate().any(|(k, nonquery_box)| {
                id_inds[(k, j)] > 0.0 && query_box.center_distance(nonquery_box) <= max_center_dist
            });
            if !valid {
                traj_score[(i, j)] = 0.0;
            }
        }
    }
    traj_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearly_eq::assert_nearly_eq;

    fn rect(x: f32, y: f32) -> Rect<f32> {
        Rect::new(x, y, 10.0, 10.0)
    }

    #[test]
    fn test_softmax_asso_per_partition() {
        let raw = DMatrix::from_row_slice(1, 3, &[0.0, 0.0, 0.0]);
        let out = softmax_asso(&raw, &[2, 1]);
        // two real zeros + no-match zero
        assert_nearly_eq!(out[(0, 0)], 1.0 / 3.0, 1e-6);
        assert_nearly_eq!(out[(0, 1)], 1.0 / 3.0, 1e-6);
        // one real zero + no-match zero
        assert_nearly_eq!(out[(0, 2)], 0.5, 1e-6);
    }

    #[test]
    fn test_softmax_asso_large_logits_stay_finite() {
        let raw = DMatrix::from_row_slice(1, 2, &[500.0, -500.0]);
        let out = softmax_asso(&raw, &[2]);
        assert_nearly_eq!(out[(0, 0)], 1.0, 1e-6);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_nonquery_columns_skip_query_frame() {
        let (cols, frames) = nonquery_columns(&[2, 1, 3], 1);
        assert_eq!(cols, vec![0, 1, 3, 4, 5]);
        assert_eq!(frames, vec![0, 0, 2, 2, 2]);
    }

    #[test]
    fn test_track_membership_and_support() {
        let (unique, id_inds) = track_membership(&[4, 1, 4, 2]);
        assert_eq!(unique, vec![1, 2, 4]);
        assert_eq!(id_inds.shape(), (4, 3));
        assert_eq!(id_inds[(0, 2)], 1.0);
        assert_eq!(id_inds[(1, 0)], 1.0);
        assert_eq!(track_support(&id_inds), vec![1, 1, 2]);
    }

    #[test]
    fn test_collapse_sums_track_columns() {
        let asso = DMatrix::from_row_slice(1, 3, &[0.2, 0.3, 0.4]);
        let (_, id_inds) = track_membership(&[0, 1, 0]);
        let traj = collapse_to_tracks(&asso, &id_inds);
        assert_nearly_eq!(traj[(0, 0)], 0.6, 1e-6);
        assert_nearly_eq!(traj[(0, 1)], 0.3, 1e-6);
    }

    #[test]
    fn test_collapse_without_tracks() {
        let asso = DMatrix::zeros(2, 0);
        let (_, id_inds) = track_membership(&[]);
        assert_eq!(collapse_to_tracks(&asso, &id_inds).shape(), (2, 0));
    }

    #[test]
    fn test_weight_decay_time() {
        let asso = DMatrix::from_row_slice(1, 3, &[1.0, 1.0, 1.0]);
        let out = weight_decay_time(&asso, Some(0.5), &[0, 1, 2], 3);
        assert_nearly_eq!(out[(0, 0)], 0.25, 1e-6);
        assert_nearly_eq!(out[(0, 1)], 0.5, 1e-6);
        assert_nearly_eq!(out[(0, 2)], 1.0, 1e-6);

        assert_eq!(weight_decay_time(&asso, None, &[0, 1, 2], 3), asso);
    }

    #[test]
    fn test_last_boxes_pick_latest_member() {
        let boxes = [rect(0.0, 0.0), rect(50.0, 0.0), rect(100.0, 0.0)];
        let (_, id_inds) = track_membership(&[0, 1, 0]);
        let last = last_boxes(&id_inds, &boxes);
        assert_eq!(last, vec![rect(100.0, 0.0), rect(50.0, 0.0)]);
    }

    #[test]
    fn test_weight_iou_modes() {
        let traj = DMatrix::from_row_slice(1, 2, &[0.5, 0.1]);
        let ious = DMatrix::from_row_slice(1, 2, &[0.4, 0.8]);
        assert_eq!(weight_iou(traj.clone(), IouMode::Off, &ious), traj);
        let mult = weight_iou(traj.clone(), IouMode::Mult, &ious);
        assert_nearly_eq!(mult[(0, 0)], 0.2, 1e-6);
        let max = weight_iou(traj, IouMode::Max, &ious);
        assert_eq!(max[(0, 0)], 0.5);
        assert_eq!(max[(0, 1)], 0.8);
    }

    #[test]
    fn test_center_gate_zero_is_hard_veto() {
        let traj = DMatrix::from_row_slice(1, 2, &[0.9, 0.9]);
        let query = [rect(0.0, 0.0)];
        let nonquery = [rect(0.0, 0.0), rect(1.0, 0.0)];
        let (_, id_inds) = track_membership(&[0, 1]);
        let out = filter_max_center_dist(traj, Some(0.0), &query, &nonquery, &id_inds);
        assert_eq!(out[(0, 0)], 0.9);
        assert_eq!(out[(0, 1)], 0.0);
    }

    #[test]
    fn test_center_gate_any_member_within_range_keeps_track() {
        let traj = DMatrix::from_row_slice(1, 1, &[0.7]);
        let query = [rect(0.0, 0.0)];
        let nonquery = [rect(300.0, 0.0), rect(3.0, 4.0)];
        let (_, id_inds) = track_membership(&[0, 0]);
        let out = filter_max_center_dist(traj.clone(), Some(5.0), &query, &nonquery, &id_inds);
        assert_eq!(out[(0, 0)], 0.7);
        let out = filter_max_center_dist(traj.clone(), Some(4.9), &query, &nonquery, &id_inds);
        assert_eq!(out[(0, 0)], 0.0);
        assert_eq!(filter_max_center_dist(traj.clone(), None, &query, &nonquery, &id_inds), traj);
    }
}
