//! Optimal query-to-track assignment and match acceptance.

use crate::error::{Result, TrackError};
use crate::lapjv::lapjv;
use nalgebra::DMatrix;

/// Assignment maximising the total score over the whole matrix.
///
/// Every row gets a column when `nrows <= ncols`, otherwise every column gets
/// a row. Returns `(row, col)` pairs sorted by row.
pub fn solve_max_assignment(scores: &DMatrix<f32>) -> Result<Vec<(usize, usize)>> {
    let nrows = scores.nrows();
    let ncols = scores.ncols();

    if nrows == 0 || ncols == 0 {
        return Ok(Vec::new());
    }
    if scores.iter().any(|v| !v.is_finite()) {
        return Err(TrackError::LapjvError(
            "score matrix contains non-finite values".to_string(),
        ));
    }

    // LAPJV needs a square cost and minimises, so:
    // 1. pad to max(nrows, ncols) with a constant cost
    // 2. negate scores
    let n = nrows.max(ncols);
    let mut cost: Vec<Vec<f64>> = vec![vec![0.0; n]; n];
    for i in 0..nrows {
        for j in 0..ncols {
            cost[i][j] = -scores[(i, j)] as f64;
        }
    }

    let mut x = vec![-1isize; n];
    let mut y = vec![-1isize; n];
    lapjv(&mut cost, &mut x, &mut y)?;

    // x[i] = j means row i is assigned to column j; drop padding
    let mut matches = Vec::new();
    for (i, &j) in x.iter().enumerate().take(nrows) {
        if j >= 0 && (j as usize) < ncols {
            matches.push((i, j as usize));
        }
    }
    Ok(matches)
}

/// Keep the solver pairs whose score beats the acceptance threshold.
///
/// With `support`, the threshold for column `j` is
/// `overlap_thresh * support[j]`: tracks backed by more window detections
/// need a higher score to absorb another one.
pub fn accept_matches(
    scores: &DMatrix<f32>,
    matches: &[(usize, usize)],
    overlap_thresh: f32,
    support: Option<&[usize]>,
) -> Vec<Option<usize>> {
    let mut accepted = vec![None; scores.nrows()];
    for &(i, j) in matches {
        let thresh = match support {
            Some(support) => overlap_thresh * support[j] as f32,
            None => overlap_thresh,
        };
        if scores[(i, j)] > thresh {
            accepted[i] = Some(j);
        }
    }
    accepted
}
