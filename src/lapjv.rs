use crate::error::TrackError::{self, LapjvError};

const LARGE: f64 = 1_000_000.0;

/* -----------------------------------------------------------------------------
 * lapjv.rs - Jonker-Volgenant linear assignment algorithm (dense, minimising)
 * ----------------------------------------------------------------------------- */

/// Column reduction and reduction transfer. Returns the number of free rows.
fn ccrrt_dense(
    n: usize,
    cost: &[Vec<f64>],
    free_rows: &mut [usize],
    x: &mut [isize],
    y: &mut [isize],
    v: &mut [f64],
) -> usize {
    debug_assert!(cost.len() == n, "cost.len() must be equal to {}", n);

    for i in 0..n {
        x[i] = -1;
        v[i] = LARGE;
        y[i] = 0;
    }
    for i in 0..n {
        for j in 0..n {
            let c = cost[i][j];
            if c < v[j] {
                v[j] = c;
                y[j] = i as isize;
            }
        }
    }

    let mut unique = vec![true; n];
    for j in (0..n).rev() {
        let i = y[j] as usize;
        if x[i] < 0 {
            x[i] = j as isize;
        } else {
            unique[i] = false;
            y[j] = -1;
        }
    }

    let mut n_free_rows = 0;
    for i in 0..n {
        if x[i] < 0 {
            free_rows[n_free_rows] = i;
            n_free_rows += 1;
        } else if unique[i] {
            let j = x[i] as usize;
            let mut min = LARGE;
            for j2 in 0..n {
                if j2 == j {
                    continue;
                }
                let c = cost[i][j2] - v[j2];
                if c < min {
                    min = c;
                }
            }
            v[j] -= min;
        }
    }
    n_free_rows
}

/// Augmenting row reduction. Returns the number of rows still free.
fn carr_dense(
    n: usize,
    cost: &[Vec<f64>],
    n_free_rows: usize,
    free_rows: &mut [usize],
    x: &mut [isize],
    y: &mut [isize],
    v: &mut [f64],
) -> usize {
    let mut current = 0;
    let mut new_free_rows = 0;
    let mut rr_cnt = 0;

    while current < n_free_rows {
        rr_cnt += 1;
        let free_i = free_rows[current];
        current += 1;

        let mut j1: isize = 0;
        let mut j2: isize = -1;
        let mut v1 = cost[free_i][0] - v[0];
        let mut v2 = LARGE;

        for j in 1..n {
            let c = cost[free_i][j] - v[j];
            if c < v2 {
                if c >= v1 {
                    v2 = c;
                    j2 = j as isize;
                } else {
                    v2 = v1;
                    v1 = c;
                    j2 = j1;
                    j1 = j as isize;
                }
            }
        }

        let mut i0 = y[j1 as usize];
        let v1_new = v[j1 as usize] - (v2 - v1);
        let v1_lowers = v1_new < v[j1 as usize];

        if rr_cnt < current * n {
            if v1_lowers {
                v[j1 as usize] = v1_new;
            } else if i0 >= 0 && j2 >= 0 {
                j1 = j2;
                i0 = y[j2 as usize];
            }

            if i0 >= 0 {
                if v1_lowers {
                    current -= 1;
                    free_rows[current] = i0 as usize;
                } else {
                    free_rows[new_free_rows] = i0 as usize;
                    new_free_rows += 1;
                }
            }
        } else if i0 >= 0 {
            free_rows[new_free_rows] = i0 as usize;
            new_free_rows += 1;
        }
        x[free_i] = j1;
        y[j1 as usize] = free_i as isize;
    }
    new_free_rows
}

/// Move the columns with minimal `d` to the front of `cols[lo..]`.
fn find_dense(n: usize, lo: usize, d: &[f64], cols: &mut [usize]) -> usize {
    let mut hi = lo + 1;
    let mut mind = d[cols[lo]];
    for k in hi..n {
        let j = cols[k];
        if d[j] <= mind {
            if d[j] < mind {
                hi = lo;
                mind = d[j];
            }
            cols[k] = cols[hi];
            cols[hi] = j;
            hi += 1;
        }
    }
    hi
}

#[allow(clippy::too_many_arguments)]
fn scan_dense(
    n: usize,
    cost: &[Vec<f64>],
    plo: &mut usize,
    phi: &mut usize,
    d: &mut [f64],
    cols: &mut [usize],
    pred: &mut [usize],
    y: &[isize],
    v: &[f64],
) -> isize {
    let mut lo = *plo;
    let mut hi = *phi;

    while lo != hi {
        let mut j = cols[lo];
        lo += 1;

        debug_assert!(y[j] >= 0, "scanned column must be assigned");
        let i = y[j] as usize;
        let mind = d[j];
        let h = cost[i][j] - v[j] - mind;
        for k in hi..n {
            j = cols[k];
            let cred_ij = cost[i][j] - v[j] - h;
            if cred_ij < d[j] {
                d[j] = cred_ij;
                pred[j] = i;
                if cred_ij == mind {
                    if y[j] < 0 {
                        return j as isize;
                    }
                    cols[k] = cols[hi];
                    cols[hi] = j;
                    hi += 1;
                }
            }
        }
    }
    *plo = lo;
    *phi = hi;
    -1
}

/// Shortest augmenting path from `start_i`; returns the free column reached.
fn find_path_dense(
    n: usize,
    cost: &[Vec<f64>],
    start_i: usize,
    y: &[isize],
    v: &mut [f64],
    pred: &mut [usize],
) -> isize {
    let mut lo = 0;
    let mut hi = 0;
    let mut final_j = -1;
    let mut n_ready = 0;
    let mut cols: Vec<usize> = (0..n).collect();
    let mut d = vec![0.0; n];

    for i in 0..n {
        pred[i] = start_i;
        d[i] = cost[start_i][i] - v[i];
    }

    while final_j == -1 {
        if lo == hi {
            n_ready = lo;
            hi = find_dense(n, lo, &d, &mut cols);
            for &j in &cols[lo..hi] {
                if y[j] < 0 {
                    final_j = j as isize;
                }
            }
        }
        if final_j == -1 {
            final_j = scan_dense(n, cost, &mut lo, &mut hi, &mut d, &mut cols, pred, y, v);
        }
    }

    let mind = d[cols[lo]];
    for &j in &cols[..n_ready] {
        v[j] += d[j] - mind;
    }
    final_j
}

/// Augment every remaining free row.
fn ca_dense(
    n: usize,
    cost: &[Vec<f64>],
    n_free_rows: usize,
    free_rows: &[usize],
    x: &mut [isize],
    y: &mut [isize],
    v: &mut [f64],
) -> usize {
    let mut pred = vec![0; n];

    for &free_row in &free_rows[..n_free_rows] {
        let mut i = -1isize;
        let mut k = 0;

        let mut j = find_path_dense(n, cost, free_row, y, v, &mut pred);
        debug_assert!(j >= 0 && j < n as isize, "augmenting path ended outside the matrix");
        while i != free_row as isize {
            i = pred[j as usize] as isize;
            y[j as usize] = i;
            std::mem::swap(&mut j, &mut x[i as usize]);

            k += 1;
            debug_assert!(k <= n, "augmenting path longer than n");
        }
    }
    0
}

/// Solve the square assignment problem on `cost`.
///
/// On success `x[i]` is the column of row `i` and `y[j]` the row of column `j`.
pub(crate) fn lapjv(
    cost: &mut Vec<Vec<f64>>,
    x: &mut Vec<isize>,
    y: &mut Vec<isize>,
) -> Result<(), TrackError> {
    let n = cost.len();
    if n == 0 {
        return Err(LapjvError(format!(
            "cost.len() must be greater than 0, but cost.len() = {}",
            n
        )));
    }
    if n != x.len() || n != y.len() || cost.iter().any(|row| row.len() != n) {
        return Err(LapjvError(format!(
            "cost must be square and match x.len() and y.len(), but cost.len() = {}, x.len() = {}, y.len() = {}",
            n,
            x.len(),
            y.len()
        )));
    }

    let mut free_rows = vec![0; n];
    let mut v = vec![0.0; n];
    let mut ret = ccrrt_dense(n, cost, &mut free_rows, x, y, &mut v);
    let mut i = 0;
    while ret > 0 && i < 2 {
        ret = carr_dense(n, cost, ret, &mut free_rows, x, y, &mut v);
        i += 1;
    }
    if ret > 0 {
        ret = ca_dense(n, cost, ret, &free_rows, x, y, &mut v);
    }
    if ret > 0 {
        return Err(LapjvError(format!(
            "ret must be less than or equal to 0, but ret = {}",
            ret
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{self, Rng};

    #[test]
    fn test_lapjv_3x3() {
        let mut cost = vec![
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ];
        let mut x = vec![-1; 3];
        let mut y = vec![-1; 3];
        let res = lapjv(&mut cost, &mut x, &mut y);
        assert!(res.is_ok(), "expected Ok, got {:?}", res);
        assert_eq!(x, vec![2, 0, 1]);
        assert_eq!(y, vec![1, 2, 0]);
    }

    #[test]
    fn test_lapjv_5x5() {
        let mut cost = vec![
            vec![1., 2., 3., 4., 1.],
            vec![5., 6., 7., 8., 2.],
            vec![9., 10., 11., 12., 3.],
            vec![13., 14., 15., 16., 4.],
            vec![17., 18., 19., 20., 5.],
        ];
        let mut x = vec![-1; 5];
        let mut y = vec![-1; 5];
        let res = lapjv(&mut cost, &mut x, &mut y);
        assert!(res.is_ok(), "expected Ok, got {:?}", res);
        assert_eq!(x, vec![0, 2, 1, 3, 4]);
        assert_eq!(y, vec![0, 2, 1, 3, 4]);
    }

    #[test]
    fn test_lapjv_negated_scores_with_padding() {
        // 2 query rows x 3 track columns, padded with a zero row
        let mut cost = vec![
            vec![-0.9, -0.1, -0.2],
            vec![-0.8, -0.7, -0.1],
            vec![0.0, 0.0, 0.0],
        ];
        let mut x = vec![-1; 3];
        let mut y = vec![-1; 3];
        lapjv(&mut cost, &mut x, &mut y).unwrap();
        assert_eq!(&x[..2], &[0, 1]);
    }

    #[test]
    fn test_lapjv_rejects_bad_shapes() {
        let mut x = vec![];
        let mut y = vec![];
        assert!(lapjv(&mut vec![], &mut x, &mut y).is_err());

        let mut cost = vec![vec![1.0, 2.0], vec![3.0]];
        let mut x = vec![-1; 2];
        let mut y = vec![-1; 2];
        assert!(lapjv(&mut cost, &mut x, &mut y).is_err());
    }

    #[test]
    fn test_quickcheck_lapjv() {
        fn prop(_: usize) -> bool {
            let mut rng = rand::thread_rng();
            let n = rng.gen_range(1..=60);
            let mut cost: Vec<Vec<f64>> = (0..n)
                .map(|_| (0..n).map(|_| rng.r#gen::<f64>()).collect())
                .collect();
            let mut x = vec![-1; n];
            let mut y = vec![-1; n];
            if lapjv(&mut cost, &mut x, &mut y).is_err() {
                return false;
            }
            // x and y must describe the same permutation
            (0..n).all(|i| x[i] >= 0 && y[x[i] as usize] == i as isize)
        }
        quickcheck::quickcheck(prop as fn(usize) -> bool);
    }
}
