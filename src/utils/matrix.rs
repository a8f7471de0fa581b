//! Matrix utility functions.

use faer::{Col, Mat};

/// Compute the linear predictor z = β₀ + Xβ.
pub fn linear_predictor(x: &Mat<f64>, intercept: f64, beta: &Col<f64>) -> Col<f64> {
    let n_rows = x.nrows();
    let n_cols = x.ncols();
    let mut z = Col::from_fn(n_rows, |_| intercept);

    for j in 0..n_cols {
        let b = beta[j];
        if b == 0.0 {
            continue;
        }
        for i in 0..n_rows {
            z[i] += x[(i, j)] * b;
        }
    }

    z
}

/// Compute Xᵀd / n.
pub fn scaled_transpose_product(x: &Mat<f64>, d: &Col<f64>) -> Col<f64> {
    let n_rows = x.nrows();
    let scale = 1.0 / n_rows as f64;
    Col::from_fn(x.ncols(), |j| {
        scale * (0..n_rows).map(|i| x[(i, j)] * d[i]).sum::<f64>()
    })
}

/// Copy the rows of `x` at `indices`, in order.
pub fn select_rows(x: &Mat<f64>, indices: &[usize]) -> Mat<f64> {
    Mat::from_fn(indices.len(), x.ncols(), |i, j| x[(indices[i], j)])
}

/// Copy the entries of `y` at `indices`, in order.
pub fn select_elems(y: &Col<f64>, indices: &[usize]) -> Col<f64> {
    Col::from_fn(indices.len(), |i| y[indices[i]])
}

/// Arithmetic mean of a vector (NaN when empty).
pub fn mean(y: &Col<f64>) -> f64 {
    y.iter().sum::<f64>() / y.nrows() as f64
}

/// Euclidean norm of the difference of two equal-length vectors.
pub fn distance(a: &Col<f64>, b: &Col<f64>) -> f64 {
    (0..a.nrows())
        .map(|i| (a[i] - b[i]).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_predictor() {
        let x = Mat::from_fn(3, 2, |i, j| (i + 2 * j) as f64);
        let beta = Col::from_fn(2, |j| [1.0, -0.5][j]);
        let z = linear_predictor(&x, 2.0, &beta);

        // rows: [0, 2], [1, 3], [2, 4]
        assert!((z[0] - 1.0).abs() < 1e-12);
        assert!((z[1] - 1.5).abs() < 1e-12);
        assert!((z[2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_scaled_transpose_product() {
        let x = Mat::from_fn(4, 2, |i, j| if j == 0 { 1.0 } else { i as f64 });
        let d = Col::from_fn(4, |i| (i + 1) as f64);
        let g = scaled_transpose_product(&x, &d);

        assert!((g[0] - 2.5).abs() < 1e-12);
        // (0 + 2 + 6 + 12) / 4
        assert!((g[1] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_select_rows_and_elems() {
        let x = Mat::from_fn(5, 2, |i, j| (10 * i + j) as f64);
        let y = Col::from_fn(5, |i| i as f64);

        let xs = select_rows(&x, &[4, 1]);
        let ys = select_elems(&y, &[4, 1]);

        assert_eq!(xs.nrows(), 2);
        assert_eq!(xs[(0, 1)], 41.0);
        assert_eq!(xs[(1, 0)], 10.0);
        assert_eq!(ys[0], 4.0);
        assert_eq!(ys[1], 1.0);
    }

    #[test]
    fn test_mean_and_distance() {
        let a = Col::from_fn(4, |i| (i + 1) as f64);
        let b = Col::zeros(4);
        assert!((mean(&a) - 2.5).abs() < 1e-12);
        assert!((distance(&a, &b) - 30.0_f64.sqrt()).abs() < 1e-12);
    }
}
