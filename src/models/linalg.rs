//! Ordinary least squares via the normal equations
//!
//! Systems here are tiny (at most a dozen regressors), so a dense
//! Gaussian elimination with partial pivoting is plenty.

use super::Result;
use crate::error::ModelError;

const PIVOT_EPS: f64 = 1e-10;

/// Solve `a · x = b` in place; `a` is row-major `n × n`
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0f64, |m, v| m.max(v.abs()))
        .max(1.0);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);

        if a[pivot_row][col].abs() <= PIVOT_EPS * scale {
            return Err(ModelError::NumericalError(
                "Singular least-squares system".to_string(),
            ));
        }

        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                let upper = a[col][k];
                a[row][k] -= factor * upper;
            }
            let upper_b = b[col];
            b[row] -= factor * upper_b;
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for k in (row + 1)..n {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }

    Ok(x)
}

/// Least-squares coefficients for `y ≈ X · β`
///
/// `rows` holds one regressor vector per observation. With zero regressors
/// the empty coefficient vector is returned.
pub fn ols(rows: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>> {
    let k = rows.first().map(|r| r.len()).unwrap_or(0);
    if k == 0 {
        return Ok(Vec::new());
    }
    if rows.len() < k {
        return Err(ModelError::InsufficientData {
            required: k,
            actual: rows.len(),
        });
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, target) in rows.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * target;
            for j in i..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            let mirrored = xtx[j][i];
            xtx[i][j] = mirrored;
        }
    }

    solve(xtx, xty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ols_recovers_line() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 3.0 + 0.5 * i as f64).collect();

        let beta = ols(&rows, &y).unwrap();
        assert!((beta[0] - 3.0).abs() < 1e-9);
        assert!((beta[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_columns_are_singular() {
        let rows: Vec<Vec<f64>> = (0..10).map(|_| vec![1.0, 2.0]).collect();
        let y = vec![1.0; 10];
        assert!(matches!(ols(&rows, &y), Err(ModelError::NumericalError(_))));
    }

    #[test]
    fn test_no_regressors() {
        assert_eq!(ols(&[vec![], vec![]], &[1.0, 2.0]).unwrap(), Vec::<f64>::new());
    }
}
