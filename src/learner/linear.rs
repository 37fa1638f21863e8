//! Ridge regression learner
//!
//! Closed-form weighted ridge via Cholesky on the normal equations. The
//! intercept column is never penalized. Mainly here to give tuning a real
//! hyperparameter to search over.

use crate::error::{MlexpError, Result};
use crate::learner::{Learner, PredictModel};
use crate::task::TaskType;
use ndarray::{Array1, Array2};

/// L2-regularized linear regression
#[derive(Debug, Clone)]
pub struct RidgeRegression {
    lambda: f64,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self { lambda: 1.0 }
    }
}

impl RidgeRegression {
    /// Create a ridge learner with the given penalty
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }

    /// Penalty strength
    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl Learner for RidgeRegression {
    fn id(&self) -> &str {
        "regr.ridge"
    }

    fn task_type(&self) -> TaskType {
        TaskType::Regr
    }

    fn train(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        weights: Option<&[f64]>,
    ) -> Result<Box<dyn PredictModel>> {
        if self.lambda < 0.0 {
            return Err(MlexpError::LearnerError(format!(
                "ridge penalty must be non-negative, got {}",
                self.lambda
            )));
        }
        let n = x.nrows();
        if n == 0 || n != y.len() {
            return Err(MlexpError::LearnerError(format!(
                "feature matrix has {} rows but target has {} values",
                n,
                y.len()
            )));
        }
        let p = x.ncols() + 1; // intercept first

        // Normal equations on the augmented matrix: A = X'WX + lambda*I, b = X'Wy
        let mut a = Array2::zeros((p, p));
        let mut b = Array1::zeros(p);
        for r in 0..n {
            let w = weights.map(|w| w[r]).unwrap_or(1.0);
            for i in 0..p {
                let xi = if i == 0 { 1.0 } else { x[[r, i - 1]] };
                b[i] += w * xi * y[r];
                for j in 0..p {
                    let xj = if j == 0 { 1.0 } else { x[[r, j - 1]] };
                    a[[i, j]] += w * xi * xj;
                }
            }
        }
        for i in 1..p {
            a[[i, i]] += self.lambda;
        }

        let beta = cholesky_solve(&a, &b).ok_or_else(|| {
            MlexpError::LearnerError(
                "normal equations are singular; increase the ridge penalty".to_string(),
            )
        })?;
        Ok(Box::new(LinearModel { beta }))
    }
}

struct LinearModel {
    beta: Array1<f64>,
}

impl PredictModel for LinearModel {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() + 1 != self.beta.len() {
            return Err(MlexpError::LearnerError(format!(
                "model was fit on {} features but received {}",
                self.beta.len() - 1,
                x.ncols()
            )));
        }
        let mut out = Array1::from_elem(x.nrows(), self.beta[0]);
        for r in 0..x.nrows() {
            for c in 0..x.ncols() {
                out[r] += self.beta[c + 1] * x[[r, c]];
            }
        }
        Ok(out)
    }
}

/// Solve the symmetric positive-definite system Ax = b via Cholesky.
/// Returns `None` if the matrix is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let mut l: Array2<f64> = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // forward then backward substitution
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    Some(x)
}
