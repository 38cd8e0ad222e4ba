//! Bundle adjustment over the candidate set.
//!
//! Minimizes the weighted squared error of every shift constraint:
//!
//! ```text
//! F(t) = Σ w_ab * || (t_b - t_a) - d_ab ||²
//! ```
//!
//! Gauss-Newton iteratively solves `H Δt = -g` with the new frame's shift
//! fixed as the gauge. The x and y axes decouple, so each iteration solves
//! two small symmetric positive-definite systems by Cholesky factorization.

use crate::config::EstimationConfig;

use super::{BundleAdjuster, CameraShift, PoseEstimate, SolveError};

/// Result of one adjustment run.
#[derive(Debug, Clone)]
pub struct AdjustOutcome {
    /// Refined per-candidate shifts; unsolved entries stay `None`.
    pub shifts: Vec<Option<CameraShift>>,
    /// Iterations performed.
    pub iterations: u32,
    /// Weighted squared error before refinement.
    pub initial_error: f64,
    /// Weighted squared error after refinement.
    pub final_error: f64,
    /// Whether the update norm fell below the convergence threshold.
    pub converged: bool,
}

/// Default adjuster: damped Gauss-Newton on the constraint graph.
pub struct GaussNewtonAdjuster {
    config: EstimationConfig,
}

// Diagonal damping keeps the normal equations positive definite even for a
// constraint graph with redundant edges.
const DAMPING: f64 = 1e-9;

impl GaussNewtonAdjuster {
    pub fn new(config: &EstimationConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl BundleAdjuster for GaussNewtonAdjuster {
    fn adjust(&self, estimate: &PoseEstimate) -> Result<AdjustOutcome, SolveError> {
        // Free variables: every solved candidate except the gauge at index 0.
        let var_of: Vec<Option<usize>> = {
            let mut next = 0usize;
            estimate
                .shifts
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    if i == 0 || s.is_none() {
                        None
                    } else {
                        let v = next;
                        next += 1;
                        Some(v)
                    }
                })
                .collect()
        };
        let n = var_of.iter().flatten().count();

        let mut shifts: Vec<Option<CameraShift>> = estimate.shifts.clone();
        if n == 0 {
            // Nothing to refine beyond the gauge.
            return Ok(AdjustOutcome {
                shifts,
                iterations: 0,
                initial_error: 0.0,
                final_error: 0.0,
                converged: true,
            });
        }

        // Only constraints whose endpoints are both solved participate.
        let active: Vec<_> = estimate
            .constraints
            .iter()
            .filter(|c| shifts[c.a].is_some() && shifts[c.b].is_some())
            .collect();
        if active.is_empty() {
            return Err(SolveError::NoConstraints);
        }

        let initial_error = chi2(&shifts, &active);
        let mut error = initial_error;
        let mut iterations = 0u32;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            iterations += 1;

            // Accumulate the normal equations per axis.
            let mut h = vec![vec![0.0f64; n]; n];
            let mut gx = vec![0.0f64; n];
            let mut gy = vec![0.0f64; n];

            for c in &active {
                let w = c.inliers as f64;
                let ta = shifts[c.a].unwrap_or_default();
                let tb = shifts[c.b].unwrap_or_default();
                let rx = (tb.dx - ta.dx) - c.dx;
                let ry = (tb.dy - ta.dy) - c.dy;

                if let Some(vb) = var_of[c.b] {
                    h[vb][vb] += w;
                    gx[vb] += w * rx;
                    gy[vb] += w * ry;
                }
                if let Some(va) = var_of[c.a] {
                    h[va][va] += w;
                    gx[va] -= w * rx;
                    gy[va] -= w * ry;
                }
                if let (Some(va), Some(vb)) = (var_of[c.a], var_of[c.b]) {
                    h[va][vb] -= w;
                    h[vb][va] -= w;
                }
            }

            for (i, row) in h.iter_mut().enumerate() {
                row[i] += DAMPING;
            }

            let dx = solve_cholesky(&h, &gx).ok_or(SolveError::SolveFailed)?;
            let dy = solve_cholesky(&h, &gy).ok_or(SolveError::SolveFailed)?;

            let mut step_norm: f64 = 0.0;
            for (i, var) in var_of.iter().enumerate() {
                if let Some(v) = *var {
                    if let Some(shift) = shifts[i].as_mut() {
                        shift.dx -= dx[v];
                        shift.dy -= dy[v];
                        step_norm += dx[v] * dx[v] + dy[v] * dy[v];
                    }
                }
            }

            let new_error = chi2(&shifts, &active);
            if new_error > error + 1.0 {
                return Err(SolveError::Diverged);
            }
            error = new_error;

            if step_norm.sqrt() < self.config.convergence_threshold {
                converged = true;
                break;
            }
        }

        Ok(AdjustOutcome {
            shifts,
            iterations,
            initial_error,
            final_error: error,
            converged,
        })
    }
}

/// Weighted squared constraint error for the current shifts.
fn chi2(shifts: &[Option<CameraShift>], active: &[&super::ShiftConstraint]) -> f64 {
    active
        .iter()
        .map(|c| {
            let ta = shifts[c.a].unwrap_or_default();
            let tb = shifts[c.b].unwrap_or_default();
            let rx = (tb.dx - ta.dx) - c.dx;
            let ry = (tb.dy - ta.dy) - c.dy;
            c.inliers as f64 * (rx * rx + ry * ry)
        })
        .sum()
}

/// Solve `a x = b` for symmetric positive-definite `a` by Cholesky.
///
/// The systems here are tiny (one variable per anchor candidate), so a dense
/// factorization is the right tool.
fn solve_cholesky(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    let mut l = vec![vec![0.0f64; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // Forward substitution: L y = b
    let mut y = vec![0.0f64; n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i][k] * y[k];
        }
        y[i] = sum / l[i][i];
    }

    // Back substitution: Lᵀ x = y
    let mut x = vec![0.0f64; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in i + 1..n {
            sum -= l[k][i] * x[k];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::estimation::ShiftConstraint;

    fn adjuster() -> GaussNewtonAdjuster {
        GaussNewtonAdjuster::new(&EstimationConfig::default())
    }

    #[test]
    fn test_solve_cholesky_identity() {
        let a = vec![vec![2.0, 0.0], vec![0.0, 4.0]];
        let x = solve_cholesky(&a, &[6.0, 8.0]).unwrap();
        assert!((x[0] - 3.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_cholesky_rejects_indefinite() {
        let a = vec![vec![0.0, 0.0], vec![0.0, 1.0]];
        assert!(solve_cholesky(&a, &[1.0, 1.0]).is_none());
    }

    /// Consistent constraints are reproduced exactly.
    #[test]
    fn test_consistent_chain_is_fixed_point() {
        let estimate = PoseEstimate {
            shifts: vec![
                Some(CameraShift::default()),
                Some(CameraShift::new(10.0, 0.0)),
                Some(CameraShift::new(10.0, 5.0)),
            ],
            constraints: vec![
                ShiftConstraint {
                    a: 0,
                    b: 1,
                    dx: 10.0,
                    dy: 0.0,
                    inliers: 10,
                },
                ShiftConstraint {
                    a: 1,
                    b: 2,
                    dx: 0.0,
                    dy: 5.0,
                    inliers: 10,
                },
            ],
        };

        let outcome = adjuster().adjust(&estimate).unwrap();
        assert!(outcome.converged);
        assert!(outcome.final_error < 1e-9);
        let s1 = outcome.shifts[1].unwrap();
        let s2 = outcome.shifts[2].unwrap();
        assert!((s1.dx - 10.0).abs() < 1e-6 && s1.dy.abs() < 1e-6);
        assert!((s2.dx - 10.0).abs() < 1e-6 && (s2.dy - 5.0).abs() < 1e-6);
    }

    /// A redundant loop with disagreeing measurements settles on the
    /// weighted compromise and reduces the error.
    #[test]
    fn test_loop_disagreement_is_balanced() {
        let estimate = PoseEstimate {
            shifts: vec![
                Some(CameraShift::default()),
                Some(CameraShift::new(10.0, 0.0)),
                Some(CameraShift::new(20.0, 0.0)),
            ],
            constraints: vec![
                ShiftConstraint {
                    a: 0,
                    b: 1,
                    dx: 10.0,
                    dy: 0.0,
                    inliers: 10,
                },
                ShiftConstraint {
                    a: 1,
                    b: 2,
                    dx: 10.0,
                    dy: 0.0,
                    inliers: 10,
                },
                // Direct observation disagrees with the chain by 3px.
                ShiftConstraint {
                    a: 0,
                    b: 2,
                    dx: 23.0,
                    dy: 0.0,
                    inliers: 10,
                },
            ],
        };

        let outcome = adjuster().adjust(&estimate).unwrap();
        assert!(outcome.converged);
        assert!(outcome.final_error < outcome.initial_error);
        let s2 = outcome.shifts[2].unwrap();
        // Compromise lands strictly between the chain and the direct claim.
        assert!(s2.dx > 20.0 && s2.dx < 23.0);
    }

    /// Unsolved candidates pass through untouched.
    #[test]
    fn test_unsolved_candidate_stays_none() {
        let estimate = PoseEstimate {
            shifts: vec![
                Some(CameraShift::default()),
                Some(CameraShift::new(4.0, 4.0)),
                None,
            ],
            constraints: vec![ShiftConstraint {
                a: 0,
                b: 1,
                dx: 4.0,
                dy: 4.0,
                inliers: 8,
            }],
        };

        let outcome = adjuster().adjust(&estimate).unwrap();
        assert!(outcome.shifts[2].is_none());
        assert!(outcome.shifts[1].is_some());
    }
}
