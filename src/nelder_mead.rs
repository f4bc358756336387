//! Derivative-free Nelder–Mead simplex minimization.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptimizeError {
    #[error("starting point is empty")]
    EmptyStart,
    #[error("best score is not finite ({0})")]
    NonFinite(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No better than the supplied baseline after the patience window.
    Inferior,
    MaxIterations,
    Converged,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub score: f64,
    pub iterations: usize,
    pub stop: StopReason,
}

#[derive(Debug, Clone)]
pub struct NelderMead {
    /// Offset of the initial simplex vertices along each axis.
    pub step: f64,
    pub no_improve_thr: f64,
    /// Patience window, in iterations, for the improvement and baseline rules.
    pub no_improve_break: usize,
    pub max_iter: Option<usize>,
    pub max_time: Option<Duration>,
    /// Stop early once a run cannot beat this score.
    pub baseline: Option<f64>,
    pub alpha: f64,
    pub gamma: f64,
    pub rho: f64,
    pub sigma: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            step: 0.1,
            no_improve_thr: 10e-6,
            no_improve_break: 10,
            max_iter: None,
            max_time: None,
            baseline: None,
            alpha: 1.0,
            gamma: 2.0,
            rho: -0.5,
            sigma: 0.5,
        }
    }
}

struct Vertex {
    x: Vec<f64>,
    score: f64,
}

impl NelderMead {
    pub fn with_max_time(mut self, limit: Duration) -> Self {
        self.max_time = Some(limit);
        self
    }

    pub fn with_baseline(mut self, baseline: Option<f64>) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = Some(max_iter);
        self
    }

    pub fn minimize<F>(&self, f: F, start: &[f64]) -> Result<Minimum, OptimizeError>
    where
        F: Fn(&[f64]) -> f64,
    {
        if start.is_empty() {
            return Err(OptimizeError::EmptyStart);
        }
        let started = Instant::now();
        let dim = start.len();

        let mut prev_best = f(start);
        let mut simplex = Vec::with_capacity(dim + 1);
        simplex.push(Vertex {
            x: start.to_vec(),
            score: prev_best,
        });
        for i in 0..dim {
            let mut x = start.to_vec();
            x[i] += self.step;
            let score = f(&x);
            simplex.push(Vertex { x, score });
        }

        let mut no_improve = 0;
        let mut iter = 0;
        loop {
            simplex.sort_by(|a, b| a.score.total_cmp(&b.score));
            let best = simplex[0].score;

            let stop = if self
                .baseline
                .is_some_and(|b| iter >= self.no_improve_break && best >= b)
            {
                Some(StopReason::Inferior)
            } else if self.max_iter.is_some_and(|m| iter >= m) {
                Some(StopReason::MaxIterations)
            } else {
                iter += 1;
                if best < prev_best - self.no_improve_thr {
                    no_improve = 0;
                    prev_best = best;
                } else {
                    no_improve += 1;
                }
                if no_improve >= self.no_improve_break {
                    Some(StopReason::Converged)
                } else if self.max_time.is_some_and(|t| started.elapsed() >= t) {
                    Some(StopReason::TimedOut)
                } else {
                    None
                }
            };

            if let Some(stop) = stop {
                let best = simplex.swap_remove(0);
                if !best.score.is_finite() {
                    return Err(OptimizeError::NonFinite(best.score));
                }
                return Ok(Minimum {
                    point: best.x,
                    score: best.score,
                    iterations: iter,
                    stop,
                });
            }

            let centroid: Vec<f64> = (0..dim)
                .map(|i| simplex[..dim].iter().map(|v| v.x[i]).sum::<f64>() / dim as f64)
                .collect();
            let worst = &simplex[dim];
            let toward = |coef: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&worst.x)
                    .map(|(c, w)| c + coef * (c - w))
                    .collect()
            };

            let xr = toward(self.alpha);
            let rscore = f(&xr);
            if simplex[0].score <= rscore && rscore < simplex[dim - 1].score {
                simplex[dim] = Vertex { x: xr, score: rscore };
                continue;
            }

            if rscore < simplex[0].score {
                let xe = toward(self.gamma);
                let escore = f(&xe);
                simplex[dim] = if escore < rscore {
                    Vertex { x: xe, score: escore }
                } else {
                    Vertex { x: xr, score: rscore }
                };
                continue;
            }

            let xc = toward(self.rho);
            let cscore = f(&xc);
            if cscore < simplex[dim].score {
                simplex[dim] = Vertex { x: xc, score: cscore };
                continue;
            }

            let anchor = simplex[0].x.clone();
            for v in &mut simplex {
                v.x = anchor
                    .iter()
                    .zip(&v.x)
                    .map(|(a, x)| a + self.sigma * (x - a))
                    .collect();
                v.score = f(&v.x);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(x: &[f64]) -> f64 {
        (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2) + 2.0
    }

    fn rosenbrock(x: &[f64]) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }

    #[test]
    fn test_minimizes_quadratic() {
        let opt = NelderMead {
            no_improve_thr: 1e-12,
            no_improve_break: 50,
            ..Default::default()
        };
        let m = opt.minimize(quadratic, &[0.0, 0.0]).unwrap();
        assert!((m.point[0] - 3.0).abs() < 1e-3, "x = {:?}", m.point);
        assert!((m.point[1] + 1.0).abs() < 1e-3, "x = {:?}", m.point);
        assert!((m.score - 2.0).abs() < 1e-6);
        assert_eq!(m.stop, StopReason::Converged);
    }

    #[test]
    fn test_never_worse_than_start() {
        let start = [-1.2, 1.0];
        let m = NelderMead::default().minimize(rosenbrock, &start).unwrap();
        assert!(m.score <= rosenbrock(&start));
    }

    #[test]
    fn test_deterministic() {
        let opt = NelderMead::default().with_max_iter(200);
        let a = opt.minimize(rosenbrock, &[-1.2, 1.0]).unwrap();
        let b = opt.minimize(rosenbrock, &[-1.2, 1.0]).unwrap();
        assert_eq!(a.score.to_bits(), b.score.to_bits());
        assert_eq!(a.point, b.point);
        assert_eq!(a.iterations, b.iterations);
    }

    #[test]
    fn test_max_iterations() {
        let m = NelderMead {
            no_improve_break: 1000,
            ..NelderMead::default().with_max_iter(5)
        }
        .minimize(rosenbrock, &[-1.2, 1.0])
        .unwrap();
        assert_eq!(m.iterations, 5);
        assert_eq!(m.stop, StopReason::MaxIterations);
    }

    #[test]
    fn test_baseline_short_circuits() {
        let opt = NelderMead::default().with_baseline(Some(-1.0));
        let m = opt.minimize(quadratic, &[0.0, 0.0]).unwrap();
        assert_eq!(m.stop, StopReason::Inferior);
        assert_eq!(m.iterations, opt.no_improve_break);
    }

    #[test]
    fn test_timeout() {
        let slow = |x: &[f64]| {
            std::thread::sleep(Duration::from_millis(2));
            rosenbrock(x)
        };
        let opt = NelderMead {
            no_improve_break: usize::MAX,
            ..NelderMead::default().with_max_time(Duration::from_millis(20))
        };
        let m = opt.minimize(slow, &[-1.2, 1.0]).unwrap();
        assert_eq!(m.stop, StopReason::TimedOut);
    }

    #[test]
    fn test_empty_start() {
        let err = NelderMead::default().minimize(|_| 0.0, &[]).unwrap_err();
        assert_eq!(err, OptimizeError::EmptyStart);
    }

    #[test]
    fn test_non_finite_score() {
        let err = NelderMead::default()
            .minimize(|_| f64::NAN, &[1.0])
            .unwrap_err();
        assert!(matches!(err, OptimizeError::NonFinite(_)));
    }
}
