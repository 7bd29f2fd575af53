//! minimize.rs — bounded derivative-free minimization.
//!
//! Nelder-Mead simplex with box bounds enforced by clamping trial points.
//! Used to profile nuisance parameters at each grid point; convergence is
//! judged on the spread of simplex function values.

/// Box bounds, one (lo, hi) pair per dimension.
pub type Bounds = Vec<(f64, f64)>;

#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Absolute spread of simplex f-values that counts as converged.
    pub ftol: f64,
    /// Budget of objective evaluations.
    pub max_nfev: usize,
    /// Initial simplex step, as a fraction of each bound range.
    pub initial_step: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            ftol: 1e-4,
            max_nfev: 400,
            initial_step: 0.05,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MinimizeResult {
    pub x: Vec<f64>,
    pub fun: f64,
    pub nfev: usize,
    pub converged: bool,
}

fn clamp(x: &mut [f64], bounds: &[(f64, f64)]) {
    for (xi, &(lo, hi)) in x.iter_mut().zip(bounds) {
        *xi = xi.clamp(lo, hi);
    }
}

/// Minimize `f` from `x0` inside `bounds`.
///
/// A non-converged result still carries the best point found; callers decide
/// whether that is fatal (the scans log it and keep the value).
pub fn minimize<F>(mut f: F, x0: &[f64], bounds: &Bounds, opts: Options) -> MinimizeResult
where
    F: FnMut(&[f64]) -> f64,
{
    assert_eq!(x0.len(), bounds.len(), "x0/bounds dimension mismatch");
    assert!(bounds.iter().all(|&(lo, hi)| hi > lo), "empty bound range");
    let n = x0.len();

    let mut nfev = 0usize;
    let mut eval = |x: &[f64], nfev: &mut usize| {
        *nfev += 1;
        let v = f(x);
        if v.is_nan() { f64::INFINITY } else { v }
    };

    // Initial simplex: x0 plus one step along each axis.
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    let mut start = x0.to_vec();
    clamp(&mut start, bounds);
    simplex.push(start.clone());
    for i in 0..n {
        let (lo, hi) = bounds[i];
        let step = (hi - lo) * opts.initial_step;
        let mut v = start.clone();
        // Step toward the roomier side so the vertex stays distinct.
        v[i] = if v[i] + step <= hi { v[i] + step } else { v[i] - step };
        clamp(&mut v, bounds);
        simplex.push(v);
    }
    let mut fx: Vec<f64> = simplex.iter().map(|v| eval(v, &mut nfev)).collect();

    const ALPHA: f64 = 1.0; // reflection
    const GAMMA: f64 = 2.0; // expansion
    const RHO: f64 = 0.5; // contraction
    const SIGMA: f64 = 0.5; // shrink

    let mut converged = false;
    while nfev < opts.max_nfev {
        // Order simplex by function value.
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| fx[a].total_cmp(&fx[b]));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        if (fx[worst] - fx[best]).abs() <= opts.ftol {
            converged = true;
            break;
        }

        // Centroid of all but the worst vertex.
        let mut centroid = vec![0.0; n];
        for &idx in order.iter().take(n) {
            for (c, v) in centroid.iter_mut().zip(&simplex[idx]) {
                *c += v / n as f64;
            }
        }

        let mut reflected: Vec<f64> = centroid
            .iter()
            .zip(&simplex[worst])
            .map(|(c, w)| c + ALPHA * (c - w))
            .collect();
        clamp(&mut reflected, bounds);
        let f_reflected = eval(&reflected, &mut nfev);

        if f_reflected < fx[best] {
            let mut expanded: Vec<f64> = centroid
                .iter()
                .zip(&reflected)
                .map(|(c, r)| c + GAMMA * (r - c))
                .collect();
            clamp(&mut expanded, bounds);
            let f_expanded = eval(&expanded, &mut nfev);
            if f_expanded < f_reflected {
                simplex[worst] = expanded;
                fx[worst] = f_expanded;
            } else {
                simplex[worst] = reflected;
                fx[worst] = f_reflected;
            }
            continue;
        }

        if f_reflected < fx[second_worst] {
            simplex[worst] = reflected;
            fx[worst] = f_reflected;
            continue;
        }

        let mut contracted: Vec<f64> = centroid
            .iter()
            .zip(&simplex[worst])
            .map(|(c, w)| c + RHO * (w - c))
            .collect();
        clamp(&mut contracted, bounds);
        let f_contracted = eval(&contracted, &mut nfev);
        if f_contracted < fx[worst] {
            simplex[worst] = contracted;
            fx[worst] = f_contracted;
            continue;
        }

        // Shrink toward the best vertex.
        let best_vertex = simplex[best].clone();
        for idx in 0..=n {
            if idx == best {
                continue;
            }
            let shrunk: Vec<f64> = best_vertex
                .iter()
                .zip(&simplex[idx])
                .map(|(b, v)| b + SIGMA * (v - b))
                .collect();
            simplex[idx] = shrunk;
            fx[idx] = eval(&simplex[idx], &mut nfev);
            if nfev >= opts.max_nfev {
                break;
            }
        }
    }

    let mut best = 0;
    for i in 1..=n {
        if fx[i] < fx[best] {
            best = i;
        }
    }
    MinimizeResult {
        x: simplex.swap_remove(best),
        fun: fx[best],
        nfev,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_bowl_converges_to_center() {
        let f = |x: &[f64]| (x[0] - 1.0).powi(2) + 3.0 * (x[1] + 2.0).powi(2);
        let bounds = vec![(-5.0, 5.0), (-5.0, 5.0)];
        let r = minimize(f, &[4.0, 4.0], &bounds, Options::default());
        assert!(r.converged, "nfev = {}", r.nfev);
        assert!((r.x[0] - 1.0).abs() < 1e-2, "x = {:?}", r.x);
        assert!((r.x[1] + 2.0).abs() < 1e-2, "x = {:?}", r.x);
    }

    #[test]
    fn bounded_minimum_lands_on_the_boundary() {
        // Unconstrained minimum at x = -3 sits outside the box.
        let f = |x: &[f64]| (x[0] + 3.0).powi(2);
        let bounds = vec![(0.0, 10.0)];
        let r = minimize(f, &[5.0], &bounds, Options::default());
        assert!(r.x[0] < 0.05, "x = {:?}", r.x);
        assert!(r.x[0] >= 0.0);
    }

    #[test]
    fn nan_objective_values_are_rejected_not_propagated() {
        let f = |x: &[f64]| {
            if x[0] < 0.0 {
                f64::NAN
            } else {
                (x[0] - 2.0).powi(2)
            }
        };
        let bounds = vec![(-10.0, 10.0)];
        let r = minimize(f, &[8.0], &bounds, Options::default());
        assert!((r.x[0] - 2.0).abs() < 0.05, "x = {:?}", r.x);
        assert!(r.fun.is_finite());
    }

    #[test]
    fn evaluation_budget_is_respected() {
        let opts = Options {
            max_nfev: 25,
            ..Options::default()
        };
        let mut calls = 0usize;
        let r = minimize(
            |x: &[f64]| {
                calls += 1;
                x[0].powi(2) + x[1].powi(2) + x[2].powi(2)
            },
            &[3.0, 3.0, 3.0],
            &vec![(-5.0, 5.0); 3],
            opts,
        );
        assert!(calls <= 25 + 3, "calls = {calls}");
        assert!(r.nfev <= 25 + 3);
    }
}
