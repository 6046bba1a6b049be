//! Derivative-free Nelder–Mead simplex minimiser.

use std::cmp::Ordering;

/// Simplex coefficients and stopping rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NelderMeadOptions {
    pub max_iterations: usize,
    /// Converged once `f_worst - f_best <= abs_tol + rel_tol * |f_best|`.
    pub rel_tol: f64,
    pub abs_tol: f64,
    pub reflection: f64,
    pub expansion: f64,
    pub contraction: f64,
    pub shrink: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            rel_tol: 1e-10,
            abs_tol: 1e-12,
            reflection: 1.0,
            expansion: 2.0,
            contraction: 0.5,
            shrink: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimisationResult {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Minimise `objective` from `start`, building the initial simplex by moving
/// each coordinate by the matching entry of `steps`.
///
/// Non-finite objective values are treated as `+inf`, so the simplex walks
/// away from infeasible regions instead of stalling on them.
pub fn nelder_mead<F>(
    objective: F,
    start: &[f64],
    steps: &[f64],
    options: &NelderMeadOptions,
) -> OptimisationResult
where
    F: Fn(&[f64]) -> f64,
{
    let dimension = start.len();
    let eval = |x: &[f64]| {
        let value = objective(x);
        if value.is_finite() {
            value
        } else {
            f64::INFINITY
        }
    };

    if dimension == 0 {
        return OptimisationResult {
            x: Vec::new(),
            value: eval(start),
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(dimension + 1);
    simplex.push((start.to_vec(), eval(start)));
    for axis in 0..dimension {
        let mut vertex = start.to_vec();
        let step = steps.get(axis).copied().unwrap_or(0.1);
        vertex[axis] += if step == 0.0 { 0.1 } else { step };
        let value = eval(&vertex);
        simplex.push((vertex, value));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        simplex.sort_by(|left, right| left.1.partial_cmp(&right.1).unwrap_or(Ordering::Equal));

        let best = simplex[0].1;
        let worst = simplex[dimension].1;
        if best.is_finite()
            && worst.is_finite()
            && worst - best <= options.abs_tol + options.rel_tol * best.abs()
        {
            converged = true;
            break;
        }
        iterations += 1;

        let centroid: Vec<f64> = (0..dimension)
            .map(|axis| {
                simplex[..dimension]
                    .iter()
                    .map(|(vertex, _)| vertex[axis])
                    .sum::<f64>()
                    / dimension as f64
            })
            .collect();
        let worst_vertex = simplex[dimension].0.clone();
        let toward = |coefficient: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&worst_vertex)
                .map(|(c, w)| c + coefficient * (c - w))
                .collect()
        };

        let reflected = toward(options.reflection);
        let reflected_value = eval(&reflected);
        let second_worst = simplex[dimension - 1].1;

        if reflected_value < best {
            let expanded = toward(options.reflection * options.expansion);
            let expanded_value = eval(&expanded);
            simplex[dimension] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
            continue;
        }

        if reflected_value < second_worst {
            simplex[dimension] = (reflected, reflected_value);
            continue;
        }

        let (contracted, contracted_value) = if reflected_value < worst {
            let outside = toward(options.reflection * options.contraction);
            let value = eval(&outside);
            (outside, value)
        } else {
            let inside = toward(-options.contraction);
            let value = eval(&inside);
            (inside, value)
        };

        if contracted_value < reflected_value.min(worst) {
            simplex[dimension] = (contracted, contracted_value);
            continue;
        }

        let anchor = simplex[0].0.clone();
        for (vertex, value) in simplex.iter_mut().skip(1) {
            for (coordinate, origin) in vertex.iter_mut().zip(&anchor) {
                *coordinate = origin + options.shrink * (*coordinate - origin);
            }
            *value = eval(vertex);
        }
    }

    simplex.sort_by(|left, right| left.1.partial_cmp(&right.1).unwrap_or(Ordering::Equal));
    let (x, value) = simplex.swap_remove(0);
    OptimisationResult {
        x,
        value,
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimises_quadratic_bowl() {
        let result = nelder_mead(
            |x| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2),
            &[0.0, 0.0],
            &[0.5, 0.5],
            &NelderMeadOptions::default(),
        );

        assert!(result.converged);
        assert!((result.x[0] - 3.0).abs() < 1e-3);
        assert!((result.x[1] + 1.0).abs() < 1e-3);
    }

    #[test]
    fn minimises_rosenbrock() {
        let options = NelderMeadOptions {
            abs_tol: 1e-14,
            ..NelderMeadOptions::default()
        };
        let result = nelder_mead(
            |x| 100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2),
            &[-1.2, 1.0],
            &[0.1, 0.1],
            &options,
        );

        assert!(result.converged);
        assert!((result.x[0] - 1.0).abs() < 1e-3);
        assert!((result.x[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn walks_away_from_infeasible_region() {
        let result = nelder_mead(
            |x| if x[0] < 0.0 { f64::NAN } else { (x[0] - 1.0).powi(2) },
            &[0.5],
            &[0.25],
            &NelderMeadOptions::default(),
        );

        assert!(result.converged);
        assert!((result.x[0] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn reports_non_convergence_when_budget_is_exhausted() {
        let options = NelderMeadOptions {
            max_iterations: 3,
            ..NelderMeadOptions::default()
        };
        let result = nelder_mead(
            |x| (x[0] - 50.0).powi(2) + (x[1] - 50.0).powi(2),
            &[0.0, 0.0],
            &[0.1, 0.1],
            &options,
        );

        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
    }
}
