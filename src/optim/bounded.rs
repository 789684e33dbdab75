//! Box-constrained quasi-Newton minimiser with finite-difference gradients.
//!
//! Projected limited-memory BFGS: variables pinned at a bound by their
//! gradient are frozen, a two-loop recursion over the remaining free
//! variables gives the search direction, and an Armijo backtracking search
//! runs along the projected path. Gradients are forward differences that
//! flip to backward differences at the upper bound so every shifted point stays
//! inside the box.

use std::fmt;

use serde::Deserialize;

const BOUND_EPS: f64 = 1e-12;

/// Stopping rule and numerical settings for [`minimize`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinimizerConfig {
    /// Stop when the infinity norm of the projected gradient falls to this.
    pub pg_tol: f64,
    /// Stop when `(f_k - f_{k+1}) / max(|f_k|, |f_{k+1}|, 1)` falls to this.
    pub f_tol: f64,
    pub max_iterations: usize,
    /// Cap on objective evaluations, gradient steps included.
    pub max_evaluations: usize,
    /// Finite-difference step for gradient estimation.
    pub gradient_step: f64,
    /// Number of correction pairs kept.
    pub history: usize,
    pub armijo_c1: f64,
    pub backtrack_beta: f64,
    pub max_line_search_trials: usize,
    /// Pairs with `s.y <= min_curvature * |s| |y|` are skipped.
    pub min_curvature: f64,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            pg_tol: 1e-5,
            f_tol: 2.220446049250313e-9,
            max_iterations: 15_000,
            max_evaluations: 15_000,
            gradient_step: 1e-8,
            history: 10,
            armijo_c1: 1e-4,
            backtrack_beta: 0.5,
            max_line_search_trials: 40,
            min_curvature: 1e-12,
        }
    }
}

/// Per-variable lower and upper bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxBounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl BoxBounds {
    /// The same `[lower, upper]` interval for `n` variables.
    pub fn uniform(n: usize, lower: f64, upper: f64) -> Self {
        Self {
            lower: vec![lower; n],
            upper: vec![upper; n],
        }
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn project(&self, x: &mut [f64]) {
        for ((xi, lo), hi) in x.iter_mut().zip(&self.lower).zip(&self.upper) {
            *xi = xi.clamp(*lo, *hi);
        }
    }
}

/// Why the minimiser stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    ProjectedGradient,
    RelativeReduction,
    MaxIterations,
    MaxEvaluations,
    LineSearchFailed,
    NonFiniteObjective,
}

impl Termination {
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            Termination::ProjectedGradient | Termination::RelativeReduction
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::ProjectedGradient => "projected gradient below tolerance",
            Termination::RelativeReduction => "relative reduction below tolerance",
            Termination::MaxIterations => "iteration limit reached",
            Termination::MaxEvaluations => "evaluation limit reached",
            Termination::LineSearchFailed => "line search could not decrease the objective",
            Termination::NonFiniteObjective => "objective is not finite at the start point",
        };
        f.write_str(s)
    }
}

/// Best point found and how the search ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub f: f64,
    pub iterations: usize,
    pub evaluations: usize,
    /// Infinity norm of the projected gradient at `x`.
    pub projected_gradient: f64,
    pub termination: Termination,
}

impl Minimum {
    pub fn converged(&self) -> bool {
        self.termination.is_converged()
    }
}

#[derive(Debug, Clone)]
struct CorrectionPair {
    s: Vec<f64>,
    y: Vec<f64>,
    rho: f64,
}

#[derive(Debug, Default, Clone)]
struct LbfgsHistory {
    pairs: Vec<CorrectionPair>,
    curvature_skips: usize,
}

impl LbfgsHistory {
    fn clear(&mut self) {
        self.pairs.clear();
    }

    fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn update(&mut self, s: Vec<f64>, y: Vec<f64>, config: &MinimizerConfig) {
        if config.history == 0 {
            self.clear();
            return;
        }

        let s_dot_y = dot(&s, &y);
        let s_norm = norm(&s);
        let y_norm = norm(&y);
        if !s_dot_y.is_finite()
            || !s_norm.is_finite()
            || !y_norm.is_finite()
            || s_dot_y <= config.min_curvature * s_norm * y_norm
            || s_dot_y <= 0.0
        {
            self.curvature_skips += 1;
            return;
        }

        self.pairs.push(CorrectionPair {
            s,
            y,
            rho: 1.0 / s_dot_y,
        });
        if self.pairs.len() > config.history {
            let overflow = self.pairs.len() - config.history;
            self.pairs.drain(0..overflow);
        }
    }

    /// Two-loop recursion restricted to the free variables.
    fn direction(&self, grad: &[f64], free: &[bool]) -> Vec<f64> {
        let Some(latest) = self.pairs.last() else {
            return steepest_descent(grad, free);
        };

        let mut q: Vec<f64> = grad
            .iter()
            .zip(free)
            .map(|(&g, &is_free)| if is_free { g } else { 0.0 })
            .collect();

        let mut alphas = Vec::with_capacity(self.pairs.len());
        for pair in self.pairs.iter().rev() {
            let alpha = pair.rho * dot_masked(&pair.s, &q, free);
            alphas.push(alpha);
            for i in 0..q.len() {
                if free[i] {
                    q[i] -= alpha * pair.y[i];
                }
            }
        }

        let y_dot_y = dot(&latest.y, &latest.y);
        let gamma = if y_dot_y > 0.0 {
            1.0 / (latest.rho * y_dot_y)
        } else {
            1.0
        };
        let mut r: Vec<f64> = q.iter().map(|qi| gamma * qi).collect();

        for (pair, alpha) in self.pairs.iter().zip(alphas.into_iter().rev()) {
            let beta = pair.rho * dot_masked(&pair.y, &r, free);
            for i in 0..r.len() {
                if free[i] {
                    r[i] += pair.s[i] * (alpha - beta);
                }
            }
        }

        for ri in &mut r {
            *ri = -*ri;
        }
        r
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn dot_masked(a: &[f64], b: &[f64], free: &[bool]) -> f64 {
    a.iter()
        .zip(b)
        .zip(free)
        .map(|((&ai, &bi), &is_free)| if is_free { ai * bi } else { 0.0 })
        .sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Negative gradient over the free variables, scaled to at most unit length.
fn steepest_descent(grad: &[f64], free: &[bool]) -> Vec<f64> {
    let g_norm = dot_masked(grad, grad, free).sqrt();
    let scale = if g_norm > 1.0 { 1.0 / g_norm } else { 1.0 };
    grad.iter()
        .zip(free)
        .map(|(&g, &is_free)| if is_free { -g * scale } else { 0.0 })
        .collect()
}

fn projected_grad_component(x: f64, g: f64, lo: f64, hi: f64) -> f64 {
    if (hi - lo).abs() <= BOUND_EPS {
        0.0
    } else if x <= lo + BOUND_EPS * (1.0 + lo.abs()) {
        g.min(0.0)
    } else if x >= hi - BOUND_EPS * (1.0 + hi.abs()) {
        g.max(0.0)
    } else {
        g
    }
}

fn projected_grad_norm(x: &[f64], grad: &[f64], bounds: &BoxBounds) -> f64 {
    x.iter()
        .zip(grad)
        .zip(bounds.lower.iter().zip(&bounds.upper))
        .map(|((&xi, &gi), (&lo, &hi))| projected_grad_component(xi, gi, lo, hi).abs())
        .fold(0.0, f64::max)
}

/// Variables not held at a bound by a gradient pointing out of the box.
fn free_mask(x: &[f64], grad: &[f64], bounds: &BoxBounds) -> Vec<bool> {
    x.iter()
        .zip(grad)
        .zip(bounds.lower.iter().zip(&bounds.upper))
        .map(|((&xi, &gi), (&lo, &hi))| {
            if (hi - lo).abs() <= BOUND_EPS {
                return false;
            }
            let pinned_lower = xi <= lo + BOUND_EPS * (1.0 + lo.abs()) && gi > 0.0;
            let pinned_upper = xi >= hi - BOUND_EPS * (1.0 + hi.abs()) && gi < 0.0;
            !(pinned_lower || pinned_upper)
        })
        .collect()
}

/// Tracks evaluations so the budget covers gradient steps and the line search.
struct Counted<F> {
    objective: F,
    evaluations: usize,
}

impl<F: FnMut(&[f64]) -> f64> Counted<F> {
    fn eval(&mut self, x: &[f64]) -> f64 {
        self.evaluations += 1;
        (self.objective)(x)
    }

    /// Forward differences, backward where a forward step would leave the box.
    fn gradient(&mut self, x: &[f64], fx: f64, bounds: &BoxBounds, h: f64) -> Vec<f64> {
        let mut shifted = x.to_vec();
        let mut grad = vec![0.0; x.len()];
        for i in 0..x.len() {
            let step = if x[i] + h <= bounds.upper[i] { h } else { -h };
            shifted[i] = x[i] + step;
            let f_shifted = self.eval(&shifted);
            grad[i] = (f_shifted - fx) / step;
            shifted[i] = x[i];
        }
        grad
    }
}

/// Minimises `objective` over `bounds`, starting from the projection of `x0`.
///
/// Non-finite objective values during a line search are treated as failed
/// trials. The returned point is always the best accepted iterate; callers
/// decide what to do when [`Minimum::converged`] is false.
pub fn minimize<F>(
    objective: F,
    x0: &[f64],
    bounds: &BoxBounds,
    config: &MinimizerConfig,
) -> Minimum
where
    F: FnMut(&[f64]) -> f64,
{
    let mut counted = Counted {
        objective,
        evaluations: 0,
    };
    let mut x = x0.to_vec();
    bounds.project(&mut x);

    let mut f = counted.eval(&x);
    if !f.is_finite() {
        return Minimum {
            x,
            f,
            iterations: 0,
            evaluations: counted.evaluations,
            projected_gradient: f64::INFINITY,
            termination: Termination::NonFiniteObjective,
        };
    }
    let mut grad = counted.gradient(&x, f, bounds, config.gradient_step);
    let mut history = LbfgsHistory::default();
    let mut iterations = 0;

    let termination = loop {
        if projected_grad_norm(&x, &grad, bounds) <= config.pg_tol {
            break Termination::ProjectedGradient;
        }
        if iterations >= config.max_iterations {
            break Termination::MaxIterations;
        }
        if counted.evaluations >= config.max_evaluations {
            break Termination::MaxEvaluations;
        }

        let free = free_mask(&x, &grad, bounds);
        let mut direction = history.direction(&grad, &free);
        if dot(&direction, &grad) >= 0.0 {
            history.clear();
            direction = steepest_descent(&grad, &free);
        }

        let Some((x_next, f_next)) =
            line_search(&mut counted, &x, f, &grad, &direction, bounds, config)
        else {
            if counted.evaluations >= config.max_evaluations {
                break Termination::MaxEvaluations;
            }
            if history.is_empty() {
                break Termination::LineSearchFailed;
            }
            // Retry from steepest descent before giving up.
            history.clear();
            continue;
        };

        let g_next = counted.gradient(&x_next, f_next, bounds, config.gradient_step);
        let s: Vec<f64> = x_next.iter().zip(&x).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = g_next.iter().zip(&grad).map(|(a, b)| a - b).collect();
        history.update(s, y, config);

        let reduction = f - f_next;
        let scale = f.abs().max(f_next.abs()).max(1.0);
        x = x_next;
        f = f_next;
        grad = g_next;
        iterations += 1;

        if reduction <= config.f_tol * scale {
            break Termination::RelativeReduction;
        }
    };

    tracing::debug!(
        iterations,
        evaluations = counted.evaluations,
        curvature_skips = history.curvature_skips,
        %termination,
        "bounded minimisation finished"
    );

    Minimum {
        projected_gradient: projected_grad_norm(&x, &grad, bounds),
        x,
        f,
        iterations,
        evaluations: counted.evaluations,
        termination,
    }
}

/// Armijo backtracking along `P(x + t d)`; returns the accepted point.
fn line_search<F: FnMut(&[f64]) -> f64>(
    counted: &mut Counted<F>,
    x: &[f64],
    f: f64,
    grad: &[f64],
    direction: &[f64],
    bounds: &BoxBounds,
    config: &MinimizerConfig,
) -> Option<(Vec<f64>, f64)> {
    let mut t = 1.0;
    for _ in 0..config.max_line_search_trials {
        if counted.evaluations >= config.max_evaluations {
            return None;
        }
        let mut candidate: Vec<f64> = x
            .iter()
            .zip(direction)
            .map(|(xi, di)| xi + t * di)
            .collect();
        bounds.project(&mut candidate);

        let step: Vec<f64> = candidate.iter().zip(x).map(|(a, b)| a - b).collect();
        if step.iter().all(|s| *s == 0.0) {
            return None;
        }
        let decrease = dot(grad, &step);
        if decrease < 0.0 {
            let f_candidate = counted.eval(&candidate);
            if f_candidate.is_finite() && f_candidate <= f + config.armijo_c1 * decrease {
                return Some((candidate, f_candidate));
            }
        }
        t *= config.backtrack_beta;
    }
    None
}
