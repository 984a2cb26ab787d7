//! Convergence control for the inner search.
//!
//! CSMOn drives a [`Search`] one improvement at a time and stops it once the
//! best-so-far curve has stabilised under two successive regimes: an
//! exponential decay followed by a power-law decay. Termination here is
//! local: it bounds one engine iteration, never the whole run.

use tracing::trace;

use crate::error::{Result, TesoroError};
use crate::search::{Search, SearchContext};

/// Runs a search under a budget, deciding when the current iteration has
/// converged enough.
pub trait ConvergenceControl: Send {
    /// Evaluation budget granted per call to [`run`](ConvergenceControl::run).
    fn budget(&self) -> usize;

    /// Drive `search` until convergence stabilises or the budget is spent.
    fn run(&mut self, search: &mut dyn Search, ctx: &mut SearchContext<'_>) -> Result<()>;
}

/// Two-regime curve-fit stop criterion.
///
/// The best-so-far series `(evaluations, fitness)` is sampled after every
/// improvement. The exponential phase waits for both decay residuals to fall
/// under the running relaxation `r` and for the intercept of the `ln y`-on-`x`
/// regression to peak; the power-law phase then waits for the intercept of
/// the `log y`-on-`log x` regression to peak as well. Each outer pass
/// tightens `r ← max(r², R)` toward the configured floor.
pub struct CsmOn {
    budget: usize,
    relaxation_floor: f64,
    min_estimated_fitness: f64,
    samples: Vec<(f64, f64)>,
}

impl CsmOn {
    /// Create a CSMOn controller.
    ///
    /// `budget` is the evaluation allowance per engine iteration,
    /// `relaxation_floor` the acceptance factor in `(0, 1)` (larger stops
    /// sooner), `min_estimated_fitness` the problem's estimated lower bound.
    pub fn new(budget: usize, relaxation_floor: f64, min_estimated_fitness: f64) -> Result<Self> {
        if budget == 0 {
            return Err(TesoroError::InvalidParameter {
                name: "budget",
                value: 0.0,
            });
        }
        if !(relaxation_floor > 0.0 && relaxation_floor < 1.0) {
            return Err(TesoroError::InvalidParameter {
                name: "relaxation_floor",
                value: relaxation_floor,
            });
        }
        Ok(Self {
            budget,
            relaxation_floor,
            min_estimated_fitness,
            samples: Vec::new(),
        })
    }

    /// Sample up to `count` further improvements from the search.
    fn sample(
        &mut self,
        search: &mut dyn Search,
        ctx: &mut SearchContext<'_>,
        count: usize,
    ) -> Result<()> {
        for _ in 0..count {
            if search.evals() >= self.budget || search.is_stuck() {
                break;
            }
            search.next(ctx, self.budget)?;
            let best = search.best_index();
            let y = ctx.population[best].fitness().first();
            self.samples.push((search.evals() as f64, y));
        }
        Ok(())
    }

    /// Exponential-regime residual of the newest sample.
    fn decay_e(&self) -> f64 {
        let s = self.samples.len() - 1;
        let num = self.samples[s].1 - self.min_estimated_fitness;
        let den = self.samples[s - 1].1 - self.min_estimated_fitness;
        (1.0 - num / den).abs()
    }

    /// Linear-regime residual of the newest sample.
    fn decay_l(&self) -> f64 {
        let s = self.samples.len() - 1;
        let num = self.samples[s].1 - self.samples[s - 1].1;
        let den = self.samples[s - 1].1 - self.samples[s - 2].1;
        (1.0 - num / den).abs()
    }

    /// Intercept of the linear regression of `ln y` on `x` over `[p1..=p2]`.
    fn alpha_e(&self, p1: usize, p2: usize) -> f64 {
        let n = (p2 - p1 + 1) as f64;
        let window = &self.samples[p1..=p2];
        let mut x_sum = 0.0;
        let mut ln_sum = 0.0;
        for &(x, y) in window {
            x_sum += x;
            ln_sum += y.ln();
        }
        let x_avg = x_sum / n;
        let ln_avg = ln_sum / n;
        let mut s1 = 0.0;
        let mut s2 = 0.0;
        for &(x, y) in window {
            let dx = x - x_avg;
            s1 += dx * (y.ln() - ln_avg);
            s2 += dx * dx;
        }
        if s2 == 0.0 {
            return ln_avg;
        }
        (ln_sum - (s1 / s2) * x_sum) / n
    }

    /// Intercept of the linear regression of `log₁₀ y` on `log₁₀ x` over
    /// `[p1..=p2]`.
    fn alpha_p(&self, p1: usize, p2: usize) -> f64 {
        let n = (p2 - p1 + 1) as f64;
        let window = &self.samples[p1..=p2];
        let mut lx_sum = 0.0;
        let mut ly_sum = 0.0;
        for &(x, y) in window {
            lx_sum += x.log10();
            ly_sum += y.log10();
        }
        let lx_avg = lx_sum / n;
        let ly_avg = ly_sum / n;
        let mut s1 = 0.0;
        let mut s2 = 0.0;
        for &(x, y) in window {
            let dx = x.log10() - lx_avg;
            s1 += dx * (y.log10() - ly_avg);
            s2 += dx * dx;
        }
        if s2 == 0.0 {
            return ly_avg;
        }
        (ly_sum - (s1 / s2) * lx_sum) / n
    }

    /// Exponential phase: find the point `pT` where the exponential fit
    /// stabilises, or `None` if the budget intervenes before a fit.
    fn adjust_exp(
        &mut self,
        search: &mut dyn Search,
        ctx: &mut SearchContext<'_>,
        r: f64,
    ) -> Result<Option<usize>> {
        let len_before = self.samples.len();
        self.sample(search, ctx, 2)?;
        if self.samples.len() < len_before + 2 {
            return Ok(None);
        }
        let mut p_b: Option<usize> = None;
        let mut alpha_prev = 0.0;
        let mut alpha_curr = 0.0;
        while search.evals() < self.budget && !search.is_stuck() {
            if self.decay_e() < r && self.decay_l() < r {
                let s = self.samples.len() - 1;
                match p_b {
                    None => {
                        p_b = Some(s - 2);
                        alpha_curr = self.alpha_e(s - 2, s);
                    }
                    Some(pb) => {
                        alpha_prev = alpha_curr;
                        alpha_curr = self.alpha_e(pb, s);
                        if alpha_curr < alpha_prev {
                            return Ok(Some(s));
                        }
                    }
                }
            } else {
                p_b = None;
            }
            self.sample(search, ctx, 1)?;
        }
        Ok(None)
    }

    /// Power-law phase: find the point `pS` where the power-law fit
    /// stabilises, abandoning if either decay residual rises above `r`.
    fn adjust_log(
        &mut self,
        search: &mut dyn Search,
        ctx: &mut SearchContext<'_>,
        r: f64,
        p_t: usize,
    ) -> Result<Option<usize>> {
        let len_before = self.samples.len();
        self.sample(search, ctx, 3)?;
        if self.samples.len() < len_before + 3 {
            return Ok(None);
        }
        let s = self.samples.len() - 1;
        let mut alpha_prev = self.alpha_p(p_t, s - 1);
        let mut alpha_curr = self.alpha_p(p_t, s);
        while alpha_curr >= alpha_prev && search.evals() < self.budget && !search.is_stuck() {
            if self.decay_e() >= r || self.decay_l() >= r {
                return Ok(None);
            }
            self.sample(search, ctx, 1)?;
            alpha_prev = alpha_curr;
            alpha_curr = self.alpha_p(p_t, self.samples.len() - 1);
        }
        Ok(Some(self.samples.len() - 1))
    }
}

impl ConvergenceControl for CsmOn {
    fn budget(&self) -> usize {
        self.budget
    }

    fn run(&mut self, search: &mut dyn Search, ctx: &mut SearchContext<'_>) -> Result<()> {
        self.samples.clear();
        search.startup(ctx)?;

        let mut p_t: Option<usize> = None;
        let mut p_s: Option<usize> = None;
        let mut r = 0.99_f64;
        self.sample(search, ctx, 1)?;
        loop {
            r = (r * r).max(self.relaxation_floor);
            if p_s.is_none() {
                p_t = self.adjust_exp(search, ctx, r)?;
            }
            if let Some(pt) = p_t.filter(|&pt| pt > 0) {
                p_s = self.adjust_log(search, ctx, r, pt)?;
            }
            let keep_going = search.evals() < self.budget
                && (r > self.relaxation_floor || p_s.is_none())
                && !search.is_stuck();
            if !keep_going {
                break;
            }
        }
        trace!(
            evals = search.evals(),
            samples = self.samples.len(),
            stuck = search.is_stuck(),
            "convergence control finished"
        );
        search.finalize(ctx);
        Ok(())
    }
}
