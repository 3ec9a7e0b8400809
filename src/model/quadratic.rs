// Copyright © 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Separable box-constrained quadratic model with a closed-form solve.
//!
//! Scenario `s` minimises, per nonant `i`,
//!
//! ```text
//! 0.5 q x^2 + c x  [+ W x]  [+ rho/2 (x - xbar)^2]   over lo <= x <= hi
//! ```
//!
//! The minimiser is the unconstrained stationary point clamped to the box,
//! so every solve is exact and cheap. A scenario whose box is empty
//! (`lo > hi`) is infeasible and reported as a failure.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::info;

use crate::capability::{
    ScenarioBuilder, ScenarioFailure, SolveReport, SolveRequest, SubproblemSolver,
};
use crate::config::SpokeConfig;
use crate::error::{BuildError, SolveError};
use crate::types::{NonantIndex, NonantSlot, Scenario};

/// Coefficients of one nonant term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    pub q: f64,
    pub c: f64,
    pub lo: f64,
    pub hi: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioData {
    pub name: String,
    pub probability: f64,
    pub terms: Vec<Term>,
}

/// Cheap to clone; builder and solver clones share the same data.
#[derive(Debug, Clone)]
pub struct QuadraticBoxModel {
    scenarios: Arc<Vec<ScenarioData>>,
    default_rho: f64,
}

impl QuadraticBoxModel {
    pub fn new(scenarios: Vec<ScenarioData>, default_rho: f64) -> Self {
        Self { scenarios: Arc::new(scenarios), default_rho }
    }

    /// Equiprobable scenarios with ChaCha8-seeded coefficients:
    /// `q` in [0.5, 2), `c` in [-5, 5), box [0, 10].
    pub fn random(scenario_count: usize, nonant_count: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let probability = 1.0 / scenario_count.max(1) as f64;
        let scenarios = (0..scenario_count)
            .map(|s| ScenarioData {
                name: format!("scen{}", s),
                probability,
                terms: (0..nonant_count)
                    .map(|_| Term {
                        q: rng.gen_range(0.5..2.0),
                        c: rng.gen_range(-5.0..5.0),
                        lo: 0.0,
                        hi: 10.0,
                    })
                    .collect(),
            })
            .collect();
        Self::new(scenarios, 1.0)
    }

    pub fn data(&self) -> &[ScenarioData] {
        &self.scenarios
    }

    fn lookup(&self, name: &str) -> Option<&ScenarioData> {
        self.scenarios.iter().find(|d| d.name == name)
    }

    /// Solve one scenario in place, returning its objective.
    pub fn solve_scenario(
        &self,
        scenario: &mut Scenario,
        w_enabled: bool,
        prox_enabled: bool,
    ) -> Result<f64, String> {
        let data = self
            .lookup(&scenario.name)
            .ok_or_else(|| format!("no model data for {}", scenario.name))?;
        let mut objective = 0.0;
        for (index, slot) in scenario.nonants.iter_mut() {
            let term = data
                .terms
                .get(index.slot as usize)
                .ok_or_else(|| format!("no term for {}", index))?;
            if term.lo > term.hi {
                return Err(format!("empty box for {}: [{}, {}]", index, term.lo, term.hi));
            }
            let w = if w_enabled { slot.w } else { 0.0 };
            let (curv, lin) = if prox_enabled {
                (term.q + slot.rho, term.c + w - slot.rho * slot.xbar)
            } else {
                (term.q, term.c + w)
            };
            let x = (-lin / curv).clamp(term.lo, term.hi);
            slot.value = x;
            objective += 0.5 * term.q * x * x + term.c * x + w * x;
            if prox_enabled {
                objective += 0.5 * slot.rho * (x - slot.xbar).powi(2);
            }
        }
        Ok(objective)
    }
}

impl ScenarioBuilder for QuadraticBoxModel {
    fn build_scenarios(&mut self, _config: &SpokeConfig) -> Result<Vec<Scenario>, BuildError> {
        if self.scenarios.is_empty() {
            return Err(BuildError("model has no scenarios".into()));
        }
        Ok(self
            .scenarios
            .iter()
            .map(|d| {
                let mut scenario = Scenario::new(d.name.clone(), d.probability);
                for (i, term) in d.terms.iter().enumerate() {
                    let slot = NonantSlot { value: term.lo, ..NonantSlot::with_rho(self.default_rho) };
                    scenario.nonants.insert(NonantIndex::root(i as u32), slot);
                }
                scenario
            })
            .collect())
    }

    fn attach_solvers(&mut self, scenarios: &mut [Scenario]) -> Result<(), BuildError> {
        for scenario in scenarios.iter() {
            let data = self
                .lookup(&scenario.name)
                .ok_or_else(|| BuildError(format!("no model data for {}", scenario.name)))?;
            if data.terms.iter().any(|t| t.q <= 0.0) {
                return Err(BuildError(format!("{} is not strictly convex", scenario.name)));
            }
        }
        Ok(())
    }
}

impl SubproblemSolver for QuadraticBoxModel {
    fn solve(
        &mut self,
        scenarios: &mut [Scenario],
        request: &SolveRequest<'_>,
    ) -> Result<SolveReport, SolveError> {
        let mut report = SolveReport::default();
        for scenario in scenarios.iter_mut() {
            match self.solve_scenario(scenario, request.w_enabled, request.prox_enabled) {
                Ok(objective) => {
                    scenario.objective = Some(objective);
                    if request.tee {
                        info!(iteration = request.iteration, scenario = %scenario.name, objective, "solved");
                    }
                }
                Err(reason) => report.failures.push(ScenarioFailure {
                    scenario: scenario.name.clone(),
                    reason,
                }),
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverOptions;

    fn one_term(q: f64, c: f64, lo: f64, hi: f64) -> QuadraticBoxModel {
        QuadraticBoxModel::new(
            vec![ScenarioData { name: "s".into(), probability: 1.0, terms: vec![Term { q, c, lo, hi }] }],
            1.0,
        )
    }

    fn request(options: &SolverOptions) -> SolveRequest<'_> {
        SolveRequest {
            iteration: 0,
            options,
            tee: false,
            verbose: false,
            gripe: true,
            w_enabled: true,
            prox_enabled: false,
        }
    }

    #[test]
    fn interior_minimiser() {
        let mut m = one_term(2.0, -4.0, 0.0, 10.0);
        let mut s = m.build_scenarios(&SpokeConfig::default()).expect("test: build");
        let opts = SolverOptions::new();
        let report = m.solve(&mut s, &request(&opts)).expect("test: solve");
        assert!(report.is_clean());
        assert_eq!(s[0].value(&NonantIndex::root(0)), Some(2.0));
        // 0.5*2*4 - 8
        assert_eq!(s[0].objective, Some(-4.0));
    }

    #[test]
    fn minimiser_clamped_to_box() {
        let mut m = one_term(1.0, -50.0, 0.0, 10.0);
        let mut s = m.build_scenarios(&SpokeConfig::default()).expect("test: build");
        let opts = SolverOptions::new();
        m.solve(&mut s, &request(&opts)).expect("test: solve");
        assert_eq!(s[0].value(&NonantIndex::root(0)), Some(10.0));
    }

    #[test]
    fn w_term_shifts_solution() {
        let mut m = one_term(1.0, -4.0, -10.0, 10.0);
        let mut s = m.build_scenarios(&SpokeConfig::default()).expect("test: build");
        s[0].nonants.get_mut(&NonantIndex::root(0)).expect("test: slot").w = 2.0;
        let opts = SolverOptions::new();
        m.solve(&mut s, &request(&opts)).expect("test: solve");
        assert_eq!(s[0].value(&NonantIndex::root(0)), Some(2.0));
        // 0.5*4 - 8 + 4
        assert_eq!(s[0].objective, Some(-2.0));
    }

    #[test]
    fn prox_pulls_toward_xbar() {
        let m = one_term(1.0, 0.0, -10.0, 10.0);
        let mut s = Scenario::new("s", 1.0).with_nonant(
            NonantIndex::root(0),
            NonantSlot { value: 0.0, rho: 1.0, w: 0.0, xbar: 4.0 },
        );
        m.solve_scenario(&mut s, true, true).expect("test: solve");
        assert_eq!(s.value(&NonantIndex::root(0)), Some(2.0));
    }

    #[test]
    fn empty_box_is_a_reported_failure() {
        let mut m = one_term(1.0, 0.0, 5.0, 1.0);
        let mut s = m.build_scenarios(&SpokeConfig::default()).expect("test: build");
        let opts = SolverOptions::new();
        let report = m.solve(&mut s, &request(&opts)).expect("test: solve");
        assert_eq!(report.failures.len(), 1);
        assert!(s[0].objective.is_none());
    }

    #[test]
    fn nonconvex_term_rejected_at_attach() {
        let mut m = one_term(0.0, 1.0, 0.0, 1.0);
        let mut s = m.build_scenarios(&SpokeConfig::default()).expect("test: build");
        assert!(m.attach_solvers(&mut s).is_err());
    }

    #[test]
    fn random_model_is_seed_deterministic() {
        let a = QuadraticBoxModel::random(4, 3, 42);
        let b = QuadraticBoxModel::random(4, 3, 42);
        let c = QuadraticBoxModel::random(4, 3, 43);
        assert_eq!(a.data(), b.data());
        assert_ne!(a.data(), c.data());
        assert_eq!(a.data().len(), 4);
        assert!((a.data().iter().map(|d| d.probability).sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
