// Copyright © 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Subproblem solve and expected-objective bound.

use tracing::{debug, warn};

use crate::capability::{SolveReport, SolveRequest, SubproblemSolver};
use crate::error::{BoundError, SolveError};
use crate::types::Scenario;

pub struct BoundComputer {
    solver: Box<dyn SubproblemSolver + Send>,
}

impl BoundComputer {
    pub fn new(solver: Box<dyn SubproblemSolver + Send>) -> Self {
        Self { solver }
    }

    /// Run the solver over every scenario. Per-scenario failures are logged
    /// when `request.gripe` is set and returned in the report; only a fatal
    /// solver condition is an error.
    pub fn solve(
        &mut self,
        scenarios: &mut [Scenario],
        request: &SolveRequest<'_>,
    ) -> Result<SolveReport, SolveError> {
        for scenario in scenarios.iter_mut() {
            scenario.objective = None;
        }
        let report = self.solver.solve(scenarios, request)?;
        if request.gripe {
            for failure in &report.failures {
                warn!(
                    iteration = request.iteration,
                    scenario = %failure.scenario,
                    reason = %failure.reason,
                    "subproblem solve failed"
                );
            }
        }
        Ok(report)
    }

    /// Probability-weighted sum of solved objectives. Unsolved scenarios
    /// contribute nothing; if none solved there is no bound.
    pub fn compute_bound(&self, scenarios: &[Scenario], iteration: u64) -> Result<f64, BoundError> {
        let mut solved = 0usize;
        let mut bound = 0.0;
        for scenario in scenarios {
            if let Some(obj) = scenario.objective {
                bound += scenario.probability * obj;
                solved += 1;
            }
        }
        if solved == 0 {
            return Err(BoundError::NoSolvedScenarios(iteration));
        }
        debug!(iteration, solved, total = scenarios.len(), bound, "computed bound");
        Ok(bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ScenarioFailure;
    use crate::config::SolverOptions;

    /// Assigns objective = 10 * index, failing the scenarios listed.
    struct FixedSolver {
        fail: Vec<&'static str>,
        fatal: bool,
    }

    impl SubproblemSolver for FixedSolver {
        fn solve(
            &mut self,
            scenarios: &mut [Scenario],
            _request: &SolveRequest<'_>,
        ) -> Result<SolveReport, SolveError> {
            if self.fatal {
                return Err(SolveError::Fatal("license lost".into()));
            }
            let mut report = SolveReport::default();
            for (i, s) in scenarios.iter_mut().enumerate() {
                if self.fail.contains(&s.name.as_str()) {
                    report.failures.push(ScenarioFailure {
                        scenario: s.name.clone(),
                        reason: "infeasible".into(),
                    });
                } else {
                    s.objective = Some(10.0 * (i + 1) as f64);
                }
            }
            Ok(report)
        }
    }

    fn request(options: &SolverOptions) -> SolveRequest<'_> {
        SolveRequest {
            iteration: 1,
            options,
            tee: false,
            verbose: false,
            gripe: true,
            w_enabled: true,
            prox_enabled: false,
        }
    }

    fn scenarios() -> Vec<Scenario> {
        vec![Scenario::new("a", 0.5), Scenario::new("b", 0.25), Scenario::new("c", 0.25)]
    }

    #[test]
    fn bound_is_expected_objective() {
        let opts = SolverOptions::new();
        let mut bc = BoundComputer::new(Box::new(FixedSolver { fail: vec![], fatal: false }));
        let mut s = scenarios();
        let report = bc.solve(&mut s, &request(&opts)).expect("test: solve");
        assert!(report.is_clean());
        // 0.5*10 + 0.25*20 + 0.25*30
        assert_eq!(bc.compute_bound(&s, 1), Ok(17.5));
    }

    #[test]
    fn failures_are_reported_not_fatal() {
        let opts = SolverOptions::new();
        let mut bc = BoundComputer::new(Box::new(FixedSolver { fail: vec!["b"], fatal: false }));
        let mut s = scenarios();
        let report = bc.solve(&mut s, &request(&opts)).expect("test: solve");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].scenario, "b");
        assert_eq!(bc.compute_bound(&s, 1), Ok(12.5));
    }

    #[test]
    fn stale_objectives_are_cleared_before_solve() {
        let opts = SolverOptions::new();
        let mut bc = BoundComputer::new(Box::new(FixedSolver { fail: vec!["a", "b", "c"], fatal: false }));
        let mut s = scenarios();
        for sc in s.iter_mut() {
            sc.objective = Some(99.0);
        }
        bc.solve(&mut s, &request(&opts)).expect("test: solve");
        assert_eq!(bc.compute_bound(&s, 4), Err(BoundError::NoSolvedScenarios(4)));
    }

    #[test]
    fn fatal_condition_propagates() {
        let opts = SolverOptions::new();
        let mut bc = BoundComputer::new(Box::new(FixedSolver { fail: vec![], fatal: true }));
        let mut s = scenarios();
        assert!(matches!(bc.solve(&mut s, &request(&opts)), Err(SolveError::Fatal(_))));
    }
}
