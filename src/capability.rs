// Copyright © 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Capability interfaces consumed by the spoke controller.
//!
//! The controller never builds models, solves subproblems, or talks to the
//! hub itself; it drives these collaborators in a fixed order.

use std::collections::BTreeMap;
use std::io;

use crate::cache::NonantPush;
use crate::config::{SolverOptions, SpokeConfig};
use crate::error::{BuildError, SolveError};
use crate::types::{BoundRecord, NonantIndex, Scenario};

/// Per-nonant central estimate across local scenarios (xbar).
pub type ReferencePoint = BTreeMap<NonantIndex, f64>;

// ---------------------------------------------------------------------------
// Model / scenario builder
// ---------------------------------------------------------------------------

pub trait ScenarioBuilder {
    fn build_scenarios(&mut self, config: &SpokeConfig) -> Result<Vec<Scenario>, BuildError>;

    fn attach_solvers(&mut self, scenarios: &mut [Scenario]) -> Result<(), BuildError>;
}

// ---------------------------------------------------------------------------
// Solve
// ---------------------------------------------------------------------------

/// Everything the solver needs to know about one solve pass.
#[derive(Debug, Clone)]
pub struct SolveRequest<'a> {
    pub iteration: u64,
    pub options: &'a SolverOptions,
    /// Echo solver output.
    pub tee: bool,
    pub verbose: bool,
    /// Report infeasible or unsolved subproblems instead of ignoring them.
    pub gripe: bool,
    /// Include the `W x` term in each subproblem objective.
    pub w_enabled: bool,
    /// Include the proximal `rho/2 (x - xbar)^2` term.
    pub prox_enabled: bool,
}

/// A subproblem that did not produce a usable objective.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioFailure {
    pub scenario: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveReport {
    pub failures: Vec<ScenarioFailure>,
}

impl SolveReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Solves every local subproblem, writing each scenario's `objective` and
/// nonant `value`s. Per-scenario failures go in the report with
/// `objective = None`; only an unrecoverable condition is an `Err`.
pub trait SubproblemSolver {
    fn solve(
        &mut self,
        scenarios: &mut [Scenario],
        request: &SolveRequest<'_>,
    ) -> Result<SolveReport, SolveError>;
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

pub trait Aggregator {
    fn central_estimate(&self, scenarios: &[Scenario], verbose: bool) -> ReferencePoint;

    fn update_dual_weights(
        &self,
        scenarios: &mut [Scenario],
        reference: &ReferencePoint,
        verbose: bool,
    );
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Hub-facing exchange. Every method is a non-blocking poll or a send.
pub trait Transport {
    fn poll_shared_values(&mut self) -> Option<NonantPush>;

    fn poll_cancellation(&mut self) -> bool;

    fn publish_bound(&mut self, record: BoundRecord);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Weights,
    ReferencePoint,
}

pub trait RecordSink {
    fn append_record(
        &mut self,
        kind: RecordKind,
        iteration: u64,
        scenarios: &[Scenario],
    ) -> io::Result<()>;
}

// ---------------------------------------------------------------------------
// Rho setter
// ---------------------------------------------------------------------------

/// Supplies initial per-nonant rho values for a scenario.
pub trait RhoSetter {
    fn initial_rho(&self, scenario: &Scenario) -> Vec<(NonantIndex, f64)>;
}

impl<F> RhoSetter for F
where
    F: Fn(&Scenario) -> Vec<(NonantIndex, f64)>,
{
    fn initial_rho(&self, scenario: &Scenario) -> Vec<(NonantIndex, f64)> {
        self(scenario)
    }
}
