// Copyright © 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Lagrangian outer-bound spoke controller.
//!
//! Takes x values pushed by the hub, updates its own W, and reports the
//! resulting Lagrangian bound each pass:
//!
//! ```text
//! prepare -> trivial bound (iteration 0) -> iterate(1), iterate(2), ...
//!         -> kill signal seen at an iteration boundary -> finalize
//! ```
//!
//! Each pass runs in a fixed order: rho rescale, cache drain, xbar, W update,
//! optional persistence, solve, bound. The kill signal is polled only
//! between passes, so a pass that has started always completes.

use tracing::{debug, info, warn};

use crate::bound::BoundComputer;
use crate::cache::NonantCache;
use crate::capability::{
    Aggregator, RecordKind, RecordSink, RhoSetter, ScenarioBuilder, SolveRequest,
    SubproblemSolver, Transport,
};
use crate::config::{SolverOptions, SpokeConfig};
use crate::error::{SpokeError, SpokeResult};
use crate::persist::CsvRecordSink;
use crate::rescale::RhoRescaleSchedule;
use crate::types::{BoundRecord, Scenario, SpokeKind, SpokeState};
use crate::weights::WeightUpdater;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// External capabilities the controller drives.
pub struct Collaborators {
    pub builder: Box<dyn ScenarioBuilder + Send>,
    pub solver: Box<dyn SubproblemSolver + Send>,
    pub aggregator: Box<dyn Aggregator + Send>,
    pub transport: Box<dyn Transport + Send>,
    /// Overrides the CSV sink created when persistence is configured.
    pub record_sink: Option<Box<dyn RecordSink + Send>>,
    pub rho_setter: Option<Box<dyn RhoSetter + Send>>,
}

// ---------------------------------------------------------------------------
// LagrangerSpoke
// ---------------------------------------------------------------------------

pub struct LagrangerSpoke {
    config: SpokeConfig,
    state: SpokeState,
    prepared: bool,

    builder: Box<dyn ScenarioBuilder + Send>,
    transport: Box<dyn Transport + Send>,
    record_sink: Option<Box<dyn RecordSink + Send>>,
    rho_setter: Option<Box<dyn RhoSetter + Send>>,

    weights: WeightUpdater,
    bounds: BoundComputer,
    cache: NonantCache,
    schedule: RhoRescaleSchedule,
    scenarios: Vec<Scenario>,

    // Iteration 0 uses iter0 options, everything after uses iterk.
    use_iterk_options: bool,
    // Next iteration number to run.
    next_iteration: u64,

    bound: Option<BoundRecord>,
    trivial_bound: Option<BoundRecord>,
    final_bound: Option<BoundRecord>,
}

impl LagrangerSpoke {
    pub const KIND: SpokeKind = SpokeKind::LagrangerOuterBound;

    pub fn new(collaborators: Collaborators) -> Self {
        let Collaborators { builder, solver, aggregator, transport, record_sink, rho_setter } =
            collaborators;
        Self {
            config: SpokeConfig::default(),
            state: SpokeState::Preparing,
            prepared: false,
            builder,
            transport,
            record_sink,
            rho_setter,
            weights: WeightUpdater::new(aggregator),
            bounds: BoundComputer::new(solver),
            cache: NonantCache::new(),
            schedule: RhoRescaleSchedule::empty(),
            scenarios: Vec::new(),
            use_iterk_options: false,
            next_iteration: 1,
            bound: None,
            trivial_bound: None,
            final_bound: None,
        }
    }

    // -- Accessors -----------------------------------------------------------

    pub fn state(&self) -> SpokeState {
        self.state
    }

    pub fn config(&self) -> &SpokeConfig {
        &self.config
    }

    pub fn bound(&self) -> Option<BoundRecord> {
        self.bound
    }

    pub fn trivial_bound(&self) -> Option<BoundRecord> {
        self.trivial_bound
    }

    pub fn final_bound(&self) -> Option<BoundRecord> {
        self.final_bound
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Handle for an external writer; clones share the same cache.
    pub fn cache(&self) -> NonantCache {
        self.cache.clone()
    }

    pub fn schedule(&self) -> &RhoRescaleSchedule {
        &self.schedule
    }

    /// Iteration number the next pass (loop or finalize) will use.
    pub fn next_iteration(&self) -> u64 {
        self.next_iteration
    }

    pub fn cumulative_rho_scale(&self) -> f64 {
        self.weights.cumulative_rho_scale()
    }

    // -- Lifecycle -----------------------------------------------------------

    /// One-time setup. The rescale schedule is loaded before anything is
    /// built so a bad schedule stops the spoke without side effects.
    pub fn prepare(&mut self, config: SpokeConfig) -> SpokeResult<()> {
        if self.prepared || self.state != SpokeState::Preparing {
            return Err(SpokeError::AlreadyPrepared);
        }

        self.schedule = RhoRescaleSchedule::load_optional(config.rescale_schedule_source.as_deref())?;

        let mut scenarios = self.builder.build_scenarios(&config)?;
        self.builder.attach_solvers(&mut scenarios)?;

        if let Some(setter) = &self.rho_setter {
            for scenario in scenarios.iter_mut() {
                for (index, rho) in setter.initial_rho(scenario) {
                    if let Some(slot) = scenario.nonants.get_mut(&index) {
                        slot.rho = rho;
                    }
                }
            }
        }

        if self.record_sink.is_none() && config.persistence_enabled() {
            self.record_sink = Some(Box::new(CsvRecordSink::new(config.output_dir.clone())));
        }

        self.cache.seed_from(&scenarios);
        self.scenarios = scenarios;
        self.config = config;
        self.prepared = true;
        self.state = SpokeState::Iterating;

        info!(
            kind = %Self::KIND.converger_char(),
            scenarios = self.scenarios.len(),
            rescale_entries = self.schedule.len(),
            "spoke prepared"
        );
        Ok(())
    }

    /// Prepare, compute the trivial bound, then iterate until the hub sends
    /// the kill signal. Returns the last loop bound; call
    /// [`finalize`](Self::finalize) afterwards for the final pass.
    pub fn run(&mut self, config: SpokeConfig) -> SpokeResult<f64> {
        self.prepare(config)?;

        let trivial = self.trivial_pass()?;
        let record = BoundRecord { iteration: 0, value: trivial };
        self.trivial_bound = Some(record);
        self.record_bound(record);
        info!(bound = trivial, "trivial bound");

        self.use_iterk_options = true;
        self.next_iteration = 1;

        loop {
            if self.transport.poll_cancellation() {
                break;
            }
            self.receive();
            let iteration = self.next_iteration;
            match self.iterate(iteration) {
                Ok(value) => debug!(iteration, bound = value, "iteration complete"),
                Err(SpokeError::Bound(err)) => {
                    warn!(iteration, error = %err, "no bound this iteration, keeping previous");
                }
                Err(err) => return Err(err),
            }
        }

        self.state = SpokeState::Finalizing;
        info!(iterations = self.next_iteration - 1, "kill signal received");
        Ok(self.bound.map(|b| b.value).unwrap_or(trivial))
    }

    /// [`run`](Self::run) followed by [`finalize`](Self::finalize).
    pub fn run_to_completion(&mut self, config: SpokeConfig) -> SpokeResult<BoundRecord> {
        self.run(config)?;
        let iteration = self.next_iteration;
        let value = self.finalize()?;
        Ok(BoundRecord { iteration, value })
    }

    /// Iteration-0 bound from the freshly prepared solver state: no rescale,
    /// no cache drain, no W update.
    fn trivial_pass(&mut self) -> SpokeResult<f64> {
        self.solve_and_bound(0)
    }

    /// One full pass with the given iteration number. A successful pass
    /// records and publishes its bound. Once the pass has solved, with or
    /// without a bound, `next_iteration` moves past it.
    pub fn iterate(&mut self, iteration: u64) -> SpokeResult<f64> {
        if !matches!(self.state, SpokeState::Iterating | SpokeState::Finalizing) {
            return Err(SpokeError::InvalidState { op: "iterate", state: self.state });
        }
        let verbose = self.config.verbose;

        if let Some(factor) = self.schedule.lookup(iteration) {
            self.weights.rescale_rho(&mut self.scenarios, factor);
        }

        // Work with the nonants we have, which may still be the prepare snapshot.
        let drained = self.cache.drain_into(&mut self.scenarios);
        debug!(iteration, generation = drained.generation, applied = drained.applied, "drained nonant cache");

        let xbar = self.weights.compute_xbar(&mut self.scenarios, verbose);
        self.weights.update_weights(&mut self.scenarios, &xbar, verbose);

        self.write_records(iteration)?;

        let result = self.solve_and_bound(iteration);
        if matches!(result, Ok(_) | Err(SpokeError::Bound(_))) {
            self.next_iteration = iteration + 1;
        }
        let value = result?;
        self.record_bound(BoundRecord { iteration, value });
        Ok(value)
    }

    /// Final pass after the kill signal, using the next iteration number.
    /// Sets both `bound` and `final_bound`. A failed pass is returned as an
    /// error; the previous bound is never reported as final.
    pub fn finalize(&mut self) -> SpokeResult<f64> {
        if !matches!(self.state, SpokeState::Iterating | SpokeState::Finalizing) {
            return Err(SpokeError::InvalidState { op: "finalize", state: self.state });
        }
        self.state = SpokeState::Finalizing;
        self.use_iterk_options = true;
        self.receive();

        let iteration = self.next_iteration;
        let result = self.iterate(iteration);
        self.state = SpokeState::Stopped;

        let value = result?;
        self.final_bound = Some(BoundRecord { iteration, value });
        info!(iteration, bound = value, "final bound");
        Ok(value)
    }

    // -- Internals -----------------------------------------------------------

    fn receive(&mut self) {
        if let Some(push) = self.transport.poll_shared_values() {
            let generation = self.cache.store(push);
            debug!(generation, "stored shared values from hub");
        }
    }

    fn solver_options(&self) -> &SolverOptions {
        if self.use_iterk_options {
            &self.config.iterk_solver_options
        } else {
            &self.config.iter0_solver_options
        }
    }

    fn solve_and_bound(&mut self, iteration: u64) -> SpokeResult<f64> {
        let options = self.solver_options().clone();
        let request = SolveRequest {
            iteration,
            options: &options,
            tee: self.config.effective_solver_trace(),
            verbose: self.config.verbose,
            gripe: true,
            w_enabled: true,
            prox_enabled: false,
        };
        let report = self.bounds.solve(&mut self.scenarios, &request)?;
        if !report.is_clean() {
            warn!(iteration, failed = report.failures.len(), "bound uses partial results");
        }
        Ok(self.bounds.compute_bound(&self.scenarios, iteration)?)
    }

    fn write_records(&mut self, iteration: u64) -> SpokeResult<()> {
        let Some(sink) = self.record_sink.as_mut() else {
            return Ok(());
        };
        if self.config.write_weights {
            sink.append_record(RecordKind::Weights, iteration, &self.scenarios)?;
        }
        if self.config.write_reference_point {
            sink.append_record(RecordKind::ReferencePoint, iteration, &self.scenarios)?;
        }
        Ok(())
    }

    fn record_bound(&mut self, record: BoundRecord) {
        self.bound = Some(record);
        self.transport.publish_bound(record);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
