// Copyright © 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Rho rescaling, xbar computation and W updates.
//!
//! Rescale factors accumulate: applying 0.5 and later 2.0 returns every rho
//! to where it started. Nothing is ever normalised against a baseline.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::capability::{Aggregator, ReferencePoint};
use crate::types::Scenario;

// ---------------------------------------------------------------------------
// WeightUpdater
// ---------------------------------------------------------------------------

pub struct WeightUpdater {
    aggregator: Box<dyn Aggregator + Send>,
    cumulative_rho_scale: f64,
}

impl WeightUpdater {
    pub fn new(aggregator: Box<dyn Aggregator + Send>) -> Self {
        Self { aggregator, cumulative_rho_scale: 1.0 }
    }

    /// Product of every factor applied so far.
    pub fn cumulative_rho_scale(&self) -> f64 {
        self.cumulative_rho_scale
    }

    /// Multiply every scenario's rho, per nonant, by `factor` in place.
    pub fn rescale_rho(&mut self, scenarios: &mut [Scenario], factor: f64) {
        for scenario in scenarios.iter_mut() {
            for slot in scenario.nonants.values_mut() {
                slot.rho *= factor;
            }
        }
        self.cumulative_rho_scale *= factor;
        info!(
            factor,
            cumulative = self.cumulative_rho_scale,
            "rescaled rho"
        );
    }

    /// Compute xbar and record it on every scenario slot.
    pub fn compute_xbar(&self, scenarios: &mut [Scenario], verbose: bool) -> ReferencePoint {
        let xbar = self.aggregator.central_estimate(scenarios, verbose);
        for scenario in scenarios.iter_mut() {
            for (index, slot) in scenario.nonants.iter_mut() {
                if let Some(v) = xbar.get(index) {
                    slot.xbar = *v;
                }
            }
        }
        if verbose {
            info!(nonants = xbar.len(), "computed xbar");
        } else {
            debug!(nonants = xbar.len(), "computed xbar");
        }
        xbar
    }

    pub fn update_weights(
        &self,
        scenarios: &mut [Scenario],
        reference: &ReferencePoint,
        verbose: bool,
    ) {
        self.aggregator.update_dual_weights(scenarios, reference, verbose);
        if verbose {
            let norm: f64 = scenarios
                .iter()
                .flat_map(|s| s.nonants.values())
                .map(|slot| slot.w.abs())
                .sum();
            info!(w_l1 = norm, "updated W");
        }
    }
}

// ---------------------------------------------------------------------------
// StandardAggregator
// ---------------------------------------------------------------------------

/// Probability-weighted xbar and the classic dual ascent step
/// `W += rho * (x - xbar)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAggregator;

impl Aggregator for StandardAggregator {
    fn central_estimate(&self, scenarios: &[Scenario], _verbose: bool) -> ReferencePoint {
        // (weighted sum, total probability) per index
        let mut acc: BTreeMap<_, (f64, f64)> = BTreeMap::new();
        for scenario in scenarios {
            for (index, slot) in &scenario.nonants {
                let e = acc.entry(index.clone()).or_insert((0.0, 0.0));
                e.0 += scenario.probability * slot.value;
                e.1 += scenario.probability;
            }
        }
        acc.into_iter()
            .filter(|(_, (_, p))| *p > 0.0)
            .map(|(index, (sum, p))| (index, sum / p))
            .collect()
    }

    fn update_dual_weights(
        &self,
        scenarios: &mut [Scenario],
        reference: &ReferencePoint,
        _verbose: bool,
    ) {
        for scenario in scenarios.iter_mut() {
            for (index, slot) in scenario.nonants.iter_mut() {
                if let Some(xbar) = reference.get(index) {
                    slot.w += slot.rho * (slot.value - xbar);
                }
            }
        }
    }
}
