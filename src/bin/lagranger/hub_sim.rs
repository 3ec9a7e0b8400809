// Synthetic PH Hub: solves with W and prox, pushes per-scenario x each iteration
// Sends the kill signal after a fixed number of iterations

use lagranger_spoke::capability::{Aggregator, ScenarioBuilder};
use lagranger_spoke::hub::LocalHub;
use lagranger_spoke::model::QuadraticBoxModel;
use lagranger_spoke::weights::StandardAggregator;
use lagranger_spoke::{NonantPush, Scenario, SpokeConfig};
use std::time::Duration;
use tracing::warn;

pub struct HubSim {
    model: QuadraticBoxModel,
    hub: LocalHub,
    iterations: u64,
}

impl HubSim {
    pub fn new(model: QuadraticBoxModel, hub: LocalHub, iterations: u64) -> Self {
        Self { model, hub, iterations }
    }

    /// Run PH and return the expected cost at the final xbar (an inner bound).
    pub fn run(self) -> Option<f64> {
        let mut builder = self.model.clone();
        let mut scenarios = builder.build_scenarios(&SpokeConfig::default()).ok()?;
        let agg = StandardAggregator;

        for k in 0..self.iterations {
            if self.hub.kill_sent() {
                break;
            }
            // Iteration 0 is the plain scenario solve; W and prox join afterwards.
            let penalised = k > 0;
            for scenario in scenarios.iter_mut() {
                if let Err(reason) = self.model.solve_scenario(scenario, penalised, penalised) {
                    warn!(iteration = k, scenario = %scenario.name, %reason, "hub subproblem solve failed");
                }
            }
            let xbar = agg.central_estimate(&scenarios, false);
            for scenario in scenarios.iter_mut() {
                for (index, slot) in scenario.nonants.iter_mut() {
                    if let Some(v) = xbar.get(index) {
                        slot.xbar = *v;
                    }
                }
            }
            agg.update_dual_weights(&mut scenarios, &xbar, false);
            self.hub.push(NonantPush::from_scenarios(&scenarios));
            std::thread::sleep(Duration::from_millis(2));
        }

        self.hub.send_kill();
        Some(self.xbar_cost(&scenarios))
    }

    fn xbar_cost(&self, scenarios: &[Scenario]) -> f64 {
        let Some(first) = scenarios.first() else { return 0.0 };
        self.model
            .data()
            .iter()
            .map(|d| {
                let cost: f64 = d
                    .terms
                    .iter()
                    .zip(first.nonants.values())
                    .map(|(t, slot)| {
                        let x = slot.xbar.clamp(t.lo, t.hi);
                        0.5 * t.q * x * x + t.c * x
                    })
                    .sum();
                d.probability * cost
            })
            .sum()
    }
}
