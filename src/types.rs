// Copyright © 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Core data model for the Lagrangian outer-bound spoke.
//!
//! Scenarios carry, per non-anticipative index, the current variable value,
//! the penalty coefficient (rho), the dual weight (W) and the last reference
//! point (xbar) seen by the weight update.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// NonantIndex
// ---------------------------------------------------------------------------

/// Identifies one non-anticipative variable: its scenario-tree node and its
/// position within that node's nonant vector.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NonantIndex {
    pub node: String,
    pub slot: u32,
}

impl NonantIndex {
    pub fn new(node: impl Into<String>, slot: u32) -> Self {
        Self { node: node.into(), slot }
    }

    /// Shorthand for an index on the root node.
    pub fn root(slot: u32) -> Self {
        Self::new("ROOT", slot)
    }
}

impl fmt::Display for NonantIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.node, self.slot)
    }
}

// ---------------------------------------------------------------------------
// NonantSlot
// ---------------------------------------------------------------------------

/// Per-index optimisation state held by a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NonantSlot {
    /// Current value of the shared variable in this scenario.
    pub value: f64,
    /// Penalty coefficient.
    pub rho: f64,
    /// Dual weight.
    pub w: f64,
    /// Reference point from the last xbar computation.
    pub xbar: f64,
}

impl NonantSlot {
    pub fn with_rho(rho: f64) -> Self {
        Self { value: 0.0, rho, w: 0.0, xbar: 0.0 }
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// One stochastic realisation of the model, owned by the spoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub probability: f64,
    pub nonants: BTreeMap<NonantIndex, NonantSlot>,
    /// Objective of the last successful solve, `None` if unsolved or failed.
    pub objective: Option<f64>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, probability: f64) -> Self {
        Self {
            name: name.into(),
            probability,
            nonants: BTreeMap::new(),
            objective: None,
        }
    }

    /// Builder-style insertion of a nonant slot.
    pub fn with_nonant(mut self, index: NonantIndex, slot: NonantSlot) -> Self {
        self.nonants.insert(index, slot);
        self
    }

    pub fn rho(&self, index: &NonantIndex) -> Option<f64> {
        self.nonants.get(index).map(|s| s.rho)
    }

    pub fn w(&self, index: &NonantIndex) -> Option<f64> {
        self.nonants.get(index).map(|s| s.w)
    }

    pub fn value(&self, index: &NonantIndex) -> Option<f64> {
        self.nonants.get(index).map(|s| s.value)
    }

    /// Current nonant values keyed by index.
    pub fn values(&self) -> BTreeMap<NonantIndex, f64> {
        self.nonants.iter().map(|(i, s)| (i.clone(), s.value)).collect()
    }
}

// ---------------------------------------------------------------------------
// SpokeState
// ---------------------------------------------------------------------------

/// Lifecycle of the spoke controller.
///
/// `Preparing -> Iterating -> Finalizing -> Stopped`; `Iterating` loops on
/// itself until the kill signal is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpokeState {
    Preparing,
    Iterating,
    Finalizing,
    Stopped,
}

impl SpokeState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Iterating => "iterating",
            Self::Finalizing => "finalizing",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SpokeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// BoundRecord
// ---------------------------------------------------------------------------

/// A bound together with the iteration that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundRecord {
    pub iteration: u64,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// SpokeKind
// ---------------------------------------------------------------------------

/// Identity a spoke reports to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpokeKind {
    /// Independent Lagrangian that takes x values as input and updates its own W.
    LagrangerOuterBound,
}

impl SpokeKind {
    /// Single-character tag used in hub convergence tables.
    pub fn converger_char(&self) -> char {
        match self {
            Self::LagrangerOuterBound => 'A',
        }
    }

    /// Outer bounds are lower bounds for minimisation problems.
    pub fn is_outer_bound(&self) -> bool {
        matches!(self, Self::LagrangerOuterBound)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
