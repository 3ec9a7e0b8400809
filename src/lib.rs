// Copyright © 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Lagrangian outer-bound spoke for hub-and-spoke progressive hedging.
//!
//! The spoke takes nonant values pushed by the hub, recomputes its own dual
//! weights, re-solves its local subproblems and reports a bound, until the
//! hub tells it to stop. Model building, subproblem solves, and hub transport
//! are supplied through the traits in [`capability`].

pub mod types;
pub mod error;
pub mod config;
pub mod capability;
pub mod rescale;
pub mod cache;
pub mod weights;
pub mod bound;
pub mod persist;
pub mod spoke;
pub mod hub;
pub mod telemetry;

// Reference collaborators
pub mod model;

pub use cache::{NonantCache, NonantPush};
pub use config::SpokeConfig;
pub use error::{SpokeError, SpokeResult};
pub use rescale::RhoRescaleSchedule;
pub use spoke::{Collaborators, LagrangerSpoke};
pub use types::*;
