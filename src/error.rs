// Copyright © 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Error taxonomy for the spoke.
//!
//! Configuration errors are fatal at `prepare()`. Per-scenario solve failures
//! are not errors at all (they travel in `SolveReport`); only a solver that
//! escalates to [`SolveError::Fatal`] stops the loop.

use std::path::PathBuf;

use crate::types::SpokeState;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Malformed or unreadable configuration. The spoke cannot start.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rescale schedule key {0:?} is not a non-negative iteration number")]
    BadIteration(String),

    #[error("rescale factor for iteration {iteration} must be positive and finite, got {factor}")]
    BadFactor { iteration: u64, factor: f64 },

    #[error("rescale schedule lists iteration {0} more than once")]
    DuplicateIteration(u64),
}

// ---------------------------------------------------------------------------
// BuildError
// ---------------------------------------------------------------------------

/// Raised by the scenario builder while materialising scenarios or solvers.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct BuildError(pub String);

// ---------------------------------------------------------------------------
// SolveError
// ---------------------------------------------------------------------------

/// Raised by the solve collaborator when it cannot continue at all.
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error("fatal solver condition: {0}")]
    Fatal(String),
}

// ---------------------------------------------------------------------------
// BoundError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BoundError {
    #[error("no scenario has a solved objective at iteration {0}")]
    NoSolvedScenarios(u64),
}

// ---------------------------------------------------------------------------
// SpokeError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SpokeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("scenario construction failed: {0}")]
    Build(#[from] BuildError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error(transparent)]
    Bound(#[from] BoundError),

    #[error("persistence failed: {0}")]
    Persist(#[from] std::io::Error),

    #[error("{op} is not allowed while the spoke is {state}")]
    InvalidState { op: &'static str, state: SpokeState },

    #[error("prepare() has already run")]
    AlreadyPrepared,
}

pub type SpokeResult<T> = Result<T, SpokeError>;
