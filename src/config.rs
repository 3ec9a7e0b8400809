// Copyright © 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Immutable spoke configuration.
//!
//! Every recognised option is a named field with a default. The legacy option
//! names used by existing hub launch scripts are accepted as serde aliases.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Solver options forwarded verbatim to the solve collaborator.
pub type SolverOptions = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpokeConfig {
    /// JSON file mapping iteration number to rho rescale factor.
    #[serde(alias = "lagranger_rho_rescale_factors_json")]
    pub rescale_schedule_source: Option<PathBuf>,
    /// Append W values to `lagranger_w_vals.csv` every iteration.
    #[serde(alias = "lagranger_write_W")]
    pub write_weights: bool,
    /// Append xbar values to `lagranger_xbar_vals.csv` every iteration.
    #[serde(alias = "lagranger_write_xbar")]
    pub write_reference_point: bool,
    pub verbose: bool,
    /// Solver trace output; only honoured on rank 0.
    #[serde(alias = "tee-rank0-solves")]
    pub solver_trace: bool,
    pub cylinder_rank: usize,
    pub iter0_solver_options: SolverOptions,
    pub iterk_solver_options: SolverOptions,
    /// Directory for CSV persistence files.
    pub output_dir: PathBuf,
}

impl Default for SpokeConfig {
    fn default() -> Self {
        Self {
            rescale_schedule_source: None,
            write_weights: false,
            write_reference_point: false,
            verbose: false,
            solver_trace: false,
            cylinder_rank: 0,
            iter0_solver_options: SolverOptions::new(),
            iterk_solver_options: SolverOptions::new(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl SpokeConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Trace flag actually passed to the solver.
    pub fn effective_solver_trace(&self) -> bool {
        self.solver_trace && self.cylinder_rank == 0
    }

    /// Whether any persistence sink is needed.
    pub fn persistence_enabled(&self) -> bool {
        self.write_weights || self.write_reference_point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let c = SpokeConfig::from_json_str("{}").expect("test: empty config parses");
        assert_eq!(c, SpokeConfig::default());
        assert!(c.rescale_schedule_source.is_none());
        assert!(!c.persistence_enabled());
        assert_eq!(c.output_dir, PathBuf::from("."));
    }

    #[test]
    fn legacy_option_names_accepted() {
        let raw = r#"{
            "lagranger_rho_rescale_factors_json": "rf.json",
            "lagranger_write_W": true,
            "lagranger_write_xbar": true,
            "tee-rank0-solves": true,
            "verbose": true
        }"#;
        let c = SpokeConfig::from_json_str(raw).expect("test: legacy names parse");
        assert_eq!(c.rescale_schedule_source, Some(PathBuf::from("rf.json")));
        assert!(c.write_weights);
        assert!(c.write_reference_point);
        assert!(c.solver_trace);
        assert!(c.verbose);
    }

    #[test]
    fn solver_trace_only_on_rank_zero() {
        let mut c = SpokeConfig { solver_trace: true, ..SpokeConfig::default() };
        assert!(c.effective_solver_trace());
        c.cylinder_rank = 2;
        assert!(!c.effective_solver_trace());
    }

    #[test]
    fn unknown_option_rejected() {
        let err = SpokeConfig::from_json_str(r#"{"lagranger_rho": 1}"#);
        assert!(matches!(err, Err(ConfigError::Json(_))));
    }

    #[test]
    fn solver_options_kept_verbatim() {
        let raw = r#"{"iterk_solver_options": {"mipgap": 0.01, "threads": 2}}"#;
        let c = SpokeConfig::from_json_str(raw).expect("test: options parse");
        assert_eq!(c.iterk_solver_options["mipgap"], serde_json::json!(0.01));
        assert_eq!(c.iterk_solver_options["threads"], serde_json::json!(2));
        assert!(c.iter0_solver_options.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SpokeConfig::from_json_file(Path::new("/nonexistent/spoke.json"));
        assert!(matches!(err, Err(ConfigError::Io { .. })));
    }
}
