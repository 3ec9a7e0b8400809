//! Reference model collaborators (scenario builder + closed-form solver)

pub mod quadratic;

pub use quadratic::{QuadraticBoxModel, ScenarioData, Term};
