//! Utilities for testing shared-object implementations.
pub mod linearizability;
pub mod specifications;

pub use linearizability::history::{Action, History};
pub use linearizability::WglChecker;

pub use specifications::Specification;
