//! PEP (Policy Enforcement Point) helpers.
//!
//! - [`compiler::compile_decision`] - turns a decision into the filter for storage
//! - [`enforcer::PolicyEnforcer`] - full flow: call the port, then compile

pub mod compiler;
pub mod enforcer;

pub use compiler::{DecisionCompileError, compile_decision};
pub use enforcer::{AccessGrant, EnforcerError, PolicyEnforcer};
