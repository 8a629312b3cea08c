//! PEP decision compiler.
//!
//! Turns a port decision into the filter a repository call must carry.
//!
//! ## Decision Matrix (fail-closed)
//!
//! | decision      | condition language | Result |
//! |---------------|--------------------|--------|
//! | `Allow`       | *                  | `Expression::none()` (no filter) |
//! | `Deny`        | *                  | `Denied` (storage is never queried) |
//! | `Conditional` | present            | the condition, unchanged |
//! | `Conditional` | empty              | `MissingCondition` |
//! | `Unknown`     | *                  | `Undecided` |

use crate::models::{DecisionKind, Expression};

/// Error during decision compilation. Every variant means "refuse".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionCompileError {
    /// The policy engine explicitly denied access.
    #[error("access denied by policy")]
    Denied,

    /// A conditional decision arrived without an expression language.
    #[error("conditional decision carries no condition")]
    MissingCondition,

    /// The engine left the decision unspecified.
    #[error("policy engine returned no decision")]
    Undecided,
}

/// Compile a decision into the filter to hand to storage.
///
/// The conditional expression is returned exactly as received; it is never
/// rewritten, evaluated, or reinterpreted here.
///
/// # Errors
///
/// - `Denied` for [`DecisionKind::Deny`]
/// - `MissingCondition` for a `Conditional` decision without a language
/// - `Undecided` for [`DecisionKind::Unknown`]
pub fn compile_decision(
    decision: DecisionKind,
    condition: &Expression,
) -> Result<Expression, DecisionCompileError> {
    match decision {
        DecisionKind::Allow => Ok(Expression::none()),
        DecisionKind::Deny => Err(DecisionCompileError::Denied),
        DecisionKind::Conditional if condition.is_none() => {
            Err(DecisionCompileError::MissingCondition)
        }
        DecisionKind::Conditional => Ok(condition.clone()),
        DecisionKind::Unknown => Err(DecisionCompileError::Undecided),
    }
}
