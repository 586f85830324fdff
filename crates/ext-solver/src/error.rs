//! Error types for ext-solver

use std::fmt;

use crate::constraint::AppliedConstraint;
use crate::identifier::Identifier;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("duplicate variable identifier '{0}'")]
    DuplicateIdentifier(Identifier),

    #[error(transparent)]
    NotSatisfiable(#[from] NotSatisfiable),

    #[error("solver search exceeded the limit of {limit} steps")]
    SearchLimitExceeded { limit: usize },
}

/// A minimal set of constraints that cannot hold together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotSatisfiable(pub Vec<AppliedConstraint>);

impl NotSatisfiable {
    pub fn constraints(&self) -> &[AppliedConstraint] {
        &self.0
    }
}

impl fmt::Display for NotSatisfiable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("constraints not satisfiable")?;
        for (i, applied) in self.0.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { ", " })?;
            write!(f, "{applied}")?;
        }
        Ok(())
    }
}

impl std::error::Error for NotSatisfiable {}
