//! Constraints and their diagnostic text.

use std::fmt;

use crate::identifier::{self, Identifier};

/// The logical meaning of a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    /// The declaring variable must be selected.
    Mandatory,
    /// The declaring variable must not be selected.
    Prohibited,
    /// If the declaring variable is selected, at least one of these must be.
    Dependency(Vec<Identifier>),
    /// At most `n` of these may be selected together.
    AtMost(usize, Vec<Identifier>),
}

/// A constraint with an optional explanation overriding its default text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    kind: ConstraintKind,
    explanation: Option<String>,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Self {
            kind,
            explanation: None,
        }
    }

    pub fn mandatory() -> Self {
        Self::new(ConstraintKind::Mandatory)
    }

    pub fn prohibited() -> Self {
        Self::new(ConstraintKind::Prohibited)
    }

    pub fn dependency<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identifier>,
    {
        Self::new(ConstraintKind::Dependency(
            ids.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn at_most<I, T>(n: usize, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identifier>,
    {
        Self::new(ConstraintKind::AtMost(
            n,
            ids.into_iter().map(Into::into).collect(),
        ))
    }

    /// Replace the diagnostic text; the logical kind is unchanged.
    pub fn pretty(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// Diagnostic text of this constraint when declared by `subject`.
    pub fn explain(&self, subject: &Identifier) -> String {
        if let Some(explanation) = &self.explanation {
            return explanation.clone();
        }
        match &self.kind {
            ConstraintKind::Mandatory => format!("{subject} is mandatory"),
            ConstraintKind::Prohibited => format!("{subject} is prohibited"),
            ConstraintKind::Dependency(ids) if ids.is_empty() => {
                format!("{subject} has a dependency without any candidates to satisfy it")
            }
            ConstraintKind::Dependency(ids) => {
                format!("{subject} requires at least one of {}", identifier::join(ids))
            }
            ConstraintKind::AtMost(n, ids) => {
                format!("{subject} permits at most {n} of {}", identifier::join(ids))
            }
        }
    }
}

/// Wrap `constraint` so diagnostics show `explanation` instead of its default text.
pub fn pretty_constraint(constraint: Constraint, explanation: impl Into<String>) -> Constraint {
    constraint.pretty(explanation)
}

/// A constraint together with the variable that declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedConstraint {
    pub variable: Identifier,
    pub constraint: Constraint,
}

impl fmt::Display for AppliedConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.constraint.explain(&self.variable))
    }
}
