use crate::constraint::Constraint;
use crate::identifier::Identifier;

/// A boolean decision variable and the constraints it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    id: Identifier,
    constraints: Vec<Constraint>,
}

impl Variable {
    pub fn new(id: impl Into<Identifier>) -> Self {
        Self {
            id: id.into(),
            constraints: Vec::new(),
        }
    }

    /// Builder-style helper appending one constraint.
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn push(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}
