//! Generic boolean constraint solver.
//!
//! Callers describe a problem as an ordered list of [`Variable`]s, each
//! carrying [`Constraint`]s. [`Solver::solve`] returns the [`Solution`]
//! that sets as few variables as possible, preferring earlier variables
//! whenever a dependency leaves a choice.
//!
//! ```
//! use ext_solver::{Constraint, Identifier, Solver, Variable};
//!
//! let variables = vec![
//!     Variable::new("a")
//!         .with(Constraint::mandatory())
//!         .with(Constraint::dependency(["b", "c"])),
//!     Variable::new("b"),
//!     Variable::new("c"),
//! ];
//! let solution = Solver::new().solve(&variables).unwrap();
//! assert!(solution.contains(&Identifier::new("b")));
//! assert!(!solution.contains(&Identifier::new("c")));
//! ```

pub mod constraint;
pub mod error;
pub mod identifier;
pub mod solution;
pub mod solver;
pub mod variable;

pub use constraint::{AppliedConstraint, Constraint, ConstraintKind, pretty_constraint};
pub use error::{Error, NotSatisfiable, Result};
pub use identifier::Identifier;
pub use solution::Solution;
pub use solver::Solver;
pub use variable::Variable;
