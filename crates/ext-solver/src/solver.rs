//! Backtracking search over [`Variable`]s.
//!
//! The search starts from the mandatory variables and only selects further
//! variables to satisfy dependencies of variables already selected. Each open
//! dependency tries its candidates in input order, so the earliest variable
//! wins whenever a choice exists, and the first complete assignment reached
//! is the answer. Variables that nothing requires stay unselected.
//!
//! When no assignment exists the applied constraints are shrunk one at a
//! time, keeping only those whose removal would make the problem solvable.
//! What remains is a minimal unsatisfiable subset, reported through
//! [`NotSatisfiable`].
//!
//! The search is exponential in the worst case. [`Solver::with_max_steps`]
//! bounds it.

use std::collections::HashMap;

use crate::constraint::{AppliedConstraint, Constraint, ConstraintKind};
use crate::error::{Error, NotSatisfiable, Result};
use crate::identifier::Identifier;
use crate::solution::Solution;
use crate::variable::Variable;

#[derive(Debug, Clone, Default)]
pub struct Solver {
    max_steps: Option<usize>,
}

impl Solver {
    /// An unbounded solver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with [`Error::SearchLimitExceeded`] after `steps` selection attempts.
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub fn max_steps(&self) -> Option<usize> {
        self.max_steps
    }

    pub fn solve(&self, variables: &[Variable]) -> Result<Solution> {
        let index = index_variables(variables)?;
        let applied: Vec<Applied<'_>> = variables
            .iter()
            .enumerate()
            .flat_map(|(subject, v)| {
                v.constraints()
                    .iter()
                    .map(move |constraint| Applied { subject, constraint })
            })
            .collect();

        let everything: Vec<usize> = (0..applied.len()).collect();
        let problem = Problem::compile(variables.len(), &applied, &everything, &index);
        let mut search = Search::new(&problem, self.max_steps);

        if search.run()? {
            let selected: Vec<Identifier> = variables
                .iter()
                .zip(&search.selected)
                .filter(|(_, selected)| **selected)
                .map(|(v, _)| v.id().clone())
                .collect();
            tracing::debug!(
                variables = variables.len(),
                selected = selected.len(),
                steps = search.steps,
                "Constraints solved"
            );
            return Ok(Solution::new(selected));
        }

        let core = self.minimal_core(variables.len(), &applied, everything, &index)?;
        tracing::debug!(
            variables = variables.len(),
            core = core.len(),
            "Constraints not satisfiable"
        );
        let constraints = core
            .into_iter()
            .map(|i| AppliedConstraint {
                variable: variables[applied[i].subject].id().clone(),
                constraint: applied[i].constraint.clone(),
            })
            .collect();
        Err(NotSatisfiable(constraints).into())
    }

    /// Deletion-based shrinking of an unsatisfiable constraint set.
    fn minimal_core(
        &self,
        len: usize,
        applied: &[Applied<'_>],
        mut core: Vec<usize>,
        index: &HashMap<&Identifier, usize>,
    ) -> Result<Vec<usize>> {
        let mut i = 0;
        while i < core.len() {
            let mut trial = core.clone();
            trial.remove(i);
            let problem = Problem::compile(len, applied, &trial, index);
            match Search::new(&problem, self.max_steps).run() {
                Ok(false) => core = trial,
                Ok(true) | Err(Error::SearchLimitExceeded { .. }) => i += 1,
                Err(e) => return Err(e),
            }
        }
        Ok(core)
    }
}

fn index_variables(variables: &[Variable]) -> Result<HashMap<&Identifier, usize>> {
    let mut index = HashMap::with_capacity(variables.len());
    for (i, v) in variables.iter().enumerate() {
        if index.insert(v.id(), i).is_some() {
            return Err(Error::DuplicateIdentifier(v.id().clone()));
        }
    }
    Ok(index)
}

struct Applied<'a> {
    subject: usize,
    constraint: &'a Constraint,
}

/// A subset of the applied constraints compiled to variable positions.
///
/// Identifiers that name no variable are dropped: such variables can never
/// be selected.
struct Problem {
    mandatory: Vec<usize>,
    prohibited: Vec<bool>,
    /// Per variable, the candidate lists of its dependencies, in input order.
    dependencies: Vec<Vec<Vec<usize>>>,
    at_most: Vec<(usize, Vec<usize>)>,
    /// Per variable, the `at_most` entries it takes part in.
    at_most_of: Vec<Vec<usize>>,
}

impl Problem {
    fn compile(
        len: usize,
        applied: &[Applied<'_>],
        active: &[usize],
        index: &HashMap<&Identifier, usize>,
    ) -> Self {
        let mut problem = Self {
            mandatory: Vec::new(),
            prohibited: vec![false; len],
            dependencies: vec![Vec::new(); len],
            at_most: Vec::new(),
            at_most_of: vec![Vec::new(); len],
        };
        let positions = |ids: &[Identifier]| {
            let mut found: Vec<usize> = ids.iter().filter_map(|id| index.get(id).copied()).collect();
            found.sort_unstable();
            found.dedup();
            found
        };

        for &i in active {
            let Applied {
                subject,
                constraint,
            } = applied[i];
            match constraint.kind() {
                ConstraintKind::Mandatory => problem.mandatory.push(subject),
                ConstraintKind::Prohibited => problem.prohibited[subject] = true,
                ConstraintKind::Dependency(ids) => problem.dependencies[subject].push(positions(ids)),
                ConstraintKind::AtMost(n, ids) => {
                    let members = positions(ids);
                    let entry = problem.at_most.len();
                    for &m in &members {
                        problem.at_most_of[m].push(entry);
                    }
                    problem.at_most.push((*n, members));
                }
            }
        }
        problem.mandatory.sort_unstable();
        problem.mandatory.dedup();
        problem
    }
}

/// An open dependency being decided: its agenda position, the next
/// candidate to try and the trail and agenda lengths to restore on retry.
#[derive(Debug, Clone, Copy)]
struct ChoicePoint {
    pos: usize,
    next: usize,
    trail: usize,
    agenda: usize,
}

struct Search<'p> {
    problem: &'p Problem,
    selected: Vec<bool>,
    trail: Vec<usize>,
    /// Open dependencies as (variable, dependency) pairs, in selection order.
    agenda: Vec<(usize, usize)>,
    steps: usize,
    limit: Option<usize>,
}

impl<'p> Search<'p> {
    fn new(problem: &'p Problem, limit: Option<usize>) -> Self {
        Self {
            problem,
            selected: vec![false; problem.prohibited.len()],
            trail: Vec::new(),
            agenda: Vec::new(),
            steps: 0,
            limit,
        }
    }

    fn run(&mut self) -> Result<bool> {
        let problem = self.problem;
        for &var in &problem.mandatory {
            self.tick()?;
            if !self.select(var) {
                return Ok(false);
            }
        }
        self.extend()
    }

    /// Satisfy every open dependency on the agenda.
    ///
    /// Depth-first over an explicit stack of choice points, one per open
    /// dependency being decided, so the depth of the dependency graph does
    /// not grow the call stack.
    fn extend(&mut self) -> Result<bool> {
        let problem = self.problem;
        let mut choices: Vec<ChoicePoint> = Vec::new();
        let mut pos = 0;
        loop {
            // next dependency that no selected variable satisfies yet
            loop {
                let Some(&(var, dep)) = self.agenda.get(pos) else {
                    return Ok(true);
                };
                if !problem.dependencies[var][dep].iter().any(|&c| self.selected[c]) {
                    break;
                }
                pos += 1;
            }
            choices.push(ChoicePoint {
                pos,
                next: 0,
                trail: self.trail.len(),
                agenda: self.agenda.len(),
            });

            loop {
                let Some(point) = choices.last_mut() else {
                    return Ok(false);
                };
                let (var, dep) = self.agenda[point.pos];
                let Some(&candidate) = problem.dependencies[var][dep].get(point.next) else {
                    // exhausted: the enclosing choice was wrong too
                    choices.pop();
                    if let Some(parent) = choices.last() {
                        self.undo(parent.trail, parent.agenda);
                    }
                    continue;
                };
                point.next += 1;
                let ChoicePoint {
                    pos: at,
                    trail,
                    agenda,
                    ..
                } = *point;
                self.tick()?;
                if self.select(candidate) {
                    pos = at + 1;
                    break;
                }
                self.undo(trail, agenda);
            }
        }
    }

    /// Select `var`; false when that violates a constraint. A failed
    /// selection is left on the trail for the caller to undo.
    fn select(&mut self, var: usize) -> bool {
        let problem = self.problem;
        if self.selected[var] {
            return true;
        }
        if problem.prohibited[var] {
            return false;
        }
        self.selected[var] = true;
        self.trail.push(var);
        for &entry in &problem.at_most_of[var] {
            let (n, members) = &problem.at_most[entry];
            if members.iter().filter(|&&m| self.selected[m]).count() > *n {
                return false;
            }
        }
        self.agenda
            .extend((0..problem.dependencies[var].len()).map(|dep| (var, dep)));
        true
    }

    fn undo(&mut self, trail: usize, agenda: usize) {
        for var in self.trail.drain(trail..) {
            self.selected[var] = false;
        }
        self.agenda.truncate(agenda);
    }

    fn tick(&mut self) -> Result<()> {
        self.steps += 1;
        match self.limit {
            Some(limit) if self.steps > limit => Err(Error::SearchLimitExceeded { limit }),
            _ => Ok(()),
        }
    }
}
