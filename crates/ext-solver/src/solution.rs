use std::collections::HashSet;

use crate::identifier::Identifier;

/// The variables a solve selected, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution {
    selected: Vec<Identifier>,
    lookup: HashSet<Identifier>,
}

impl Solution {
    pub(crate) fn new(selected: Vec<Identifier>) -> Self {
        let lookup = selected.iter().cloned().collect();
        Self { selected, lookup }
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.lookup.contains(id)
    }

    pub fn selected(&self) -> &[Identifier] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

impl IntoIterator for Solution {
    type Item = Identifier;
    type IntoIter = std::vec::IntoIter<Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.selected.into_iter()
    }
}
