use itertools::Itertools;
use varisat::{Lit, Var};

use crate::encoding::PairEncoder;

/// A disjunction of literals. Literal order carries no meaning but is kept as generated so output is reproducible.
pub type Clause = Vec<Lit>;

/// At least one of `lits` holds, and no two of them do.
pub(crate) fn exactly_one(lits: Vec<Lit>) -> Vec<Clause> {
    let mut clauses = Vec::with_capacity(lits.len() * lits.len().saturating_sub(1) / 2 + 1);

    // at least one is true; A + B + C + ...
    clauses.push(lits.clone());
    // no two are true; (!A + !B) * (!A + !C) * ...
    clauses.extend(lits.iter()
        .tuple_combinations()
        .map(|(a, b)| vec![!*a, !*b])
    );

    clauses
}

/// A unit clause stating `var` is false.
#[inline]
pub(crate) fn forbid(var: Var) -> Clause {
    vec![var.negative()]
}

/// Everything sent to the oracle for one draw: the conjunction of all generated clauses over `N²` pair variables.
///
/// Built once, then only read.
#[derive(Clone, Debug)]
pub struct ConstraintInstance {
    var_count: usize,
    clauses: Vec<Clause>,
}

impl ConstraintInstance {
    /// An instance with no clauses over the variables of `encoder`.
    pub fn new(encoder: &PairEncoder) -> Self {
        Self { var_count: encoder.var_count(), clauses: Vec::new() }
    }

    /// Add clauses from a generator. Duplicates are kept; they do not change satisfiability.
    pub fn extend(&mut self, clauses: impl IntoIterator<Item=Clause>) -> &mut Self {
        self.clauses.extend(clauses);
        self
    }

    /// Declared number of variables, which is `N²` regardless of which variables the clauses mention.
    #[inline]
    pub fn var_count(&self) -> usize {
        self.var_count
    }

    /// Number of clauses, as written in the DIMACS header.
    #[inline]
    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    /// Clauses in the order they were added.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}
