use std::io;
use std::path::PathBuf;

use strum::{Display, EnumString, IntoStaticStr, VariantArray};
use thiserror::Error;
use tracing::debug;
use varisat::{CnfFormula, Lit, Solver, Var};

use crate::dimacs::AnswerError;
use crate::external::{ProcessOracle, ProcessOracleConfig};
use crate::logic::ConstraintInstance;

/// A truth assignment returned by an oracle, as one signed literal per assigned variable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    literals: Vec<Lit>,
}

impl Model {
    /// Wrap the literals reported by a solver.
    pub fn new(literals: Vec<Lit>) -> Self {
        Self { literals }
    }

    /// The value assigned to `var`, or `None` if the solver did not mention it.
    pub fn value(&self, var: Var) -> Option<bool> {
        self.literals.iter()
            .find(|lit| lit.var() == var)
            .map(|lit| lit.is_positive())
    }

    /// Variables assigned true, in the order reported.
    pub fn true_vars(&self) -> impl Iterator<Item=Var> + '_ {
        self.literals.iter()
            .filter(|lit| lit.is_positive())
            .map(|lit| lit.var())
    }

    /// Every literal, in the order reported.
    pub fn literals(&self) -> &[Lit] {
        &self.literals
    }
}

/// An oracle's answer to a [`ConstraintInstance`].
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    /// The instance is satisfiable, witnessed by the model.
    Satisfiable(Model),
    /// No assignment satisfies the instance.
    Unsatisfiable,
}

/// Reasons an oracle produced no verdict. None of these mean "unsatisfiable".
#[derive(Debug, Error)]
pub enum OracleError {
    /// The solver executable could not be started.
    #[error("could not start solver `{}`: {source}", .program.display())]
    Spawn {
        /// The executable attempted.
        program: PathBuf,
        /// Why it could not start.
        source: io::Error,
    },
    /// Reading or writing the exchanged files failed.
    #[error("solver file exchange failed: {0}")]
    Io(#[from] io::Error),
    /// The solver exited with something other than the satisfiable and unsatisfiable statuses.
    #[error("solver exited with unrecognized status {0}")]
    UnexpectedExit(i32),
    /// The solver was killed before it could exit.
    #[error("solver was terminated by a signal")]
    Killed,
    /// The solver's result file could not be read.
    #[error("solver result unreadable: {0}")]
    Answer(#[from] AnswerError),
    /// The exit status and the result file disagree.
    #[error("solver exited with status {status} but its result file says otherwise")]
    Inconsistent {
        /// The exit status reported.
        status: i32,
    },
    /// The in-process solver failed.
    #[error("solver failed: {0}")]
    Backend(String),
}

/// Something that decides satisfiability of a [`ConstraintInstance`].
///
/// Implementations block until they have an answer; any time limit is the caller's business.
pub trait Oracle {
    /// Decide `instance`, returning a model if it is satisfiable.
    fn solve(&self, instance: &ConstraintInstance) -> Result<Verdict, OracleError>;
}

impl<O: Oracle + ?Sized> Oracle for &O {
    fn solve(&self, instance: &ConstraintInstance) -> Result<Verdict, OracleError> {
        (**self).solve(instance)
    }
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn solve(&self, instance: &ConstraintInstance) -> Result<Verdict, OracleError> {
        (**self).solve(instance)
    }
}

/// Solve in process with [`varisat`].
#[derive(Clone, Copy, Debug, Default)]
pub struct VarisatOracle;

impl Oracle for VarisatOracle {
    fn solve(&self, instance: &ConstraintInstance) -> Result<Verdict, OracleError> {
        let formula = CnfFormula::from(instance.clauses().to_vec());

        let mut solver = Solver::new();
        solver.add_formula(&formula);
        debug!(vars = instance.var_count(), clauses = instance.clause_count(), "solving in process");

        match solver.solve() {
            Ok(true) => solver.model()
                .map(|literals| Verdict::Satisfiable(Model::new(literals)))
                .ok_or_else(|| OracleError::Backend("satisfiable but no model returned".to_string())),
            Ok(false) => Ok(Verdict::Unsatisfiable),
            Err(err) => Err(OracleError::Backend(err.to_string())),
        }
    }
}

/// The oracles that can be selected by name.
#[derive(Clone, Copy, Debug, Default, Display, EnumString, Eq, IntoStaticStr, PartialEq, VariantArray)]
#[strum(serialize_all = "lowercase")]
pub enum OracleKind {
    /// An external MiniSat compatible executable, see [`ProcessOracle`].
    #[default]
    Minisat,
    /// [`VarisatOracle`].
    Varisat,
}

impl OracleKind {
    /// The name of every oracle, as accepted by [`FromStr`](std::str::FromStr).
    pub fn names() -> impl Iterator<Item=&'static str> {
        Self::VARIANTS.iter().map(|kind| kind.into())
    }

    /// Construct the oracle; `program` overrides the executable of an external solver.
    pub fn build(self, program: Option<PathBuf>) -> Box<dyn Oracle> {
        match self {
            OracleKind::Minisat => {
                let mut config = ProcessOracleConfig::default();
                if let Some(program) = program {
                    config.program = program;
                }
                Box::new(ProcessOracle::with_config(config))
            }
            OracleKind::Varisat => Box::new(VarisatOracle),
        }
    }
}
