//! MiniSat compatible solver executables.
//!
//! The solver is run as `<program> [args...] <input> <output>`. It must exit with status 10 after writing a satisfying
//! assignment to `<output>`, or with status 20 if the instance is unsatisfiable. Any other way of ending, including
//! being killed, is an [`OracleError`].

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

use tempfile::TempDir;
use tracing::debug;

use crate::dimacs::{parse_answer, write_instance, Answer, AnswerError};
use crate::logic::ConstraintInstance;
use crate::oracle::{Oracle, OracleError, Verdict};

/// Exit status of a solver that found a satisfying assignment.
pub const EXIT_SATISFIABLE: i32 = 10;
/// Exit status of a solver that proved unsatisfiability.
pub const EXIT_UNSATISFIABLE: i32 = 20;

const INPUT_FILE: &str = "input.dimacs";
const OUTPUT_FILE: &str = "output.dimacs";

/// Configuration for [`ProcessOracle`].
#[derive(Clone, Debug)]
pub struct ProcessOracleConfig {
    /// The solver executable, looked up on `PATH` if not a path.
    pub program: PathBuf,
    /// Extra arguments placed before the input and output files.
    pub args: Vec<String>,
}

impl Default for ProcessOracleConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("minisat"),
            args: Vec::new(),
        }
    }
}

/// An [`Oracle`] backed by an external solver process.
#[derive(Clone, Debug, Default)]
pub struct ProcessOracle {
    config: ProcessOracleConfig,
}

impl ProcessOracle {
    /// A solver run as `minisat <input> <output>`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A solver run as configured.
    pub fn with_config(config: ProcessOracleConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ProcessOracleConfig {
        &self.config
    }
}

impl Oracle for ProcessOracle {
    fn solve(&self, instance: &ConstraintInstance) -> Result<Verdict, OracleError> {
        let start = Instant::now();
        // removed when dropped, whichever way this function returns
        let workdir = TempDir::new()?;
        let input = workdir.path().join(INPUT_FILE);
        let output = workdir.path().join(OUTPUT_FILE);

        write_instance(instance, BufWriter::new(File::create(&input)?))?;

        let mut command = Command::new(&self.config.program);
        command.args(&self.config.args)
            .arg(&input)
            .arg(&output)
            .stdin(Stdio::null());
        debug!(?command, vars = instance.var_count(), clauses = instance.clause_count(), "running solver");

        let result = command.output().map_err(|source| OracleError::Spawn {
            program: self.config.program.clone(),
            source,
        })?;

        debug!(status = ?result.status, elapsed = ?start.elapsed(), "solver exited");
        debug!("solver stdout: {}", String::from_utf8_lossy(&result.stdout));
        debug!("solver stderr: {}", String::from_utf8_lossy(&result.stderr));

        match result.status.code() {
            Some(EXIT_SATISFIABLE) => match parse_answer(&fs::read_to_string(&output)?)? {
                Answer::Sat(model) => {
                    // variables past the header count were never asked about
                    if let Some(lit) = model.literals().iter().find(|lit| lit.index() >= instance.var_count()) {
                        return Err(AnswerError::LiteralOutOfRange(lit.to_dimacs().to_string()).into());
                    }
                    Ok(Verdict::Satisfiable(model))
                }
                Answer::Unsat | Answer::Indeterminate => Err(OracleError::Inconsistent { status: EXIT_SATISFIABLE }),
            },
            Some(EXIT_UNSATISFIABLE) => Ok(Verdict::Unsatisfiable),
            Some(status) => Err(OracleError::UnexpectedExit(status)),
            None => Err(OracleError::Killed),
        }
    }
}
