//! The plain-text exchange format spoken with external solvers.
//!
//! Input is DIMACS CNF: a `p cnf <variables> <clauses>` header, then one clause per line as signed variable numbers
//! ending in `0`. Output follows MiniSat's result file: a status line (`SAT`, `UNSAT` or `INDET`) and, when
//! satisfiable, a second line listing every variable signed by its value, again ending in `0`.

use std::io::{self, Write};

use itertools::Itertools;
use thiserror::Error;
use varisat::{Lit, Var};

use crate::logic::ConstraintInstance;
use crate::oracle::Model;

/// A solver result file could not be understood.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum AnswerError {
    /// The file had no status line.
    #[error("result file is empty")]
    Empty,
    /// The status line was not one of the known words.
    #[error("unknown status line `{0}`")]
    UnknownStatus(String),
    /// `SAT` with no assignment line after it.
    #[error("satisfiable result carries no assignment")]
    MissingAssignment,
    /// A token in the assignment line was not a signed integer.
    #[error("`{0}` is not a literal")]
    BadLiteral(String),
    /// A literal naming a variable no instance can have.
    #[error("literal `{0}` is out of range")]
    LiteralOutOfRange(String),
}

/// What a solver result file says.
#[derive(Clone, Debug, PartialEq)]
pub enum Answer {
    /// Satisfiable, with the assignment found.
    Sat(Model),
    /// Unsatisfiable.
    Unsat,
    /// The solver gave up, e.g. on a resource limit.
    Indeterminate,
}

/// Write `instance` in DIMACS CNF.
pub fn write_instance<W: Write>(instance: &ConstraintInstance, mut out: W) -> io::Result<()> {
    writeln!(out, "p cnf {} {}", instance.var_count(), instance.clause_count())?;
    for clause in instance.clauses() {
        writeln!(out, "{} 0", clause.iter().map(|lit| lit.to_dimacs()).join(" "))?;
    }

    out.flush()
}

/// [`write_instance`] into a string.
pub fn to_string(instance: &ConstraintInstance) -> String {
    let mut buffer = Vec::new();
    // writing to a Vec cannot fail
    let _ = write_instance(instance, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Parse a MiniSat style result file.
pub fn parse_answer(text: &str) -> Result<Answer, AnswerError> {
    let mut lines = text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());

    match lines.next() {
        None => Err(AnswerError::Empty),
        Some("UNSAT") => Ok(Answer::Unsat),
        Some("INDET") => Ok(Answer::Indeterminate),
        Some("SAT") => {
            let assignment = lines.next().ok_or(AnswerError::MissingAssignment)?;
            parse_literals(assignment).map(|literals| Answer::Sat(Model::new(literals)))
        }
        Some(other) => Err(AnswerError::UnknownStatus(other.to_string())),
    }
}

/// Signed variable numbers up to the terminating `0`; anything after it is ignored.
fn parse_literals(line: &str) -> Result<Vec<Lit>, AnswerError> {
    line.split_whitespace()
        .map(parse_number)
        .take_while(|number| *number != Ok(0))
        .map_ok(Lit::from_dimacs)
        .collect()
}

/// A signed variable number small enough for [`Lit::from_dimacs`].
fn parse_number(token: &str) -> Result<isize, AnswerError> {
    let number = token.parse::<isize>().map_err(|_| AnswerError::BadLiteral(token.to_string()))?;
    if number.unsigned_abs() > Var::max_count() {
        return Err(AnswerError::LiteralOutOfRange(token.to_string()));
    }
    Ok(number)
}

#[cfg(test)]
mod tests {
    use crate::encoding::PairEncoder;
    use crate::logic::forbid;
    use crate::rules::no_self_gift;

    use super::*;

    #[test]
    fn writes_header_and_clauses() {
        let encoder = PairEncoder::new(2).unwrap();
        let mut instance = ConstraintInstance::new(&encoder);
        instance.extend(no_self_gift(&encoder));
        instance.extend([vec![Var::from_dimacs(2).positive(), Var::from_dimacs(3).positive()]]);

        assert_eq!(to_string(&instance), "p cnf 4 3
-1 0
-4 0
2 3 0
");
    }

    #[test]
    fn empty_instance_is_just_a_header() {
        let instance = ConstraintInstance::new(&PairEncoder::new(3).unwrap());
        assert_eq!(to_string(&instance), "p cnf 9 0\n");
    }

    #[test]
    fn parses_satisfiable() {
        let model = match parse_answer("SAT\n-1 2 3 -4 0\n").unwrap() {
            Answer::Sat(model) => model,
            other => panic!("expected SAT, got {other:?}"),
        };

        assert_eq!(model.true_vars().map(|var| var.to_dimacs()).collect_vec(), vec![2, 3]);
        assert_eq!(model.value(Var::from_dimacs(4)), Some(false));
        assert_eq!(model.value(Var::from_dimacs(5)), None);
    }

    #[test]
    fn tolerates_missing_terminator_and_blank_lines() {
        let answer = parse_answer("\nSAT\n1 -2\n").unwrap();
        assert_eq!(answer, Answer::Sat(Model::new(vec![Lit::from_dimacs(1), Lit::from_dimacs(-2)])));
    }

    #[test]
    fn parses_other_statuses() {
        assert_eq!(parse_answer("UNSAT\n"), Ok(Answer::Unsat));
        assert_eq!(parse_answer("INDET\n"), Ok(Answer::Indeterminate));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_answer(""), Err(AnswerError::Empty));
        assert_eq!(parse_answer("SAT\n"), Err(AnswerError::MissingAssignment));
        assert_eq!(parse_answer("SAT\n1 two 0\n"), Err(AnswerError::BadLiteral("two".to_string())));
        assert_eq!(parse_answer("MAYBE\n"), Err(AnswerError::UnknownStatus("MAYBE".to_string())));
    }

    #[test]
    fn rejects_literals_beyond_any_variable() {
        let huge = format!("SAT\n{} 0\n", isize::MIN);
        assert_eq!(parse_answer(&huge), Err(AnswerError::LiteralOutOfRange(isize::MIN.to_string())));
        assert_eq!(parse_answer("SAT\n99999999999 0\n"), Err(AnswerError::LiteralOutOfRange("99999999999".to_string())));
        // would alias variable 2 if truncated to 32 bits
        assert_eq!(
            parse_answer("SAT\n-1 4294967298 3 -4 0\n"),
            Err(AnswerError::LiteralOutOfRange("4294967298".to_string())),
        );
    }

    #[test]
    fn largest_variable_is_accepted() {
        let largest = Var::max_count() as isize;
        let answer = parse_answer(&format!("SAT\n-{largest} 0\n")).unwrap();
        assert_eq!(answer, Answer::Sat(Model::new(vec![Lit::from_dimacs(-largest)])));
    }

    #[test]
    fn clause_written_in_order() {
        let encoder = PairEncoder::new(2).unwrap();
        let mut instance = ConstraintInstance::new(&encoder);
        instance.extend([forbid(Var::from_dimacs(3)), vec![Lit::from_dimacs(4), Lit::from_dimacs(-1)]]);

        assert_eq!(to_string(&instance).lines().skip(1).collect_vec(), vec!["-3 0", "4 -1 0"]);
    }
}
