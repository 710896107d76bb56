#![warn(missing_docs)]

//! # `santa-sat`
//!
//! Draws a Secret Santa: every member of a group is assigned exactly one other member to buy a gift for, with nobody
//! drawing themselves, nobody repeating a recent year's pair and nobody drawing a member of their own cluster (e.g. a
//! spouse).
//! Begin with a [`Roster`] and call [`solve()`] with an [`Oracle`], or run a full interactive draw against a database
//! with an [`Orchestrator`](draw::Orchestrator), a [`SqliteStore`](sqlite::SqliteStore) and an
//! [`Operator`](operator::Operator).
//!
//! # Internals
//! A draw is a derangement with extra forbidden pairs, which we express as a Boolean satisfiability problem and hand to
//! a SAT solver.
//!
//! For a roster of N people there is one variable per ordered pair: x(g, r) is true when g buys for r, numbered
//! `1 + g + N * r` in DIMACS terms (see [`PairEncoder`]). We make the following assertions in SAT form:
//! 1. Everyone receives exactly one gift: for each r, at least one of x(_, r) holds and no two of them do.
//! 2. Everyone gives exactly one gift, likewise over x(g, _).
//! 3. Nobody buys for themselves: ¬x(i, i).
//! 4. Pairs from recent years, as selected by [`Lookback`], are forbidden with unit clauses.
//! 5. For every cluster, x(a, b) is forbidden for every two distinct members a and b.
//!
//! The instance is solved either in process by [`varisat`] or by a MiniSat compatible executable exchanging DIMACS
//! files (see [`external`]). The true variables of the model are decoded back into pairs and checked to form a
//! derangement before anything is saved.

pub use draw::{solve, DrawError, DrawOptions, SolveOutcome};
pub use encoding::{EncodingError, PairEncoder};
pub use logic::{Clause, ConstraintInstance};
pub use oracle::{Model, Oracle, OracleError, OracleKind, Verdict, VarisatOracle};
pub use participant::{Cluster, Group, HistoricalPair, Lookback, Pairing, Participant, Roster};

pub mod decode;
pub mod dimacs;
pub mod draw;
pub(crate) mod encoding;
pub mod external;
pub(crate) mod logic;
pub mod operator;
pub(crate) mod oracle;
pub mod participant;
pub mod rules;
pub mod sqlite;
pub mod store;
