use std::io;

use strum::Display;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::decode::{decode_assignment, DecodeError};
use crate::encoding::{EncodingError, PairEncoder};
use crate::logic::ConstraintInstance;
use crate::operator::{Operator, OperatorError};
use crate::oracle::{Oracle, OracleError, Verdict};
use crate::participant::{Cluster, Group, HistoricalPair, InvalidInput, Lookback, Pairing, Roster, Year};
use crate::rules::all_rules;
use crate::store::{AssignmentSink, RosterProvider, StoreError};

/// Why a draw ended without a recorded assignment.
#[derive(Debug, Error)]
pub enum DrawError {
    /// The operator stopped answering before giving valid input. Always [`OperatorError::Closed`].
    #[error(transparent)]
    InvalidInput(OperatorError),
    /// The prompts could not be written or the answers read.
    #[error("operator channel failed: {0}")]
    OperatorChannel(io::Error),
    /// A cluster does not fit the roster it was given with.
    #[error("invalid cluster: {0}")]
    InvalidCluster(#[from] InvalidInput),
    /// Every group already has a draw for this year.
    #[error("all groups have been assigned this year")]
    NothingToDraw,
    /// No assignment satisfies the rules, history and clusters.
    #[error("no valid assignment exists for the given constraints")]
    Unsatisfiable,
    /// The oracle gave no verdict.
    #[error("the solving oracle failed unexpectedly: {0}")]
    OracleFailure(#[from] OracleError),
    /// The oracle's model is not a valid draw.
    #[error("the solving oracle returned an invalid assignment: {0}")]
    Decode(#[from] DecodeError),
    /// The roster cannot be encoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// The sink refused the assignment; nothing was saved.
    #[error("the assignment could not be saved: {0}")]
    PersistenceConflict(String),
    /// The roster provider failed.
    #[error(transparent)]
    Store(StoreError),
}

impl From<OperatorError> for DrawError {
    fn from(err: OperatorError) -> Self {
        match err {
            OperatorError::Io(err) => DrawError::OperatorChannel(err),
            closed => DrawError::InvalidInput(closed),
        }
    }
}

impl From<StoreError> for DrawError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => DrawError::PersistenceConflict(reason),
            other => DrawError::Store(other),
        }
    }
}

impl DrawError {
    /// Process exit status for this failure: 1 when no assignment exists, 2 when the oracle misbehaved, 3 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            DrawError::Unsatisfiable => 1,
            DrawError::OracleFailure(_) | DrawError::Decode(_) => 2,
            _ => 3,
        }
    }
}

/// Tunables of a draw.
#[derive(Clone, Copy, Debug, Default)]
pub struct DrawOptions {
    /// Which earlier years may not be repeated.
    pub lookback: Lookback,
}

/// The result of solving one draw.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SolveOutcome {
    /// No assignment exists. This is a legitimate answer, not a failure of the oracle.
    Unsatisfiable,
    /// One pair per participant, ordered by giver.
    Assignment(Vec<Pairing>),
}

/// Encode, solve and decode one draw without touching storage or the operator.
pub fn solve(
    oracle: &impl Oracle,
    roster: &Roster,
    history: &[HistoricalPair],
    clusters: &[Cluster],
    lookback: Lookback,
) -> Result<SolveOutcome, DrawError> {
    let encoder = PairEncoder::new(roster.len())?;
    // clusters entered for another roster would index past this one
    for cluster in clusters {
        if let Some(&index) = cluster.members().iter().find(|&&index| index >= roster.len()) {
            return Err(InvalidInput::IndexOutOfRange { index, size: roster.len() }.into());
        }
    }

    let mut instance = ConstraintInstance::new(&encoder);
    instance.extend(all_rules(&encoder, roster, history, lookback, clusters));

    match oracle.solve(&instance)? {
        Verdict::Unsatisfiable => Ok(SolveOutcome::Unsatisfiable),
        Verdict::Satisfiable(model) => Ok(SolveOutcome::Assignment(decode_assignment(&encoder, roster, &model)?)),
    }
}

/// Where an [`Orchestrator`] run is.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum DrawState {
    /// Choosing a group and reading its members and history.
    CollectingRoster,
    /// Asking for the year and clusters.
    CollectingConstraints,
    /// Waiting on the oracle.
    Solving,
    /// Writing the assignment.
    Persisting,
    /// Giving up with an error.
    ReportingFailure,
}

/// A recorded draw.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DrawReport {
    /// The group drawn.
    pub group: Group,
    /// The year drawn for.
    pub year: Year,
    /// Who buys for whom, ordered by giver.
    pub pairs: Vec<Pairing>,
}

/// Runs a whole draw: roster, operator constraints, oracle, then persistence.
pub struct Orchestrator<'a, S, O> {
    store: &'a mut S,
    oracle: O,
    options: DrawOptions,
    state: DrawState,
}

impl<'a, S: RosterProvider + AssignmentSink, O: Oracle> Orchestrator<'a, S, O> {
    /// Draw from and into `store`, solving with `oracle`.
    pub fn new(store: &'a mut S, oracle: O, options: DrawOptions) -> Self {
        Self { store, oracle, options, state: DrawState::CollectingRoster }
    }

    /// The state the last run reached.
    pub fn state(&self) -> DrawState {
        self.state
    }

    /// Draw one group. On success the pairs have been committed and the group's year advanced; on any error nothing
    /// was written.
    pub fn run(&mut self, mut operator: impl Operator) -> Result<DrawReport, DrawError> {
        self.state = DrawState::CollectingRoster;
        let result = self.draw(&mut operator);
        if let Err(err) = &result {
            self.enter(DrawState::ReportingFailure);
            warn!(%err, "draw failed");
        }
        result
    }

    fn enter(&mut self, state: DrawState) {
        debug!(from = %self.state, to = %state, "draw state");
        self.state = state;
    }

    fn draw(&mut self, operator: &mut impl Operator) -> Result<DrawReport, DrawError> {
        let groups = self.store.pending_groups()?;
        if groups.is_empty() {
            return Err(DrawError::NothingToDraw);
        }
        let group = operator.choose_group(&groups)?;
        let roster = self.store.roster(group.id)?;
        let history = self.store.history(group.id)?;
        let latest = self.store.latest_year(group.id)?;
        debug!(group = group.id, members = roster.len(), history = history.len(), ?latest, "roster collected");

        self.enter(DrawState::CollectingConstraints);
        let year = operator.choose_year(&group, latest)?;
        let clusters = operator.collect_clusters(&roster)?;

        self.enter(DrawState::Solving);
        let pairs = match solve(&self.oracle, &roster, &history, &clusters, self.options.lookback)? {
            SolveOutcome::Assignment(pairs) => pairs,
            SolveOutcome::Unsatisfiable => return Err(DrawError::Unsatisfiable),
        };

        self.enter(DrawState::Persisting);
        self.store.commit(group.id, year, &pairs)?;
        info!(group = group.id, year, pairs = pairs.len(), "draw complete");

        Ok(DrawReport { group, year, pairs })
    }
}
