use std::path::PathBuf;

use thiserror::Error;

use crate::participant::{Group, GroupId, HistoricalPair, Pairing, Roster, Year};

/// Failures reading or writing group data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file is not there; it is never created implicitly.
    #[error("database {} does not exist", .0.display())]
    MissingDatabase(PathBuf),
    /// The group has nobody in it.
    #[error("there are no users in group {0}")]
    EmptyGroup(GroupId),
    /// A write was refused, e.g. a gift for that giver and year is already recorded. Nothing was written.
    #[error("write rejected: {0}")]
    Conflict(String),
    /// Any other database failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Source of the groups, members and past gifts a draw is made from.
pub trait RosterProvider {
    /// Groups which have not been drawn for the current year.
    fn pending_groups(&self) -> Result<Vec<Group>, StoreError>;
    /// Members of `group` in a stable order. An empty group is an error.
    fn roster(&self, group: GroupId) -> Result<Roster, StoreError>;
    /// Every gift previously recorded for `group`.
    fn history(&self, group: GroupId) -> Result<Vec<HistoricalPair>, StoreError>;
    /// The latest year drawn for `group`, if any.
    fn latest_year(&self, group: GroupId) -> Result<Option<Year>, StoreError>;
}

/// Destination of a finished draw.
pub trait AssignmentSink {
    /// Record every pair for `group` in `year` and mark the group as drawn for `year`.
    ///
    /// Either all of it is written or none of it is.
    fn commit(&mut self, group: GroupId, year: Year, pairs: &[Pairing]) -> Result<(), StoreError>;
}
