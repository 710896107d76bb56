use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};

use itertools::Itertools;
use thiserror::Error;
use unordered_pair::UnorderedPair;

/// Stable row identity of a participant, as handed out by the roster provider.
pub type ParticipantId = i64;
/// Identity of a gift exchange group.
pub type GroupId = i64;
/// Calendar year a draw belongs to.
pub type Year = i64;
/// Position of a participant within a [`Roster`].
pub type RosterIndex = usize;

/// Reasons a line typed by the operator was refused. All of these are recoverable; the operator is asked again.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum InvalidInput {
    /// Something that should have been an integer was not.
    #[error("`{0}` is not a number")]
    NotANumber(String),
    /// Draw years only move forward.
    #[error("year {year} is not after {latest}, the latest year already drawn")]
    YearNotAfter {
        /// The year entered.
        year: Year,
        /// The latest year already drawn for the group.
        latest: Year,
    },
    /// A cluster named a position the roster does not have.
    #[error("index {index} is not on a roster of {size}")]
    IndexOutOfRange {
        /// The offending index.
        index: RosterIndex,
        /// Number of participants on the roster.
        size: usize,
    },
    /// A cluster line with no members.
    #[error("a cluster needs at least one member")]
    EmptyCluster,
    /// The operator picked a group which is not up for drawing.
    #[error("`{0}` is not one of the listed groups")]
    UnknownGroup(String),
}

/// Someone taking part in the exchange.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Participant {
    /// Identity assigned by the roster provider.
    pub id: ParticipantId,
    /// Display name.
    pub name: String,
}

impl Participant {
    /// Construct a participant from its identity and display name.
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

impl Display for Participant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A gift exchange group as listed to the operator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Group {
    /// Identity assigned by the roster provider.
    pub id: GroupId,
    /// Display name.
    pub name: String,
}

/// The ordered members of one group.
///
/// The position of each participant is fixed for the lifetime of the roster; variable numbering in
/// [`PairEncoder`](crate::PairEncoder) is derived from these positions.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    participants: Vec<Participant>,
    // participant id -> position
    positions: HashMap<ParticipantId, RosterIndex>,
}

impl Roster {
    /// Fix the order of `participants`; the first becomes index 0.
    pub fn new(participants: Vec<Participant>) -> Self {
        let positions = participants.iter()
            .enumerate()
            .map(|(index, participant)| (participant.id, index))
            .collect();

        Self { participants, positions }
    }

    /// Number of participants, `N`.
    #[inline]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether the roster has no participants at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// The participant at `index`.
    pub fn get(&self, index: RosterIndex) -> Option<&Participant> {
        self.participants.get(index)
    }

    /// Position of the participant with this `id`, if they are on the roster.
    pub fn index_of(&self, id: ParticipantId) -> Option<RosterIndex> {
        self.positions.get(&id).copied()
    }

    /// Participants in roster order.
    pub fn iter(&self) -> impl Iterator<Item=&Participant> {
        self.participants.iter()
    }
}

impl FromIterator<Participant> for Roster {
    fn from_iter<T: IntoIterator<Item=Participant>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// One gift given in an earlier year.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct HistoricalPair {
    /// Who bought the gift.
    pub giver: ParticipantId,
    /// Who received it.
    pub receiver: ParticipantId,
    /// The draw the gift belonged to.
    pub year: Year,
}

/// A set of roster positions who may not draw one another, e.g. members of one household.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cluster {
    members: Vec<RosterIndex>,
}

impl Cluster {
    /// Build a cluster over a roster of `roster_size` participants.
    ///
    /// Repeated members are tolerated and collapse into one.
    pub fn new(members: impl IntoIterator<Item=RosterIndex>, roster_size: usize) -> Result<Self, InvalidInput> {
        let members = members.into_iter().unique().collect_vec();
        if members.is_empty() {
            return Err(InvalidInput::EmptyCluster);
        }

        if let Some(index) = members.iter().find(|index| **index >= roster_size) {
            return Err(InvalidInput::IndexOutOfRange { index: *index, size: roster_size });
        }

        Ok(Self { members })
    }

    /// Parse a whitespace separated list of roster indices such as `0 3 4`.
    pub fn parse(line: &str, roster_size: usize) -> Result<Self, InvalidInput> {
        let members = line.split_whitespace()
            .map(|token| token.parse::<RosterIndex>().map_err(|_| InvalidInput::NotANumber(token.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(members, roster_size)
    }

    /// Distinct members in the order they were entered.
    pub fn members(&self) -> &[RosterIndex] {
        &self.members
    }

    /// Every pair of distinct members; each pair bars a gift in both directions.
    pub fn barred_pairs(&self) -> impl Iterator<Item=UnorderedPair<RosterIndex>> + '_ {
        self.members.iter()
            .tuple_combinations()
            .map(|(a, b)| UnorderedPair(*a, *b))
    }
}

/// Which earlier draws are off limits when drawing again.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Lookback {
    /// Only pairs from the most recent year already drawn.
    #[default]
    Latest,
    /// Pairs from the given number of most recent drawn years.
    Years(std::num::NonZero<usize>),
    /// Every pair ever drawn for the group.
    All,
}

impl Lookback {
    /// The earliest year whose pairs are still excluded, or `None` if nothing is excluded because there is no history.
    pub fn boundary(&self, history: &[HistoricalPair]) -> Option<Year> {
        let years = history.iter()
            .map(|pair| pair.year)
            .collect::<HashSet<_>>()
            .into_iter()
            .sorted_unstable_by(|a, b| b.cmp(a))
            .collect_vec();

        match self {
            Lookback::Latest => years.first().copied(),
            Lookback::Years(count) => years.get(count.get() - 1).or(years.last()).copied(),
            Lookback::All => years.last().copied(),
        }
    }
}

impl std::str::FromStr for Lookback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(Lookback::Latest),
            "all" => Ok(Lookback::All),
            other => other.strip_prefix("years:")
                .and_then(|count| count.parse::<usize>().ok())
                .and_then(std::num::NonZero::new)
                .map(Lookback::Years)
                .ok_or_else(|| format!("expected `latest`, `all` or `years:N` with N >= 1, got `{other}`")),
        }
    }
}

/// Parse a year typed by the operator, which must come strictly after `latest` if any year has been drawn.
pub fn parse_year(line: &str, latest: Option<Year>) -> Result<Year, InvalidInput> {
    let trimmed = line.trim();
    let year = trimmed.parse::<Year>().map_err(|_| InvalidInput::NotANumber(trimmed.to_string()))?;

    match latest {
        Some(latest) if year <= latest => Err(InvalidInput::YearNotAfter { year, latest }),
        _ => Ok(year),
    }
}

/// A decided gift: `giver` buys for `receiver`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Pairing {
    /// The participant buying the gift.
    pub giver: Participant,
    /// The participant receiving it.
    pub receiver: Participant,
}

impl Display for Pairing {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.giver, self.receiver)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;

    use super::*;

    fn history(years: &[Year]) -> Vec<HistoricalPair> {
        years.iter().map(|year| HistoricalPair { giver: 1, receiver: 2, year: *year }).collect()
    }

    #[test]
    fn roster_positions_follow_order() {
        let roster = Roster::new(vec![Participant::new(7, "Ada"), Participant::new(3, "Bo")]);
        assert_eq!(roster.index_of(7), Some(0));
        assert_eq!(roster.index_of(3), Some(1));
        assert_eq!(roster.index_of(4), None);
        assert_eq!(roster.get(1).map(|p| p.name.as_str()), Some("Bo"));
    }

    #[test]
    fn cluster_parses_indices() {
        let cluster = Cluster::parse(" 0 2  3 ", 4).unwrap();
        assert_eq!(cluster.members(), &[0, 2, 3]);
        assert_eq!(cluster.barred_pairs().count(), 3);
    }

    #[test]
    fn cluster_collapses_repeats() {
        let cluster = Cluster::parse("1 1 0", 2).unwrap();
        assert_eq!(cluster.members(), &[1, 0]);
    }

    #[test]
    fn cluster_rejects_bad_input() {
        assert_eq!(Cluster::parse("0 4", 4), Err(InvalidInput::IndexOutOfRange { index: 4, size: 4 }));
        assert_eq!(Cluster::parse("0 x", 4), Err(InvalidInput::NotANumber("x".to_string())));
        assert_eq!(Cluster::parse("-1", 4), Err(InvalidInput::NotANumber("-1".to_string())));
        assert_eq!(Cluster::parse("   ", 4), Err(InvalidInput::EmptyCluster));
    }

    #[test]
    fn year_must_advance() {
        assert_eq!(parse_year("2024\n", Some(2023)), Ok(2024));
        assert_eq!(parse_year("2023", Some(2023)), Err(InvalidInput::YearNotAfter { year: 2023, latest: 2023 }));
        assert_eq!(parse_year("1999", None), Ok(1999));
        assert_eq!(parse_year("soon", None), Err(InvalidInput::NotANumber("soon".to_string())));
    }

    #[test]
    fn lookback_boundaries() {
        let past = history(&[2020, 2022, 2021, 2022]);
        assert_eq!(Lookback::Latest.boundary(&past), Some(2022));
        assert_eq!(Lookback::Years(NonZero::new(2).unwrap()).boundary(&past), Some(2021));
        assert_eq!(Lookback::Years(NonZero::new(10).unwrap()).boundary(&past), Some(2020));
        assert_eq!(Lookback::All.boundary(&past), Some(2020));
        assert_eq!(Lookback::Latest.boundary(&[]), None);
    }

    #[test]
    fn lookback_from_str() {
        assert_eq!("latest".parse(), Ok(Lookback::Latest));
        assert_eq!("all".parse(), Ok(Lookback::All));
        assert_eq!("years:3".parse(), Ok(Lookback::Years(NonZero::new(3).unwrap())));
        assert!("years:0".parse::<Lookback>().is_err());
        assert!("forever".parse::<Lookback>().is_err());
    }
}
