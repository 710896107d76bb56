use itertools::Itertools;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use thiserror::Error;

use crate::encoding::{EncodingError, PairEncoder};
use crate::oracle::Model;
use crate::participant::{Pairing, Roster, RosterIndex};

/// A model that does not describe a valid draw. Seeing one means the oracle or the clause generation is broken.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum DecodeError {
    /// A true variable outside the pair numbering.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// The encoder and roster disagree on the number of participants.
    #[error("encoder covers {encoder} participants but the roster has {roster}")]
    RosterMismatch {
        /// Size the encoder was built for.
        encoder: usize,
        /// Size of the roster given.
        roster: usize,
    },
    /// Someone buys for themselves.
    #[error("participant {0} buys for themselves")]
    SelfGift(RosterIndex),
    /// Someone buys no gift, or more than one.
    #[error("participant {index} buys {count} gifts")]
    GiverCount {
        /// Roster index of the giver.
        index: RosterIndex,
        /// Gifts bought in the model.
        count: usize,
    },
    /// Someone receives no gift, or more than one.
    #[error("participant {index} receives {count} gifts")]
    ReceiverCount {
        /// Roster index of the receiver.
        index: RosterIndex,
        /// Gifts received in the model.
        count: usize,
    },
}

/// Read the pairs out of a satisfying `model`, ordered by giver.
///
/// The uniqueness and no-self-gift clauses guarantee the result is a derangement of `roster`; this is checked anyway
/// and a violation reported as a [`DecodeError`].
pub fn decode_assignment(encoder: &PairEncoder, roster: &Roster, model: &Model) -> Result<Vec<Pairing>, DecodeError> {
    if encoder.size() != roster.len() {
        return Err(DecodeError::RosterMismatch { encoder: encoder.size(), roster: roster.len() });
    }

    let mut gifts: DiGraphMap<RosterIndex, ()> = DiGraphMap::with_capacity(encoder.size(), encoder.size());
    encoder.indices().for_each(|index| { gifts.add_node(index); });
    for var in model.true_vars() {
        let (giver, receiver) = encoder.decode(var)?;
        gifts.add_edge(giver, receiver, ());
    }

    check_derangement(&gifts)?;

    Ok(gifts.all_edges()
        .map(|(giver, receiver, _)| (giver, receiver))
        .sorted()
        .filter_map(|(giver, receiver)| Some(Pairing {
            giver: roster.get(giver)?.clone(),
            receiver: roster.get(receiver)?.clone(),
        }))
        .collect())
}

/// Every node has exactly one outgoing and one incoming edge, and none is a self loop.
fn check_derangement(gifts: &DiGraphMap<RosterIndex, ()>) -> Result<(), DecodeError> {
    for index in gifts.nodes().sorted() {
        if gifts.contains_edge(index, index) {
            return Err(DecodeError::SelfGift(index));
        }

        let count = gifts.neighbors_directed(index, Direction::Outgoing).count();
        if count != 1 {
            return Err(DecodeError::GiverCount { index, count });
        }

        let count = gifts.neighbors_directed(index, Direction::Incoming).count();
        if count != 1 {
            return Err(DecodeError::ReceiverCount { index, count });
        }
    }

    Ok(())
}
