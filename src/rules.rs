//! Clause generators for a draw.
//!
//! Let `x(g, r)` be the variable from [`PairEncoder`] stating that giver `g` buys for receiver `r`.
//! A satisfying assignment of everything generated here is exactly a permutation of the roster with no fixed points
//! (a derangement) which also avoids every barred pair.

use itertools::Itertools;
use tracing::debug;

use crate::encoding::PairEncoder;
use crate::logic::{exactly_one, forbid, Clause};
use crate::participant::{Cluster, HistoricalPair, Lookback, Roster};

/// Every receiver gets exactly one gift: for each `r`, exactly one `x(g, r)` over all `g`.
pub fn receiver_uniqueness(encoder: &PairEncoder) -> Vec<Clause> {
    encoder.indices()
        .flat_map(|receiver| exactly_one(
            encoder.indices()
                .map(|giver| encoder.pair_var(giver, receiver).positive())
                .collect_vec()
        ))
        .collect()
}

/// Every giver buys exactly one gift: for each `g`, exactly one `x(g, r)` over all `r`.
pub fn giver_uniqueness(encoder: &PairEncoder) -> Vec<Clause> {
    encoder.indices()
        .flat_map(|giver| exactly_one(
            encoder.indices()
                .map(|receiver| encoder.pair_var(giver, receiver).positive())
                .collect_vec()
        ))
        .collect()
}

/// Nobody buys for themselves: `!x(i, i)` for each `i`.
///
/// With a single participant this contradicts both uniqueness rules, so such a draw is unsatisfiable.
pub fn no_self_gift(encoder: &PairEncoder) -> Vec<Clause> {
    encoder.indices()
        .map(|i| forbid(encoder.pair_var(i, i)))
        .collect()
}

/// The three rules every draw obeys, regardless of history or clusters.
pub fn game_rules(encoder: &PairEncoder) -> Vec<Clause> {
    let mut clauses = receiver_uniqueness(encoder);
    clauses.extend(giver_uniqueness(encoder));
    clauses.extend(no_self_gift(encoder));
    clauses
}

/// Forbid repeating any gift from `history` given in or after the year chosen by `lookback`.
///
/// Pairs naming someone no longer on the roster cannot recur and are skipped.
pub fn historical_exclusion(encoder: &PairEncoder, roster: &Roster, history: &[HistoricalPair], lookback: Lookback) -> Vec<Clause> {
    let Some(boundary) = lookback.boundary(history) else {
        return Vec::new();
    };

    history.iter()
        .filter(|pair| pair.year >= boundary)
        .filter_map(|pair| match (roster.index_of(pair.giver), roster.index_of(pair.receiver)) {
            (Some(giver), Some(receiver)) => Some(forbid(encoder.pair_var(giver, receiver))),
            _ => {
                debug!(giver = pair.giver, receiver = pair.receiver, year = pair.year, "skipping past gift outside the roster");
                None
            }
        })
        .collect()
}

/// Forbid gifts in either direction between any two distinct members of the same cluster.
///
/// Clusters are validated against the roster size when constructed; a cluster built for a larger roster is a caller bug.
pub fn cluster_exclusion(encoder: &PairEncoder, clusters: &[Cluster]) -> Vec<Clause> {
    clusters.iter()
        .flat_map(|cluster| cluster.barred_pairs())
        .flat_map(|pair| [(pair.0, pair.1), (pair.1, pair.0)])
        .map(|(santa, receiver)| forbid(encoder.pair_var(santa, receiver)))
        .collect()
}

/// All clauses for a draw: [`game_rules`], [`historical_exclusion`] and [`cluster_exclusion`].
pub(crate) fn all_rules(
    encoder: &PairEncoder,
    roster: &Roster,
    history: &[HistoricalPair],
    lookback: Lookback,
    clusters: &[Cluster],
) -> Vec<Clause> {
    let game = game_rules(encoder);
    let past = historical_exclusion(encoder, roster, history, lookback);
    let custom = cluster_exclusion(encoder, clusters);
    debug!(game = game.len(), history = past.len(), clusters = custom.len(), "generated clauses");

    let mut clauses = Vec::with_capacity(game.len() + past.len() + custom.len());
    clauses.extend(game);
    clauses.extend(past);
    clauses.extend(custom);
    clauses
}
