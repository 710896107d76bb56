use std::num::NonZero;

use thiserror::Error;
use varisat::Var;

use crate::participant::RosterIndex;

/// Reasons the pair encoding may refuse its input.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum EncodingError {
    /// There must be at least one participant to number pairs over.
    #[error("cannot encode pairs over an empty roster")]
    EmptyRoster,
    /// `N²` does not fit in a variable id.
    #[error("a roster of {0} participants is too large to encode")]
    TooLarge(usize),
    /// A giver or receiver index at or beyond `N`.
    #[error("pair ({giver}, {receiver}) is outside a roster of {size}")]
    PairOutOfRange {
        /// Giver index as requested.
        giver: RosterIndex,
        /// Receiver index as requested.
        receiver: RosterIndex,
        /// Roster size `N`.
        size: usize,
    },
    /// A DIMACS variable id outside `1..=N²`.
    #[error("variable {variable} is outside 1..={count}")]
    VariableOutOfRange {
        /// The id, in DIMACS numbering.
        variable: isize,
        /// Number of variables in the encoding, `N²`.
        count: usize,
    },
}

/// Numbering of "giver buys for receiver" statements over a roster of `N` participants.
///
/// The pair `(g, r)` is the DIMACS variable `1 + g + N*r`, so every variable in `1..=N²` names exactly one pair and
/// [`Self::decode`] is the exact inverse of [`Self::encode`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PairEncoder {
    size: NonZero<usize>,
}

impl PairEncoder {
    /// An encoder for a roster of `size` participants.
    pub fn new(size: usize) -> Result<Self, EncodingError> {
        let size = NonZero::new(size).ok_or(EncodingError::EmptyRoster)?;
        if size.get().checked_mul(size.get()).filter(|count| *count <= Var::max_count()).is_none() {
            return Err(EncodingError::TooLarge(size.get()));
        }

        Ok(Self { size })
    }

    /// Roster size `N`.
    #[inline]
    pub fn size(&self) -> usize {
        self.size.get()
    }

    /// Number of pair variables, `N²`.
    #[inline]
    pub fn var_count(&self) -> usize {
        self.size() * self.size()
    }

    /// Every valid roster index, `0..N`.
    #[inline]
    pub fn indices(&self) -> std::ops::Range<RosterIndex> {
        0..self.size()
    }

    /// The variable meaning "`giver` buys for `receiver`".
    pub fn encode(&self, giver: RosterIndex, receiver: RosterIndex) -> Result<Var, EncodingError> {
        if giver >= self.size() || receiver >= self.size() {
            return Err(EncodingError::PairOutOfRange { giver, receiver, size: self.size() });
        }

        Ok(self.pair_var(giver, receiver))
    }

    /// The `(giver, receiver)` pair a variable stands for.
    pub fn decode(&self, var: Var) -> Result<(RosterIndex, RosterIndex), EncodingError> {
        // Var::index() is the DIMACS id minus one
        let index = var.index();
        if index >= self.var_count() {
            return Err(EncodingError::VariableOutOfRange { variable: var.to_dimacs(), count: self.var_count() });
        }

        Ok((index % self.size(), index / self.size()))
    }

    /// [`Self::encode`] for indices already known to be in range, such as those drawn from [`Self::indices`].
    #[inline]
    pub(crate) fn pair_var(&self, giver: RosterIndex, receiver: RosterIndex) -> Var {
        debug_assert!(giver < self.size() && receiver < self.size());
        Var::from_index(giver + self.size() * receiver)
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn numbering_matches_dimacs_layout() {
        let encoder = PairEncoder::new(4).unwrap();
        assert_eq!(encoder.encode(0, 0).unwrap().to_dimacs(), 1);
        assert_eq!(encoder.encode(3, 0).unwrap().to_dimacs(), 4);
        assert_eq!(encoder.encode(0, 1).unwrap().to_dimacs(), 5);
        assert_eq!(encoder.encode(2, 3).unwrap().to_dimacs(), 1 + 2 + 4 * 3);
        assert_eq!(encoder.encode(3, 3).unwrap().to_dimacs(), 16);
    }

    #[test]
    fn covers_every_variable_once() {
        let encoder = PairEncoder::new(5).unwrap();
        let ids = encoder.indices()
            .cartesian_product(encoder.indices())
            .map(|(g, r)| encoder.encode(g, r).unwrap().to_dimacs())
            .sorted()
            .collect_vec();

        assert_eq!(ids, (1..=25).collect_vec());
    }

    #[test]
    fn decode_inverts_encode() {
        let encoder = PairEncoder::new(3).unwrap();
        for (g, r) in encoder.indices().cartesian_product(encoder.indices()) {
            assert_eq!(encoder.decode(encoder.encode(g, r).unwrap()), Ok((g, r)));
        }
    }

    #[test]
    fn rejects_out_of_range() {
        let encoder = PairEncoder::new(3).unwrap();
        assert_eq!(encoder.encode(3, 0), Err(EncodingError::PairOutOfRange { giver: 3, receiver: 0, size: 3 }));
        assert_eq!(encoder.encode(0, 7), Err(EncodingError::PairOutOfRange { giver: 0, receiver: 7, size: 3 }));
        assert_eq!(encoder.decode(Var::from_dimacs(10)), Err(EncodingError::VariableOutOfRange { variable: 10, count: 9 }));
        assert_eq!(PairEncoder::new(0), Err(EncodingError::EmptyRoster));
        assert_eq!(PairEncoder::new(usize::MAX), Err(EncodingError::TooLarge(usize::MAX)));
    }
}
