//! Random 1v1 pairing of a roster.

use crate::models::Participant;
use rand::{Rng, rngs::ThreadRng, seq::SliceRandom};
use std::{fmt, iter::FusedIterator, vec};

/// One line of the pairing announcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pairing {
    Match {
        home: Participant,
        away: Participant,
    },
    /// Odd participant out advances without playing
    Bye(Participant),
}

impl Pairing {
    pub fn is_bye(&self) -> bool {
        matches!(self, Pairing::Bye(_))
    }

    pub fn participants(&self) -> Vec<&Participant> {
        match self {
            Pairing::Match { home, away } => vec![home, away],
            Pairing::Bye(p) => vec![p],
        }
    }
}

impl fmt::Display for Pairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pairing::Match { home, away } => {
                write!(f, "{} VS {}", home.display_name, away.display_name)
            }
            Pairing::Bye(p) => write!(f, "{} advances automatically (bye)", p.display_name),
        }
    }
}

/// One-shot sequence of pairings over an already shuffled roster.
///
/// Pairs are consumed front to back; a trailing odd participant becomes a bye.
#[derive(Debug)]
pub struct Pairings {
    remaining: vec::IntoIter<Participant>,
}

impl Iterator for Pairings {
    type Item = Pairing;

    fn next(&mut self) -> Option<Pairing> {
        let home = self.remaining.next()?;
        Some(match self.remaining.next() {
            Some(away) => Pairing::Match { home, away },
            None => Pairing::Bye(home),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.len().div_ceil(2);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Pairings {}
impl FusedIterator for Pairings {}

/// Shuffles rosters into pairings
pub struct PairingGenerator<R = ThreadRng> {
    rng: R,
}

impl PairingGenerator<ThreadRng> {
    pub fn new() -> Self {
        Self { rng: rand::rng() }
    }
}

impl Default for PairingGenerator<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> PairingGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Uniformly shuffle `roster` and pair it up; every call reshuffles
    pub fn generate(&mut self, roster: &[Participant]) -> Pairings {
        let mut shuffled = roster.to_vec();
        shuffled.shuffle(&mut self.rng);
        Pairings {
            remaining: shuffled.into_iter(),
        }
    }
}
