//! Nucleotide alphabet, Watson-Crick pairing and sequence helpers.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use crate::error::{MotifError, Result};

/// One of the four DNA bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Nucleotide {
    A,
    T,
    C,
    G,
}

impl Nucleotide {
    /// All bases, in the order candidates are scored and sampled.
    pub const ALL: [Nucleotide; 4] = [Nucleotide::A, Nucleotide::T, Nucleotide::C, Nucleotide::G];

    /// Watson-Crick partner: A<->T, C<->G.
    pub fn complement(self) -> Nucleotide {
        match self {
            Nucleotide::A => Nucleotide::T,
            Nucleotide::T => Nucleotide::A,
            Nucleotide::C => Nucleotide::G,
            Nucleotide::G => Nucleotide::C,
        }
    }

    pub fn is_gc(self) -> bool {
        matches!(self, Nucleotide::G | Nucleotide::C)
    }

    pub fn from_char(symbol: char) -> Result<Nucleotide> {
        match symbol.to_ascii_uppercase() {
            'A' => Ok(Nucleotide::A),
            'T' => Ok(Nucleotide::T),
            'C' => Ok(Nucleotide::C),
            'G' => Ok(Nucleotide::G),
            _ => Err(MotifError::InvalidNucleotide { symbol }),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Nucleotide::A => 'A',
            Nucleotide::T => 'T',
            Nucleotide::C => 'C',
            Nucleotide::G => 'G',
        }
    }

    fn bit(self) -> u8 {
        match self {
            Nucleotide::A => 0b0001,
            Nucleotide::T => 0b0010,
            Nucleotide::C => 0b0100,
            Nucleotide::G => 0b1000,
        }
    }
}

impl fmt::Display for Nucleotide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// An ordered run of nucleotides: a key, a payload, or a prefix of one.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sequence(Vec<Nucleotide>);

impl Sequence {
    pub fn new() -> Self {
        Sequence(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Sequence(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, base: Nucleotide) {
        self.0.push(base);
    }

    /// Copy of this sequence with `base` appended.
    pub fn extended(&self, base: Nucleotide) -> Sequence {
        let mut bases = Vec::with_capacity(self.0.len() + 1);
        bases.extend_from_slice(&self.0);
        bases.push(base);
        Sequence(bases)
    }

    pub fn as_slice(&self) -> &[Nucleotide] {
        &self.0
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl Deref for Sequence {
    type Target = [Nucleotide];

    fn deref(&self) -> &[Nucleotide] {
        &self.0
    }
}

impl From<Vec<Nucleotide>> for Sequence {
    fn from(bases: Vec<Nucleotide>) -> Self {
        Sequence(bases)
    }
}

impl FromIterator<Nucleotide> for Sequence {
    fn from_iter<I: IntoIterator<Item = Nucleotide>>(iter: I) -> Self {
        Sequence(iter.into_iter().collect())
    }
}

impl FromStr for Sequence {
    type Err = MotifError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim().chars().map(Nucleotide::from_char).collect()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for base in &self.0 {
            write!(f, "{}", base.as_char())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Number of G/C bases in `bases`.
pub fn gc_count(bases: &[Nucleotide]) -> usize {
    bases.iter().filter(|b| b.is_gc()).count()
}

/// Length of the maximal run of identical bases ending at the last base.
pub fn trailing_run(bases: &[Nucleotide]) -> usize {
    match bases.last() {
        Some(&last) => bases.iter().rev().take_while(|&&b| b == last).count(),
        None => 0,
    }
}

/// Length of the leading run of `base` at the start of `bases`.
pub fn leading_run_of(bases: &[Nucleotide], base: Nucleotide) -> usize {
    bases.iter().take_while(|&&b| b == base).count()
}

/// A subset of the four nucleotides, stored as a 4-bit mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaseSet(u8);

impl BaseSet {
    pub fn insert(&mut self, base: Nucleotide) {
        self.0 |= base.bit();
    }

    pub fn contains(self, base: Nucleotide) -> bool {
        self.0 & base.bit() != 0
    }

    /// Copy of this set with `base` added.
    pub fn with(self, base: Nucleotide) -> BaseSet {
        BaseSet(self.0 | base.bit())
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_full(self) -> bool {
        self.0 == 0b1111
    }

    /// Number of bases not in the set.
    pub fn missing(self) -> usize {
        4 - self.len()
    }

    pub fn union(self, other: BaseSet) -> BaseSet {
        BaseSet(self.0 | other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complement_is_involution() {
        for base in Nucleotide::ALL {
            assert_eq!(base.complement().complement(), base);
            assert_ne!(base.complement(), base);
        }
        assert_eq!(Nucleotide::A.complement(), Nucleotide::T);
        assert_eq!(Nucleotide::C.complement(), Nucleotide::G);
    }

    #[test]
    fn test_parse_and_display() {
        let seq: Sequence = "gaTC".parse().unwrap();
        assert_eq!(seq.len(), 4);
        assert_eq!(seq.to_string(), "GATC");
        assert_eq!(format!("{seq:?}"), "\"GATC\"");
    }

    #[test]
    fn test_parse_rejects_unknown_symbol() {
        let err = "GANT".parse::<Sequence>().unwrap_err();
        assert_eq!(err, MotifError::InvalidNucleotide { symbol: 'N' });
    }

    #[test]
    fn test_runs_and_gc() {
        let seq: Sequence = "GGATTT".parse().unwrap();
        assert_eq!(trailing_run(&seq), 3);
        assert_eq!(leading_run_of(&seq, Nucleotide::G), 2);
        assert_eq!(leading_run_of(&seq, Nucleotide::A), 0);
        assert_eq!(gc_count(&seq), 2);
        assert_eq!(trailing_run(&[]), 0);
    }

    #[test]
    fn test_extended_leaves_original_untouched() {
        let seq: Sequence = "AC".parse().unwrap();
        let longer = seq.extended(Nucleotide::G);
        assert_eq!(seq.to_string(), "AC");
        assert_eq!(longer.to_string(), "ACG");
    }

    #[test]
    fn test_base_set() {
        let mut set = BaseSet::default();
        assert!(set.is_empty());
        set.insert(Nucleotide::A);
        set.insert(Nucleotide::A);
        set.insert(Nucleotide::G);
        assert_eq!(set.len(), 2);
        assert_eq!(set.missing(), 2);
        assert!(set.contains(Nucleotide::G));
        assert!(!set.contains(Nucleotide::T));
        assert!(!set.with(Nucleotide::T).is_full());
        assert!(set.with(Nucleotide::T).with(Nucleotide::C).is_full());
        // `with` does not mutate
        assert_eq!(set.len(), 2);
    }
}
