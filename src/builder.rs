//! Incremental, base-by-base sequence construction.
//!
//! A sequence starts empty and grows one nucleotide at a time. At every step
//! the four candidates are scored by the active constraints, the log-scores
//! are exponentiated into unnormalised probabilities and one base is drawn.
//! When every candidate is forbidden the attempt is abandoned.

use indexmap::IndexSet;
use log::{debug, warn};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constraints::{ActiveConstraints, ConstraintKind};
use crate::hyperparameters::Hyperparameters;
use crate::nucleotide::{Nucleotide, Sequence};

/// Per-role scoring used by [`SequenceBuilder`].
pub trait RoleScorer {
    /// Length every finished sequence of this role must have.
    fn target_len(&self) -> usize;

    /// Unweighted log-score of `candidate` (prefix plus the base under
    /// consideration) for one constraint. Constraints that do not apply to
    /// the role score 0.
    fn log_score(&self, kind: ConstraintKind, candidate: &[Nucleotide]) -> f64;

    fn similarity_log_score(&self, candidate: &[Nucleotide]) -> f64;

    /// Add a finished sequence to the collection. Returns false for a
    /// duplicate or a sequence of the wrong length.
    fn register(&mut self, sequence: Sequence) -> bool;
}

/// Create the generator used for sampling; seeded runs are reproducible.
pub fn create_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Grows sequences for one role and keeps its scorer's statistics current.
pub struct SequenceBuilder<S> {
    scorer: S,
    hyperparameters: Hyperparameters,
    attempts: usize,
}

impl<S: RoleScorer> SequenceBuilder<S> {
    pub fn new(scorer: S, hyperparameters: Hyperparameters, attempts: usize) -> Self {
        SequenceBuilder {
            scorer,
            hyperparameters,
            attempts,
        }
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    pub fn into_scorer(self) -> S {
        self.scorer
    }

    /// Weighted sum of the active constraints' log-scores for `candidate`.
    ///
    /// Stops at the first constraint that forbids the candidate. The hairpin
    /// constraint brings the similarity score along with it.
    pub fn combined_log_score(&self, active: &ActiveConstraints, candidate: &[Nucleotide]) -> f64 {
        let mut total = 0.0;
        for kind in active.iter() {
            let weight = self.hyperparameters.get(kind.into()).weight();
            total += weight * self.scorer.log_score(kind, candidate);
            if total == f64::NEG_INFINITY {
                break;
            }
            if kind == ConstraintKind::Hairpin {
                total += self.hyperparameters.similarity.weight()
                    * self.scorer.similarity_log_score(candidate);
            }
        }
        total
    }

    /// Build one sequence, or `None` when every base is forbidden at some
    /// position. A successful sequence is registered with the scorer.
    pub fn build_one<R: Rng + ?Sized>(
        &mut self,
        active: &ActiveConstraints,
        rng: &mut R,
    ) -> Option<Sequence> {
        let target = self.scorer.target_len();
        let mut sequence = Sequence::with_capacity(target);

        while sequence.len() < target {
            let base = if active.is_empty() {
                Nucleotide::ALL[rng.gen_range(0..Nucleotide::ALL.len())]
            } else {
                let weights: Vec<f64> = Nucleotide::ALL
                    .iter()
                    .map(|&base| {
                        self.combined_log_score(active, &sequence.extended(base))
                            .exp()
                    })
                    .collect();
                match WeightedIndex::new(&weights) {
                    Ok(distribution) => Nucleotide::ALL[distribution.sample(rng)],
                    Err(e) => {
                        warn!(
                            "Dead end after '{}' ({} of {} bases): {}",
                            sequence,
                            sequence.len(),
                            target,
                            e
                        );
                        return None;
                    }
                }
            };
            sequence.push(base);
        }

        self.scorer.register(sequence.clone());
        Some(sequence)
    }

    /// Make exactly `attempts` calls to [`build_one`](Self::build_one) and
    /// collect the distinct successes in the order they were built.
    pub fn build_all<R: Rng + ?Sized>(
        &mut self,
        active: &ActiveConstraints,
        rng: &mut R,
    ) -> IndexSet<Sequence> {
        let mut built = IndexSet::new();
        for attempt in 0..self.attempts {
            match self.build_one(active, rng) {
                Some(sequence) => {
                    debug!("Attempt {}: built {}", attempt + 1, sequence);
                    built.insert(sequence);
                }
                None => debug!("Attempt {}: no sequence", attempt + 1),
            }
        }
        built
    }
}
