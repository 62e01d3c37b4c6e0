//! Batch coordination: keys first, then payloads seeded with those keys.

use std::fmt;

use indexmap::IndexSet;
use log::{debug, info};
use rand::Rng;

use crate::builder::SequenceBuilder;
use crate::constraints::{ActiveConstraints, Constraints};
use crate::hairpin::HairpinScorer;
use crate::hyperparameters::Hyperparameters;
use crate::key_score::KeyScorer;
use crate::nucleotide::Sequence;
use crate::payload_score::PayloadScorer;

/// A finished set of keys (in cyclic motif order) and payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub keys: IndexSet<Sequence>,
    pub payloads: IndexSet<Sequence>,
}

impl Batch {
    pub fn motifs(&self) -> IndexSet<String> {
        motifs_of(&self.keys, &self.payloads)
    }

    /// Re-run the forward hairpin check over the finished batch.
    pub fn validate(&self, constraints: &Constraints, hyperparameters: &Hyperparameters) -> bool {
        HairpinScorer::new(constraints, hyperparameters.hairpin).validate(&self.keys, &self.payloads)
    }
}

/// Stage at which a batch produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    NoKeys,
    NoPayloads,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::NoKeys => write!(f, "no key could be built"),
            FailureStage::NoPayloads => write!(f, "no payload could be built for the keys"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Built(Batch),
    Failed(FailureStage),
}

impl BatchOutcome {
    pub fn is_built(&self) -> bool {
        matches!(self, BatchOutcome::Built(_))
    }

    pub fn batch(&self) -> Option<&Batch> {
        match self {
            BatchOutcome::Built(batch) => Some(batch),
            BatchOutcome::Failed(_) => None,
        }
    }
}

/// Build `key_num` keys, then `payload_num` payloads against them.
pub fn build_keys_and_payloads<R: Rng + ?Sized>(
    constraints: &Constraints,
    hyperparameters: &Hyperparameters,
    active: &ActiveConstraints,
    rng: &mut R,
) -> BatchOutcome {
    debug!("Building keys with constraints [{}]", active);
    let mut key_builder = SequenceBuilder::new(
        KeyScorer::new(constraints, hyperparameters),
        *hyperparameters,
        constraints.key_num(),
    );
    let keys = key_builder.build_all(active, rng);
    if keys.is_empty() {
        info!("Batch failed: {}", FailureStage::NoKeys);
        return BatchOutcome::Failed(FailureStage::NoKeys);
    }
    info!("Built {} of {} keys", keys.len(), constraints.key_num());

    let mut payload_scorer = PayloadScorer::new(constraints, hyperparameters);
    payload_scorer.add_keys(keys.iter().cloned());
    let mut payload_builder =
        SequenceBuilder::new(payload_scorer, *hyperparameters, constraints.payload_num());
    let payloads = payload_builder.build_all(active, rng);
    if payloads.is_empty() {
        info!("Batch failed: {}", FailureStage::NoPayloads);
        return BatchOutcome::Failed(FailureStage::NoPayloads);
    }
    info!(
        "Built {} of {} payloads",
        payloads.len(),
        constraints.payload_num()
    );

    BatchOutcome::Built(Batch { keys, payloads })
}

/// Every `key[i] + payload + key[i]` and `key[i] + payload + key[i + 1]`,
/// with the key index wrapping around.
pub fn motifs_of(keys: &IndexSet<Sequence>, payloads: &IndexSet<Sequence>) -> IndexSet<String> {
    let mut motifs = IndexSet::with_capacity(2 * keys.len() * payloads.len());
    for payload in payloads {
        for (i, key) in keys.iter().enumerate() {
            let next = &keys[(i + 1) % keys.len()];
            motifs.insert(format!("{key}{payload}{key}"));
            motifs.insert(format!("{key}{payload}{next}"));
        }
    }
    motifs
}

/// Number of `runs` independent batches that did not fail.
pub fn success_rate<R: Rng + ?Sized>(
    constraints: &Constraints,
    hyperparameters: &Hyperparameters,
    active: &ActiveConstraints,
    runs: usize,
    rng: &mut R,
) -> usize {
    let mut successes = 0;
    for run in 0..runs {
        match build_keys_and_payloads(constraints, hyperparameters, active, rng) {
            BatchOutcome::Built(_) => successes += 1,
            BatchOutcome::Failed(stage) => debug!("Run {}: {}", run + 1, stage),
        }
    }
    info!("{} of {} batches succeeded", successes, runs);
    successes
}
