//! Log-scores for keys.
//!
//! Keys flank payloads on both sides, so every key sees itself and the other
//! keys across a motif boundary. The scorer keeps the finished keys in
//! insertion order together with the statistics the boundary rules need.

use indexmap::IndexSet;

use crate::builder::RoleScorer;
use crate::constraints::{ConstraintKind, Constraints};
use crate::hairpin::{HairpinScorer, Role};
use crate::hyperparameters::Hyperparameters;
use crate::nucleotide::{gc_count, trailing_run, BaseSet, Nucleotide, Sequence};

#[derive(Debug, Clone)]
pub struct KeyScorer {
    constraints: Constraints,
    hyperparameters: Hyperparameters,
    hairpin: HairpinScorer,
    keys: IndexSet<Sequence>,
    /// Bases seen at each key position across finished keys.
    used_bases: Vec<BaseSet>,
    /// Lowest and highest GC count among finished keys.
    gc_counts: Option<(usize, usize)>,
    no_payloads: IndexSet<Sequence>,
}

impl KeyScorer {
    pub fn new(constraints: &Constraints, hyperparameters: &Hyperparameters) -> Self {
        KeyScorer {
            constraints: constraints.clone(),
            hyperparameters: *hyperparameters,
            hairpin: HairpinScorer::new(constraints, hyperparameters.hairpin),
            keys: IndexSet::new(),
            used_bases: vec![BaseSet::default(); constraints.key_size()],
            gc_counts: None,
            no_payloads: IndexSet::new(),
        }
    }

    /// Finished keys, in the order they were added.
    pub fn keys(&self) -> &IndexSet<Sequence> {
        &self.keys
    }

    /// Record a finished key. Keys of the wrong length and duplicates are
    /// ignored.
    pub fn add_key(&mut self, key: Sequence) -> bool {
        if key.len() != self.constraints.key_size() {
            return false;
        }
        for (used, &base) in self.used_bases.iter_mut().zip(key.iter()) {
            used.insert(base);
        }
        let gc = gc_count(&key);
        self.gc_counts = Some(match self.gc_counts {
            Some((min, max)) => (min.min(gc), max.max(gc)),
            None => (gc, gc),
        });
        self.keys.insert(key)
    }

    pub fn add_keys<I: IntoIterator<Item = Sequence>>(&mut self, keys: I) {
        for key in keys {
            self.add_key(key);
        }
    }

    pub fn homopolymer_log_score(&self, candidate: &[Nucleotide]) -> f64 {
        if self.boundary_run_forced(candidate) {
            return f64::NEG_INFINITY;
        }
        let run = trailing_run(candidate);
        let max_hom = self.constraints.max_hom();
        if run == 0 {
            0.0
        } else if run > max_hom {
            f64::NEG_INFINITY
        } else {
            self.hyperparameters.hom.curve(run as f64, max_hom as f64)
        }
    }

    /// With very short homopolymer limits the first and last key bases must
    /// leave some base unused, otherwise some key pairing across a short
    /// payload is bound to produce a run over the limit.
    fn boundary_run_forced(&self, candidate: &[Nucleotide]) -> bool {
        let key_size = self.constraints.key_size();
        let len = candidate.len();
        if len == 0 || (len > 1 && len < key_size) {
            return false;
        }
        let max_hom = self.constraints.max_hom();
        let payload_size = self.constraints.payload_size();
        if max_hom != 1 && !(max_hom == 2 && payload_size == 1) {
            return false;
        }

        let first = self.used_bases[0].with(candidate[0]);
        let mut last = self.used_bases[key_size - 1];
        if len == key_size {
            last.insert(candidate[key_size - 1]);
        }
        let unused_anywhere = first.union(last).missing();
        let (unused_first, unused_last) = (first.missing(), last.missing());

        if max_hom == 1 {
            unused_first == 0
                || unused_last == 0
                || (payload_size == 1 && unused_anywhere == 0)
                || (payload_size == 2
                    && unused_anywhere == 1
                    && unused_first == 1
                    && unused_last == 1)
        } else {
            unused_first == 4 && unused_last == 4
        }
    }

    pub fn gc_log_score(&self, candidate: &[Nucleotide]) -> f64 {
        if candidate.is_empty() {
            return 0.0;
        }
        let motif_size = self.constraints.motif_size() as f64;
        let min_gc = self.constraints.min_gc() as f64;
        let max_gc = self.constraints.max_gc() as f64;
        let shape = self.hyperparameters.gc_content.shape();
        let key_gc = gc_count(candidate);

        // the key flanking a payload on both sides
        let size = 2 * candidate.len();
        let min_count = (min_gc * motif_size / 100.0).ceil();
        let max_count = (max_gc * motif_size / 100.0).floor();
        let self_gc = (2 * key_gc) as f64;
        if self_gc > max_count || self_gc + motif_size - (size as f64) < min_count {
            return f64::NEG_INFINITY;
        }
        let weight = shape.powf(size as f64 / motif_size) - 1.0;
        let percent = 100.0 * self_gc / size as f64;
        let mut pressure = 0f64
            .max(weight * (min_gc - percent))
            .max(weight * (percent - max_gc));

        // next to the least and most GC-rich finished keys
        if let Some((min_key_gc, max_key_gc)) = self.gc_counts {
            let size = (candidate.len() + self.constraints.key_size()) as f64;
            let weight = shape.powf(size / motif_size) - 1.0;
            let low = 100.0 * (key_gc + min_key_gc) as f64 / size;
            let high = 100.0 * (key_gc + max_key_gc) as f64 / size;
            pressure = pressure
                .max(weight * (min_gc - low))
                .max(weight * (high - max_gc));
        }
        -pressure
    }

    pub fn hairpin_log_score(&self, candidate: &[Nucleotide]) -> f64 {
        self.hairpin
            .forward(candidate, &self.keys, &self.no_payloads, Role::Key)
            + self
                .hairpin
                .backward(candidate, &self.keys, &self.no_payloads, Role::Key)
    }

    /// Penalise trailing positions where every base has already been used by
    /// some finished key.
    pub fn similarity_log_score(&self, candidate: &[Nucleotide]) -> f64 {
        saturated_tail_score(
            &self.used_bases,
            candidate,
            self.constraints.max_hairpin(),
            &self.hyperparameters,
        )
    }
}

impl RoleScorer for KeyScorer {
    fn target_len(&self) -> usize {
        self.constraints.key_size()
    }

    fn log_score(&self, kind: ConstraintKind, candidate: &[Nucleotide]) -> f64 {
        match kind {
            ConstraintKind::Hom => self.homopolymer_log_score(candidate),
            ConstraintKind::Hairpin => self.hairpin_log_score(candidate),
            ConstraintKind::GcContent => self.gc_log_score(candidate),
            ConstraintKind::NoKeyInPayload => 0.0,
        }
    }

    fn similarity_log_score(&self, candidate: &[Nucleotide]) -> f64 {
        KeyScorer::similarity_log_score(self, candidate)
    }

    fn register(&mut self, sequence: Sequence) -> bool {
        self.add_key(sequence)
    }
}

/// Shared by the key and payload scorers: count trailing positions (at most
/// `max_hairpin`) whose used bases together with the candidate's base cover
/// the whole alphabet.
pub(crate) fn saturated_tail_score(
    used_bases: &[BaseSet],
    candidate: &[Nucleotide],
    max_hairpin: usize,
    hyperparameters: &Hyperparameters,
) -> f64 {
    let window = candidate
        .iter()
        .enumerate()
        .rev()
        .take(max_hairpin)
        .take_while(|&(i, &base)| used_bases.get(i).is_some_and(|used| used.with(base).is_full()))
        .count();
    hyperparameters
        .similarity
        .curve(window as f64, max_hairpin as f64)
}
