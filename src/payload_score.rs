//! Log-scores for payloads.
//!
//! Payloads are built after the keys are final. Each payload sits between
//! two keys, so the scorer precomputes the key boundary statistics once in
//! [`PayloadScorer::add_key`] and extends its own per-payload statistics as
//! payloads are finished.

use std::ops::{Index, IndexMut};

use indexmap::IndexSet;

use crate::builder::RoleScorer;
use crate::constraints::{ConstraintKind, Constraints};
use crate::hairpin::{HairpinScorer, Role};
use crate::hyperparameters::Hyperparameters;
use crate::key_score::saturated_tail_score;
use crate::nucleotide::{gc_count, leading_run_of, trailing_run, BaseSet, Nucleotide, Sequence};

/// One value per nucleotide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PerBase<T>([T; 4]);

impl<T> Index<Nucleotide> for PerBase<T> {
    type Output = T;

    fn index(&self, base: Nucleotide) -> &T {
        &self.0[base as usize]
    }
}

impl<T> IndexMut<Nucleotide> for PerBase<T> {
    fn index_mut(&mut self, base: Nucleotide) -> &mut T {
        &mut self.0[base as usize]
    }
}

/// Homopolymer runs at both ends of one key.
#[derive(Debug, Clone, Copy)]
struct KeyEnds {
    first: Nucleotide,
    last: Nucleotide,
    start_run: usize,
    end_run: usize,
}

#[derive(Debug, Clone)]
pub struct PayloadScorer {
    constraints: Constraints,
    hyperparameters: Hyperparameters,
    hairpin: HairpinScorer,

    keys: IndexSet<Sequence>,
    key_ends: Vec<KeyEnds>,
    max_start_key_run: PerBase<usize>,
    max_end_key_run: PerBase<usize>,
    /// Index of a key made of a single repeated base, per base.
    whole_key: PerBase<Option<usize>>,
    key_gc_counts: Option<(usize, usize)>,

    payloads: IndexSet<Sequence>,
    max_start_payload_run: PerBase<usize>,
    max_end_payload_run: PerBase<usize>,
    used_bases: Vec<BaseSet>,
}

impl PayloadScorer {
    pub fn new(constraints: &Constraints, hyperparameters: &Hyperparameters) -> Self {
        PayloadScorer {
            constraints: constraints.clone(),
            hyperparameters: *hyperparameters,
            hairpin: HairpinScorer::new(constraints, hyperparameters.hairpin),
            keys: IndexSet::new(),
            key_ends: Vec::new(),
            max_start_key_run: PerBase::default(),
            max_end_key_run: PerBase::default(),
            whole_key: PerBase::default(),
            key_gc_counts: None,
            payloads: IndexSet::new(),
            max_start_payload_run: PerBase::default(),
            max_end_payload_run: PerBase::default(),
            used_bases: vec![BaseSet::default(); constraints.payload_size()],
        }
    }

    pub fn keys(&self) -> &IndexSet<Sequence> {
        &self.keys
    }

    pub fn payloads(&self) -> &IndexSet<Sequence> {
        &self.payloads
    }

    /// Add one finished key and its boundary statistics. Key order is the
    /// cyclic order keys take in motifs.
    pub fn add_key(&mut self, key: Sequence) -> bool {
        let key_size = self.constraints.key_size();
        if key.len() != key_size || self.keys.contains(&key) {
            return false;
        }
        let (first, last) = (key[0], key[key_size - 1]);
        let ends = KeyEnds {
            first,
            last,
            start_run: leading_run_of(&key, first),
            end_run: trailing_run(&key),
        };
        let index = self.keys.len();
        if ends.start_run == key_size {
            self.whole_key[first] = Some(index);
        }
        self.max_start_key_run[first] = self.max_start_key_run[first].max(ends.start_run);
        self.max_end_key_run[last] = self.max_end_key_run[last].max(ends.end_run);

        let gc = gc_count(&key);
        self.key_gc_counts = Some(match self.key_gc_counts {
            Some((min, max)) => (min.min(gc), max.max(gc)),
            None => (gc, gc),
        });

        self.key_ends.push(ends);
        self.keys.insert(key)
    }

    pub fn add_keys<I: IntoIterator<Item = Sequence>>(&mut self, keys: I) {
        for key in keys {
            self.add_key(key);
        }
    }

    /// Record a finished payload. Wrong lengths are rejected; a duplicate
    /// leaves the statistics unchanged.
    pub fn add_payload(&mut self, payload: Sequence) -> bool {
        if payload.len() != self.constraints.payload_size() {
            return false;
        }
        for (used, &base) in self.used_bases.iter_mut().zip(payload.iter()) {
            used.insert(base);
        }
        let (first, last) = (payload[0], payload[payload.len() - 1]);
        let start_run = leading_run_of(&payload, first);
        let end_run = trailing_run(&payload);
        self.max_start_payload_run[first] = self.max_start_payload_run[first].max(start_run);
        self.max_end_payload_run[last] = self.max_end_payload_run[last].max(end_run);
        self.payloads.insert(payload)
    }

    pub fn homopolymer_log_score(&self, candidate: &[Nucleotide]) -> f64 {
        let max_hom = self.constraints.max_hom();
        match self.longest_run(candidate) {
            Some(0) => 0.0,
            Some(run) if run <= max_hom => {
                self.hyperparameters.hom.curve(run as f64, max_hom as f64)
            }
            _ => f64::NEG_INFINITY,
        }
    }

    /// Longest homopolymer the trailing run of `candidate` can belong to once
    /// the payload sits between keys. `None` means unbounded: the run closes a
    /// cycle through a single homopolymer key.
    fn longest_run(&self, candidate: &[Nucleotide]) -> Option<usize> {
        let Some(&base) = candidate.last() else {
            return Some(0);
        };
        let run = trailing_run(candidate);
        if self.keys.is_empty() {
            return Some(run);
        }
        let key_size = self.constraints.key_size();
        let payload_size = self.constraints.payload_size();
        let whole_key = self.whole_key[base];

        let longest = if run == payload_size {
            // the whole payload is one run, joined on both sides
            match whole_key {
                Some(_) if self.keys.len() == 1 => return None,
                Some(index) => {
                    self.end_run_before(index, base)
                        + 2 * key_size
                        + self.start_run_after(index, base)
                        + 3 * payload_size
                }
                None => self.max_end_key_run[base] + payload_size + self.max_start_key_run[base],
            }
        } else if run == candidate.len() {
            // run at the start of the payload, joined to the key before it
            match whole_key {
                Some(index) if self.max_end_payload_run[base] == payload_size => {
                    run + 2 * key_size + 2 * payload_size + self.end_run_before(index, base)
                }
                Some(_) => run + key_size + self.max_end_payload_run[base],
                None => run + self.max_end_key_run[base],
            }
        } else if candidate.len() == payload_size {
            // run at the end of the payload, joined to the key after it
            match whole_key {
                Some(index) if self.max_start_payload_run[base] == payload_size => {
                    run + 2 * key_size + 2 * payload_size + self.start_run_after(index, base)
                }
                Some(_) => {
                    let own_start = leading_run_of(candidate, base);
                    run + key_size + self.max_start_payload_run[base].max(own_start)
                }
                None => run + self.max_start_key_run[base],
            }
        } else {
            run
        };
        Some(longest)
    }

    /// Trailing run of `base` in the key cyclically before key `index`.
    fn end_run_before(&self, index: usize, base: Nucleotide) -> usize {
        let n = self.key_ends.len();
        let ends = &self.key_ends[(index + n - 1) % n];
        if ends.last == base {
            ends.end_run
        } else {
            0
        }
    }

    /// Leading run of `base` in the key cyclically after key `index`.
    fn start_run_after(&self, index: usize, base: Nucleotide) -> usize {
        let n = self.key_ends.len();
        let ends = &self.key_ends[(index + 1) % n];
        if ends.first == base {
            ends.start_run
        } else {
            0
        }
    }

    pub fn gc_log_score(&self, candidate: &[Nucleotide]) -> f64 {
        let motif_size = self.constraints.motif_size() as f64;
        let shape = self.hyperparameters.gc_content.shape();
        let gc = gc_count(candidate) as f64;

        let Some((min_key_gc, max_key_gc)) = self.key_gc_counts else {
            if candidate.is_empty() {
                return 0.0;
            }
            let len = candidate.len() as f64;
            return self.hyperparameters.gc_content.curve(len, motif_size) * 100.0 * gc / len;
        };

        let size = candidate.len() + 2 * self.constraints.key_size();
        let weight = shape.powf(size as f64 / motif_size) - 1.0;
        let low = 100.0 * (gc + 2.0 * min_key_gc as f64) / size as f64;
        let high = 100.0 * (gc + 2.0 * max_key_gc as f64) / size as f64;
        let pressure = 0f64
            .max(weight * (self.constraints.min_gc() as f64 - low))
            .max(weight * (high - self.constraints.max_gc() as f64));

        if size == self.constraints.motif_size() && pressure != 0.0 {
            // a finished motif outside the band
            return f64::NEG_INFINITY;
        }
        -pressure
    }

    pub fn hairpin_log_score(&self, candidate: &[Nucleotide]) -> f64 {
        self.hairpin
            .forward(candidate, &self.payloads, &self.keys, Role::Payload)
            + self
                .hairpin
                .backward(candidate, &self.payloads, &self.keys, Role::Payload)
    }

    pub fn similarity_log_score(&self, candidate: &[Nucleotide]) -> f64 {
        saturated_tail_score(
            &self.used_bases,
            candidate,
            self.constraints.max_hairpin(),
            &self.hyperparameters,
        )
    }

    /// Penalise payload tails that also occur inside a key. A tail as long as
    /// a key that matches one is a full key embedded in the payload.
    pub fn no_key_in_payload_log_score(&self, candidate: &[Nucleotide]) -> f64 {
        let key_size = self.constraints.key_size();
        let longest = candidate.len().min(key_size);
        let mut window = 0;
        for key in &self.keys {
            for tail_len in 2..=longest {
                let tail = &candidate[candidate.len() - tail_len..];
                if !key.windows(tail_len).any(|part| part == tail) {
                    break;
                }
                if tail_len == key_size {
                    return f64::NEG_INFINITY;
                }
                window = window.max(tail_len - 1);
            }
        }
        self.hyperparameters
            .no_key_in_payload
            .curve(window as f64, key_size as f64)
    }
}

impl RoleScorer for PayloadScorer {
    fn target_len(&self) -> usize {
        self.constraints.payload_size()
    }

    fn log_score(&self, kind: ConstraintKind, candidate: &[Nucleotide]) -> f64 {
        match kind {
            ConstraintKind::Hom => self.homopolymer_log_score(candidate),
            ConstraintKind::Hairpin => self.hairpin_log_score(candidate),
            ConstraintKind::GcContent => self.gc_log_score(candidate),
            ConstraintKind::NoKeyInPayload => self.no_key_in_payload_log_score(candidate),
        }
    }

    fn similarity_log_score(&self, candidate: &[Nucleotide]) -> f64 {
        PayloadScorer::similarity_log_score(self, candidate)
    }

    fn register(&mut self, sequence: Sequence) -> bool {
        self.add_payload(sequence)
    }
}
