//! Hairpin detection across keys and payloads laid out as motifs.
//!
//! Positions are measured on a periodic strip of windows, each window being
//! `key_size + payload_size` long. The first `own_len` positions of a window
//! hold a sequence of the role being built (the "same" segment), the rest
//! hold the other role (the "opposite" segment). Window 0 holds the sequence
//! in progress at positions `0..own_len`.
//!
//! For a stem start on the sequence in progress, arm 1 runs forward from the
//! start and arm 2 runs toward it from the far side of the loop. The scan
//! walks from the far end of the stem toward the junction. Whenever an arm
//! crosses into another segment the candidate sequences are resolved again:
//! the sequence in progress, each finished sequence of the segment's role,
//! or, for key segments, the key sitting at a cyclic slot under the assumed
//! alignment of window 0.

use indexmap::IndexSet;
use log::{debug, trace};

use crate::constraints::Constraints;
use crate::hyperparameters::Hyperparameter;
use crate::nucleotide::{Nucleotide, Sequence};

/// Role of the sequence being scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Key,
    Payload,
}

/// A stem reached `max_hairpin + 1` bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Forbidden;

type Scan<T = ()> = std::result::Result<T, Forbidden>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Same,
    Opposite,
}

/// Segments under arm 1 and arm 2 at one scan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pairing {
    SameSame,
    SameOpposite,
    OppositeSame,
    OppositeOpposite,
}

impl Pairing {
    fn of(arm1: Segment, arm2: Segment) -> Pairing {
        match (arm1, arm2) {
            (Segment::Same, Segment::Same) => Pairing::SameSame,
            (Segment::Same, Segment::Opposite) => Pairing::SameOpposite,
            (Segment::Opposite, Segment::Same) => Pairing::OppositeSame,
            (Segment::Opposite, Segment::Opposite) => Pairing::OppositeOpposite,
        }
    }

    fn arm1(self) -> Segment {
        match self {
            Pairing::SameSame | Pairing::SameOpposite => Segment::Same,
            Pairing::OppositeSame | Pairing::OppositeOpposite => Segment::Opposite,
        }
    }

    fn arm2(self) -> Segment {
        match self {
            Pairing::SameSame | Pairing::OppositeSame => Segment::Same,
            Pairing::SameOpposite | Pairing::OppositeOpposite => Segment::Opposite,
        }
    }
}

/// Sequences already pinned under each arm, by segment.
#[derive(Debug, Clone, Copy, Default)]
struct Pinned<'a> {
    same1: Option<&'a [Nucleotide]>,
    same2: Option<&'a [Nucleotide]>,
    opposite1: Option<&'a [Nucleotide]>,
    opposite2: Option<&'a [Nucleotide]>,
}

impl<'a> Pinned<'a> {
    /// Keep the sequence under each arm whose segment does not change.
    fn carried(from: Pairing, to: Pairing, arm1: &'a [Nucleotide], arm2: &'a [Nucleotide]) -> Self {
        let mut pinned = Pinned::default();
        if from.arm1() == to.arm1() {
            match to.arm1() {
                Segment::Same => pinned.same1 = known(arm1),
                Segment::Opposite => pinned.opposite1 = known(arm1),
            }
        }
        if from.arm2() == to.arm2() {
            match to.arm2() {
                Segment::Same => pinned.same2 = known(arm2),
                Segment::Opposite => pinned.opposite2 = known(arm2),
            }
        }
        pinned
    }
}

/// Empty sequences carry no information about what sits under an arm.
fn known(bases: &[Nucleotide]) -> Option<&[Nucleotide]> {
    (!bases.is_empty()).then_some(bases)
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Backward,
    Forward,
}

/// Scores hairpin stems that involve the most recently placed bases.
#[derive(Debug, Clone)]
pub struct HairpinScorer {
    key_size: i64,
    payload_size: i64,
    window: i64,
    max_hairpin: usize,
    stem_bound: i64,
    loop_size_min: i64,
    loop_size_max: i64,
    hyperparameter: Hyperparameter,
}

impl HairpinScorer {
    pub fn new(constraints: &Constraints, hyperparameter: Hyperparameter) -> Self {
        let key_size = constraints.key_size() as i64;
        let payload_size = constraints.payload_size() as i64;
        HairpinScorer {
            key_size,
            payload_size,
            window: key_size + payload_size,
            max_hairpin: constraints.max_hairpin(),
            stem_bound: constraints.max_hairpin() as i64 + 1,
            loop_size_min: constraints.loop_size_min() as i64,
            loop_size_max: constraints.loop_size_max() as i64,
            hyperparameter,
        }
    }

    /// Log-score of a stem of `stem_length` matched bases.
    pub fn stem_score(&self, stem_length: usize) -> f64 {
        self.hyperparameter
            .curve(stem_length as f64, self.max_hairpin as f64)
    }

    /// Stems whose loop lies before the last base of `cur`.
    pub fn backward(
        &self,
        cur: &[Nucleotide],
        same_type: &IndexSet<Sequence>,
        opposite_type: &IndexSet<Sequence>,
        role: Role,
    ) -> f64 {
        self.around_last_base(cur, same_type, opposite_type, role, Direction::Backward)
    }

    /// Stems whose loop lies after the last base of `cur`, reaching into the
    /// sequences that follow it in a motif.
    pub fn forward(
        &self,
        cur: &[Nucleotide],
        same_type: &IndexSet<Sequence>,
        opposite_type: &IndexSet<Sequence>,
        role: Role,
    ) -> f64 {
        self.around_last_base(cur, same_type, opposite_type, role, Direction::Forward)
    }

    /// Forward stems whose first arm starts at `stem1_start`.
    ///
    /// `first_key` pins the cyclic key slot of window 0; `None` enumerates
    /// every alignment the finished collections allow.
    pub fn forward_at(
        &self,
        cur: &[Nucleotide],
        same_type: &IndexSet<Sequence>,
        opposite_type: &IndexSet<Sequence>,
        stem1_start: i64,
        first_key: Option<usize>,
        role: Role,
    ) -> f64 {
        let mut scan = StemScan::new(self, cur, same_type, opposite_type, role);
        match scan.over_loops(stem1_start, Direction::Forward, first_key) {
            Ok(()) => scan.total,
            Err(Forbidden) => f64::NEG_INFINITY,
        }
    }

    fn around_last_base(
        &self,
        cur: &[Nucleotide],
        same_type: &IndexSet<Sequence>,
        opposite_type: &IndexSet<Sequence>,
        role: Role,
        direction: Direction,
    ) -> f64 {
        let mut scan = StemScan::new(self, cur, same_type, opposite_type, role);
        let last = cur.len() as i64 - 1;
        for offset in 0..self.stem_bound {
            if scan.over_loops(last - offset, direction, None).is_err() {
                trace!("forbidden {direction:?} hairpin for {role:?} at offset {offset}");
                return f64::NEG_INFINITY;
            }
        }
        scan.total
    }

    /// Re-check a finished batch: no position of any key or payload may
    /// start a forbidden forward stem.
    pub fn validate(&self, keys: &IndexSet<Sequence>, payloads: &IndexSet<Sequence>) -> bool {
        if keys.is_empty() || payloads.is_empty() {
            return false;
        }
        for payload in payloads {
            for start in 0..self.payload_size {
                let score = self.forward_at(payload, payloads, keys, start, None, Role::Payload);
                if score == f64::NEG_INFINITY {
                    debug!("payload {payload} fails hairpin validation at {start}");
                    return false;
                }
            }
        }
        for key in keys {
            for start in 0..self.key_size {
                let slot = 2 * start as usize;
                for first_key in [slot, slot + 1] {
                    let score =
                        self.forward_at(key, keys, payloads, start, Some(first_key), Role::Key);
                    if score == f64::NEG_INFINITY {
                        debug!("key {key} fails hairpin validation at {start}");
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// State of one scan: the layout it runs over and the scores gathered so far.
struct StemScan<'a> {
    scorer: &'a HairpinScorer,
    cur: &'a [Nucleotide],
    same_type: &'a IndexSet<Sequence>,
    opposite_type: &'a IndexSet<Sequence>,
    role: Role,
    own_len: i64,
    stem1_start: i64,
    stem2_start: i64,
    total: f64,
}

impl<'a> StemScan<'a> {
    fn new(
        scorer: &'a HairpinScorer,
        cur: &'a [Nucleotide],
        same_type: &'a IndexSet<Sequence>,
        opposite_type: &'a IndexSet<Sequence>,
        role: Role,
    ) -> Self {
        let own_len = match role {
            Role::Key => scorer.key_size,
            Role::Payload => scorer.payload_size,
        };
        StemScan {
            scorer,
            cur,
            same_type,
            opposite_type,
            role,
            own_len,
            stem1_start: 0,
            stem2_start: 0,
            total: 0.0,
        }
    }

    fn over_loops(&mut self, stem1_start: i64, direction: Direction, first_key: Option<usize>) -> Scan {
        let bound = self.scorer.stem_bound;
        for loop_size in self.scorer.loop_size_min..=self.scorer.loop_size_max {
            self.stem1_start = stem1_start;
            self.stem2_start = match direction {
                Direction::Backward => stem1_start - loop_size - bound,
                Direction::Forward => stem1_start + loop_size + bound,
            };
            self.resolve(bound - 1, 0, Pinned::default(), first_key)?;
        }
        Ok(())
    }

    // ----- layout -----

    fn arm1(&self, step: i64) -> i64 {
        self.stem1_start + step
    }

    fn arm2(&self, step: i64) -> i64 {
        self.stem2_start + self.scorer.stem_bound - 1 - step
    }

    fn segment(&self, pos: i64) -> Segment {
        if pos.rem_euclid(self.scorer.window) >= self.own_len {
            Segment::Opposite
        } else {
            Segment::Same
        }
    }

    fn pairing_at(&self, step: i64) -> Pairing {
        Pairing::of(self.segment(self.arm1(step)), self.segment(self.arm2(step)))
    }

    fn in_current(&self, pos: i64) -> bool {
        (0..self.own_len).contains(&pos)
    }

    /// Both positions lie in the same `segment` of the same window.
    fn same_window(&self, pos1: i64, pos2: i64, segment: Segment) -> bool {
        if self.segment(pos1) != segment || self.segment(pos2) != segment {
            return false;
        }
        if (pos1 < 0) != (pos2 < 0) {
            return false;
        }
        let shift = |pos: i64| if pos < 0 { pos - 1 } else { pos };
        shift(pos1) / self.scorer.window == shift(pos2) / self.scorer.window
    }

    /// Offset of `pos` inside the sequence occupying its segment.
    fn offset(&self, pos: i64, segment: Segment) -> i64 {
        let in_window = pos.rem_euclid(self.scorer.window);
        match segment {
            Segment::Same => in_window,
            Segment::Opposite => in_window - self.own_len,
        }
    }

    /// The key sitting at `pos` when window 0 is aligned to `first_key`.
    ///
    /// Key slots alternate around the motif ring; when building a key, the
    /// two slots past the finished keys belong to the key in progress.
    fn key_at(&self, pos: i64, first_key: Option<usize>) -> &'a [Nucleotide] {
        let scorer = self.scorer;
        let (keys, slots, pos) = match self.role {
            Role::Payload => (
                self.opposite_type,
                2 * self.opposite_type.len() as i64,
                pos + scorer.key_size,
            ),
            Role::Key => (self.same_type, 2 * self.same_type.len() as i64 + 2, pos),
        };
        if slots == 0 {
            return &[];
        }
        let pos = if pos < 0 { pos - scorer.key_size } else { pos };
        let first = first_key.map_or(-1, |slot| slot as i64);
        let slot = (first + pos / scorer.window).rem_euclid(slots);
        if slot >= 2 * keys.len() as i64 {
            return self.cur;
        }
        keys.get_index((slot / 2) as usize)
            .map_or(&[][..], |key| key.as_slice())
    }

    /// Key slots window 0 may be aligned to.
    fn alignments(&self, first_key: Option<usize>) -> Vec<Option<usize>> {
        if first_key.is_some() {
            return vec![first_key];
        }
        match self.role {
            Role::Key if self.same_type.is_empty() => vec![Some(1)],
            Role::Key => {
                let n = 2 * self.same_type.len();
                vec![Some(n), Some(n + 1)]
            }
            Role::Payload => match self.opposite_type.len() {
                0 => vec![None],
                1 => vec![Some(3)],
                n => (0..2 * n).map(Some).collect(),
            },
        }
    }

    // ----- scoring -----

    fn record(&mut self, stem_length: usize) {
        self.total += self.scorer.stem_score(stem_length);
    }

    fn close_stem(&mut self, stem_length: usize) -> Scan {
        if stem_length as i64 >= self.scorer.stem_bound {
            return Err(Forbidden);
        }
        self.record(stem_length);
        Ok(())
    }

    /// Continue the stem at `step`, resolving what lies under both arms.
    fn resolve(&mut self, step: i64, stem_length: usize, pinned: Pinned<'a>, first_key: Option<usize>) -> Scan {
        if step < 0 {
            if stem_length > 0 {
                self.close_stem(stem_length)?;
            }
            return Ok(());
        }
        for alignment in self.alignments(first_key) {
            self.enter(step, stem_length, pinned, alignment)?;
        }
        Ok(())
    }

    fn enter(&mut self, step: i64, stem_length: usize, pinned: Pinned<'a>, first_key: Option<usize>) -> Scan {
        match self.pairing_at(step) {
            Pairing::SameSame => {
                self.enter_same_same(step, stem_length, pinned.same1, pinned.same2, first_key)
            }
            Pairing::SameOpposite => {
                self.enter_same_opposite(step, stem_length, pinned.same1, pinned.opposite2, first_key)
            }
            Pairing::OppositeSame => {
                self.enter_opposite_same(step, stem_length, pinned.opposite1, pinned.same2, first_key)
            }
            Pairing::OppositeOpposite => self.enter_opposite_opposite(
                step,
                stem_length,
                pinned.opposite1,
                pinned.opposite2,
                first_key,
            ),
        }
    }

    /// Both arms on keys: resolve each by its cyclic slot.
    fn enter_key_key(&mut self, pairing: Pairing, step: i64, stem_length: usize, first_key: Option<usize>) -> Scan {
        let arm1 = self.key_at(self.arm1(step), first_key);
        let arm2 = self.key_at(self.arm2(step), first_key);
        self.extend(pairing, arm1, arm2, step, stem_length, first_key)
    }

    fn enter_same_same(
        &mut self,
        step: i64,
        stem_length: usize,
        pinned1: Option<&'a [Nucleotide]>,
        pinned2: Option<&'a [Nucleotide]>,
        first_key: Option<usize>,
    ) -> Scan {
        if self.role == Role::Key {
            return self.enter_key_key(Pairing::SameSame, step, stem_length, first_key);
        }
        let pairing = Pairing::SameSame;
        let (pos1, pos2) = (self.arm1(step), self.arm2(step));
        let shared = self.same_window(pos1, pos2, Segment::Same);
        let (cur, same_type) = (self.cur, self.same_type);

        match (pinned1, pinned2) {
            (Some(arm1), Some(arm2)) => {
                self.extend(pairing, arm1, arm2, step, stem_length, first_key)?;
            }
            (Some(arm1), None) => {
                if !self.in_current(pos2) {
                    for other in same_type {
                        if shared && arm1 != other.as_slice() {
                            continue;
                        }
                        self.extend(pairing, arm1, other, step, stem_length, first_key)?;
                    }
                }
                self.extend(pairing, arm1, cur, step, stem_length, first_key)?;
            }
            (None, Some(arm2)) => {
                if !self.in_current(pos1) {
                    for other in same_type {
                        if shared && other.as_slice() != arm2 {
                            continue;
                        }
                        self.extend(pairing, other, arm2, step, stem_length, first_key)?;
                    }
                }
                self.extend(pairing, cur, arm2, step, stem_length, first_key)?;
            }
            (None, None) => {
                let (in_cur1, in_cur2) = (self.in_current(pos1), self.in_current(pos2));
                if in_cur1 && !in_cur2 {
                    for other in same_type {
                        if shared && cur != other.as_slice() {
                            continue;
                        }
                        self.extend(pairing, cur, other, step, stem_length, first_key)?;
                    }
                } else if in_cur2 && !in_cur1 {
                    for other in same_type {
                        if shared && cur != other.as_slice() {
                            continue;
                        }
                        self.extend(pairing, other, cur, step, stem_length, first_key)?;
                    }
                } else if !in_cur1 && !in_cur2 {
                    for arm1 in same_type {
                        for arm2 in same_type {
                            if shared && arm1 != arm2 {
                                continue;
                            }
                            self.extend(pairing, arm1, arm2, step, stem_length, first_key)?;
                        }
                    }
                }
                self.extend(pairing, cur, cur, step, stem_length, first_key)?;
            }
        }
        Ok(())
    }

    fn enter_same_opposite(
        &mut self,
        step: i64,
        stem_length: usize,
        pinned1: Option<&'a [Nucleotide]>,
        pinned2: Option<&'a [Nucleotide]>,
        first_key: Option<usize>,
    ) -> Scan {
        let pairing = Pairing::SameOpposite;
        let (arm1, arm2) = match self.role {
            Role::Key => (known(self.key_at(self.stem1_start, first_key)), pinned2),
            Role::Payload => (pinned1, known(self.key_at(self.stem2_start, first_key))),
        };
        let (cur, same_type, opposite_type) = (self.cur, self.same_type, self.opposite_type);

        match (arm1, arm2) {
            (Some(arm1), Some(arm2)) => {
                self.extend(pairing, arm1, arm2, step, stem_length, first_key)?;
            }
            (Some(arm1), None) => {
                for other in opposite_type {
                    self.extend(pairing, arm1, other, step, stem_length, first_key)?;
                }
            }
            (None, Some(arm2)) => {
                if !self.in_current(self.arm1(step)) {
                    for other in same_type {
                        self.extend(pairing, other, arm2, step, stem_length, first_key)?;
                    }
                }
                self.extend(pairing, cur, arm2, step, stem_length, first_key)?;
            }
            (None, None) => {}
        }

        // Nothing is known about the opposite segment: step over it.
        if arm2.is_none() && opposite_type.is_empty() {
            let pinned = Pinned {
                same1: arm1,
                ..Pinned::default()
            };
            self.resolve(step - 1, stem_length, pinned, first_key)?;
        }
        Ok(())
    }

    fn enter_opposite_same(
        &mut self,
        step: i64,
        stem_length: usize,
        pinned1: Option<&'a [Nucleotide]>,
        pinned2: Option<&'a [Nucleotide]>,
        first_key: Option<usize>,
    ) -> Scan {
        let pairing = Pairing::OppositeSame;
        let (arm1, arm2) = match self.role {
            Role::Key => (pinned1, known(self.key_at(self.stem2_start, first_key))),
            Role::Payload => (known(self.key_at(self.stem1_start, first_key)), pinned2),
        };
        let (cur, same_type, opposite_type) = (self.cur, self.same_type, self.opposite_type);

        match (arm1, arm2) {
            (Some(arm1), Some(arm2)) => {
                self.extend(pairing, arm1, arm2, step, stem_length, first_key)?;
            }
            (Some(arm1), None) => {
                if !self.in_current(self.arm2(step)) {
                    for other in same_type {
                        self.extend(pairing, arm1, other, step, stem_length, first_key)?;
                    }
                }
                self.extend(pairing, arm1, cur, step, stem_length, first_key)?;
            }
            (None, Some(arm2)) => {
                for other in opposite_type {
                    self.extend(pairing, other, arm2, step, stem_length, first_key)?;
                }
            }
            (None, None) => {}
        }

        if arm1.is_none() && opposite_type.is_empty() {
            let pinned = Pinned {
                same2: arm2,
                ..Pinned::default()
            };
            self.resolve(step - 1, stem_length, pinned, first_key)?;
        }
        Ok(())
    }

    fn enter_opposite_opposite(
        &mut self,
        step: i64,
        stem_length: usize,
        pinned1: Option<&'a [Nucleotide]>,
        pinned2: Option<&'a [Nucleotide]>,
        first_key: Option<usize>,
    ) -> Scan {
        if self.role == Role::Payload {
            return self.enter_key_key(Pairing::OppositeOpposite, step, stem_length, first_key);
        }
        let pairing = Pairing::OppositeOpposite;
        let (pos1, pos2) = (self.arm1(step), self.arm2(step));
        let shared = self.same_window(pos1, pos2, Segment::Opposite);
        let opposite_type = self.opposite_type;

        match (pinned1, pinned2) {
            (Some(arm1), Some(arm2)) => {
                self.extend(pairing, arm1, arm2, step, stem_length, first_key)?;
            }
            (Some(arm1), None) => {
                for other in opposite_type {
                    if shared && arm1 != other.as_slice() {
                        continue;
                    }
                    self.extend(pairing, arm1, other, step, stem_length, first_key)?;
                }
            }
            (None, Some(arm2)) => {
                for other in opposite_type {
                    if shared && other.as_slice() != arm2 {
                        continue;
                    }
                    self.extend(pairing, other, arm2, step, stem_length, first_key)?;
                }
            }
            (None, None) => {
                for arm1 in opposite_type {
                    for arm2 in opposite_type {
                        if shared && arm1 != arm2 {
                            continue;
                        }
                        self.extend(pairing, arm1, arm2, step, stem_length, first_key)?;
                    }
                }
            }
        }

        let both_pinned = pinned1.is_some() && pinned2.is_some();
        if !both_pinned && opposite_type.is_empty() {
            let pinned = Pinned {
                opposite1: pinned1,
                opposite2: pinned2,
                ..Pinned::default()
            };
            self.resolve(step - 1, stem_length, pinned, first_key)?;
        }
        Ok(())
    }

    /// Walk the stem from `from_step` toward the junction with `arm1` and
    /// `arm2` fixed, handing over as soon as either arm changes segment.
    fn extend(
        &mut self,
        pairing: Pairing,
        arm1: &'a [Nucleotide],
        arm2: &'a [Nucleotide],
        from_step: i64,
        mut stem_length: usize,
        first_key: Option<usize>,
    ) -> Scan {
        for step in (0..=from_step).rev() {
            let here = self.pairing_at(step);
            if here != pairing {
                let pinned = Pinned::carried(pairing, here, arm1, arm2);
                return self.enter(step, stem_length, pinned, first_key);
            }

            let offset1 = self.offset(self.arm1(step), pairing.arm1());
            let offset2 = self.offset(self.arm2(step), pairing.arm2());
            let (Some(&base1), Some(&base2)) = (base_at(arm1, offset1), base_at(arm2, offset2)) else {
                // the arm runs past a sequence that is not fully built yet
                if step == 0 && stem_length > 0 {
                    self.record(stem_length);
                }
                continue;
            };

            if base1 != base2.complement() {
                break;
            }
            stem_length += 1;
            if step == 0 {
                self.close_stem(stem_length)?;
            }
        }
        Ok(())
    }
}

fn base_at(bases: &[Nucleotide], offset: i64) -> Option<&Nucleotide> {
    usize::try_from(offset).ok().and_then(|i| bases.get(i))
}
