//! Constraint parameters shared by every scorer.
//!
//! `Constraints` is immutable once built; all invariants are checked by
//! [`ConstraintsBuilder::build`] so the scorers never see contradictory sizes.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexSet;

use crate::error::{MotifError, Result};

/// Validated sizes and thresholds for one synthesis batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraints {
    payload_size: usize,
    payload_num: usize,
    key_size: usize,
    key_num: usize,
    max_hom: usize,
    max_hairpin: usize,
    loop_size_min: usize,
    loop_size_max: usize,
    min_gc: u32,
    max_gc: u32,
}

impl Constraints {
    pub fn builder() -> ConstraintsBuilder {
        ConstraintsBuilder::default()
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    pub fn payload_num(&self) -> usize {
        self.payload_num
    }

    pub fn key_size(&self) -> usize {
        self.key_size
    }

    pub fn key_num(&self) -> usize {
        self.key_num
    }

    /// Longest homopolymer run allowed, already clamped to what the sizes can produce.
    pub fn max_hom(&self) -> usize {
        self.max_hom
    }

    pub fn max_hairpin(&self) -> usize {
        self.max_hairpin
    }

    pub fn loop_size_min(&self) -> usize {
        self.loop_size_min
    }

    pub fn loop_size_max(&self) -> usize {
        self.loop_size_max
    }

    pub fn min_gc(&self) -> u32 {
        self.min_gc
    }

    pub fn max_gc(&self) -> u32 {
        self.max_gc
    }

    /// Length of `key + payload + key`.
    pub fn motif_size(&self) -> usize {
        2 * self.key_size + self.payload_size
    }
}

impl Default for Constraints {
    fn default() -> Self {
        // The defaults satisfy every invariant.
        ConstraintsBuilder::default().assemble()
    }
}

/// Builder for [`Constraints`], starting from the tool's defaults.
#[derive(Debug, Clone)]
pub struct ConstraintsBuilder {
    payload_size: usize,
    payload_num: usize,
    key_size: usize,
    key_num: usize,
    max_hom: usize,
    max_hairpin: usize,
    loop_size: Option<usize>,
    loop_size_min: usize,
    loop_size_max: usize,
    min_gc: u32,
    max_gc: u32,
}

impl Default for ConstraintsBuilder {
    fn default() -> Self {
        ConstraintsBuilder {
            payload_size: 5,
            payload_num: 1,
            key_size: 1,
            key_num: 1,
            max_hom: 2,
            max_hairpin: 2,
            loop_size: None,
            loop_size_min: 1,
            loop_size_max: 1,
            min_gc: 20,
            max_gc: 60,
        }
    }
}

impl ConstraintsBuilder {
    pub fn payload_size(mut self, value: usize) -> Self {
        self.payload_size = value;
        self
    }

    pub fn payload_num(mut self, value: usize) -> Self {
        self.payload_num = value;
        self
    }

    pub fn key_size(mut self, value: usize) -> Self {
        self.key_size = value;
        self
    }

    pub fn key_num(mut self, value: usize) -> Self {
        self.key_num = value;
        self
    }

    pub fn max_hom(mut self, value: usize) -> Self {
        self.max_hom = value;
        self
    }

    pub fn max_hairpin(mut self, value: usize) -> Self {
        self.max_hairpin = value;
        self
    }

    /// Fixed loop length; overrides the min/max range.
    pub fn loop_size(mut self, value: usize) -> Self {
        self.loop_size = Some(value);
        self
    }

    pub fn loop_size_range(mut self, min: usize, max: usize) -> Self {
        self.loop_size_min = min;
        self.loop_size_max = max;
        self
    }

    pub fn gc_range(mut self, min: u32, max: u32) -> Self {
        self.min_gc = min;
        self.max_gc = max;
        self
    }

    fn assemble(&self) -> Constraints {
        let mut max_hom = self
            .max_hom
            .min(4 * self.key_size.max(1) - 2 + 3 * self.payload_size);
        if self.key_num == 1 {
            // a single key is its own neighbour on both sides
            max_hom = max_hom.min((self.key_size + self.payload_size).saturating_sub(1));
        }
        let (loop_size_min, loop_size_max) = match self.loop_size {
            Some(size) => (size, size),
            None => (self.loop_size_min, self.loop_size_max),
        };
        Constraints {
            payload_size: self.payload_size,
            payload_num: self.payload_num,
            key_size: self.key_size,
            key_num: self.key_num,
            max_hom,
            max_hairpin: self.max_hairpin,
            loop_size_min,
            loop_size_max,
            min_gc: self.min_gc,
            max_gc: self.max_gc,
        }
    }

    /// Validate and freeze the parameters.
    pub fn build(self) -> Result<Constraints> {
        for (parameter, value) in [
            ("payload-size", self.payload_size),
            ("payload-num", self.payload_num),
            ("key-size", self.key_size),
            ("key-num", self.key_num),
            ("max-hom", self.max_hom),
            ("max-hairpin", self.max_hairpin),
        ] {
            if value == 0 {
                return Err(MotifError::invalid(parameter, "must be > 0"));
            }
        }

        let constraints = self.assemble();
        debug_assert!(constraints.max_hom >= 1);
        if constraints.loop_size_min > constraints.loop_size_max {
            return Err(MotifError::invalid(
                "loop-size",
                format!(
                    "minimum {} exceeds maximum {}",
                    constraints.loop_size_min, constraints.loop_size_max
                ),
            ));
        }
        if constraints.max_gc > 100 {
            return Err(MotifError::invalid("max-gc", "must be <= 100"));
        }
        if constraints.min_gc > constraints.max_gc {
            return Err(MotifError::invalid(
                "min-gc",
                format!(
                    "{} exceeds max-gc {}",
                    constraints.min_gc, constraints.max_gc
                ),
            ));
        }
        Ok(constraints)
    }
}

/// A constraint that can take part in sequence construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Hom,
    Hairpin,
    GcContent,
    NoKeyInPayload,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 4] = [
        ConstraintKind::Hom,
        ConstraintKind::Hairpin,
        ConstraintKind::GcContent,
        ConstraintKind::NoKeyInPayload,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConstraintKind::Hom => "hom",
            ConstraintKind::Hairpin => "hairpin",
            ConstraintKind::GcContent => "gcContent",
            ConstraintKind::NoKeyInPayload => "noKeyInPayload",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConstraintKind {
    type Err = MotifError;

    fn from_str(s: &str) -> Result<Self> {
        ConstraintKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s.trim())
            .ok_or_else(|| MotifError::UnknownConstraint {
                name: s.trim().to_string(),
            })
    }
}

/// The constraints selected for a run, in the order they were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveConstraints(IndexSet<ConstraintKind>);

impl ActiveConstraints {
    pub fn all() -> Self {
        ConstraintKind::ALL.into_iter().collect()
    }

    pub fn none() -> Self {
        ActiveConstraints::default()
    }

    pub fn contains(&self, kind: ConstraintKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn insert(&mut self, kind: ConstraintKind) -> bool {
        self.0.insert(kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ConstraintKind> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ConstraintKind> for ActiveConstraints {
    fn from_iter<I: IntoIterator<Item = ConstraintKind>>(iter: I) -> Self {
        ActiveConstraints(iter.into_iter().collect())
    }
}

impl FromStr for ActiveConstraints {
    type Err = MotifError;

    /// Comma-separated names; an empty string selects nothing.
    fn from_str(s: &str) -> Result<Self> {
        s.split(',')
            .filter(|name| !name.trim().is_empty())
            .map(str::parse::<ConstraintKind>)
            .collect()
    }
}

impl fmt::Display for ActiveConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(ConstraintKind::name).collect();
        f.write_str(&names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Constraints::default();
        assert_eq!(c.payload_size(), 5);
        assert_eq!(c.key_size(), 1);
        assert_eq!(c.motif_size(), 7);
        assert_eq!(c.max_hom(), 2);
        assert_eq!((c.loop_size_min(), c.loop_size_max()), (1, 1));
        assert_eq!((c.min_gc(), c.max_gc()), (20, 60));
        assert_eq!(Constraints::builder().build().unwrap(), c);
    }

    #[test]
    fn test_max_hom_clamped_to_sizes() {
        let c = Constraints::builder()
            .key_size(2)
            .payload_size(3)
            .key_num(4)
            .max_hom(100)
            .build()
            .unwrap();
        assert_eq!(c.max_hom(), 4 * 2 - 2 + 3 * 3);
    }

    #[test]
    fn test_max_hom_clamped_for_single_key() {
        let c = Constraints::builder()
            .key_size(10)
            .payload_size(10)
            .key_num(1)
            .max_hom(25)
            .build()
            .unwrap();
        assert_eq!(c.max_hom(), 19);
    }

    #[test]
    fn test_max_hom_clamp_keeps_one() {
        let c = Constraints::builder()
            .key_size(1)
            .payload_size(1)
            .key_num(1)
            .max_hom(5)
            .build()
            .unwrap();
        assert_eq!(c.max_hom(), 1);
    }

    #[test]
    fn test_loop_size_overrides_range() {
        let c = Constraints::builder()
            .loop_size_range(2, 9)
            .loop_size(4)
            .build()
            .unwrap();
        assert_eq!((c.loop_size_min(), c.loop_size_max()), (4, 4));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Constraints::builder().max_hairpin(0).build().is_err());
        assert!(Constraints::builder().max_hom(0).build().is_err());
        assert!(Constraints::builder().key_num(0).build().is_err());
        assert!(Constraints::builder().payload_size(0).build().is_err());
        assert!(Constraints::builder().loop_size_range(3, 2).build().is_err());
        assert!(Constraints::builder().gc_range(61, 60).build().is_err());
        assert!(Constraints::builder().gc_range(0, 101).build().is_err());

        let err = Constraints::builder().gc_range(70, 30).build().unwrap_err();
        assert!(err.to_string().contains("min-gc"));
    }

    #[test]
    fn test_constraint_kind_names() {
        for kind in ConstraintKind::ALL {
            assert_eq!(kind.name().parse::<ConstraintKind>().unwrap(), kind);
        }
        assert!("similarity".parse::<ConstraintKind>().is_err());
    }

    #[test]
    fn test_active_constraints_parse() {
        let active: ActiveConstraints = "hom, gcContent,hom".parse().unwrap();
        assert!(active.contains(ConstraintKind::Hom));
        assert!(active.contains(ConstraintKind::GcContent));
        assert!(!active.contains(ConstraintKind::Hairpin));
        assert_eq!(active.to_string(), "hom,gcContent");

        assert!("".parse::<ActiveConstraints>().unwrap().is_empty());
        assert!("hom,nope".parse::<ActiveConstraints>().is_err());
        assert_eq!(ActiveConstraints::all().iter().count(), 4);
    }
}
