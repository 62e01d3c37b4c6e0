//! Shape and weight hyperparameters for each scored constraint.

use std::fmt;
use std::str::FromStr;

use crate::constraints::ConstraintKind;
use crate::error::{MotifError, Result};

/// Curve steepness (`shape`) and relative importance (`weight`) of one constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hyperparameter {
    shape: f64,
    weight: f64,
}

impl Default for Hyperparameter {
    fn default() -> Self {
        Hyperparameter {
            shape: 2.0,
            weight: 1.0,
        }
    }
}

impl Hyperparameter {
    pub fn new(shape: f64, weight: f64) -> Result<Self> {
        let mut hyperparameter = Hyperparameter::default();
        hyperparameter.set_shape(shape)?;
        hyperparameter.set_weight(weight)?;
        Ok(hyperparameter)
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn set_shape(&mut self, shape: f64) -> Result<()> {
        self.shape = positive("shape", shape)?;
        Ok(())
    }

    pub fn set_weight(&mut self, weight: f64) -> Result<()> {
        self.weight = positive("weight", weight)?;
        Ok(())
    }

    /// `1 - shape^(x / horizon)`: zero at `x = 0`, `1 - shape` at the horizon.
    pub fn curve(&self, x: f64, horizon: f64) -> f64 {
        1.0 - self.shape.powf(x / horizon)
    }
}

fn positive(parameter: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(MotifError::invalid(
            parameter,
            format!("{value} must be a finite number > 0"),
        ))
    }
}

/// Which hyperparameter pair to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HyperparameterKind {
    Hom,
    Hairpin,
    GcContent,
    Similarity,
    NoKeyInPayload,
}

impl HyperparameterKind {
    pub const ALL: [HyperparameterKind; 5] = [
        HyperparameterKind::Hom,
        HyperparameterKind::Hairpin,
        HyperparameterKind::GcContent,
        HyperparameterKind::Similarity,
        HyperparameterKind::NoKeyInPayload,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HyperparameterKind::Hom => "hom",
            HyperparameterKind::Hairpin => "hairpin",
            HyperparameterKind::GcContent => "gcContent",
            HyperparameterKind::Similarity => "similarity",
            HyperparameterKind::NoKeyInPayload => "noKeyInPayload",
        }
    }
}

impl fmt::Display for HyperparameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HyperparameterKind {
    type Err = MotifError;

    fn from_str(s: &str) -> Result<Self> {
        HyperparameterKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s.trim())
            .ok_or_else(|| MotifError::UnknownConstraint {
                name: s.trim().to_string(),
            })
    }
}

impl From<ConstraintKind> for HyperparameterKind {
    fn from(kind: ConstraintKind) -> Self {
        match kind {
            ConstraintKind::Hom => HyperparameterKind::Hom,
            ConstraintKind::Hairpin => HyperparameterKind::Hairpin,
            ConstraintKind::GcContent => HyperparameterKind::GcContent,
            ConstraintKind::NoKeyInPayload => HyperparameterKind::NoKeyInPayload,
        }
    }
}

/// One [`Hyperparameter`] per scored constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hyperparameters {
    pub hom: Hyperparameter,
    pub hairpin: Hyperparameter,
    pub gc_content: Hyperparameter,
    pub similarity: Hyperparameter,
    pub no_key_in_payload: Hyperparameter,
}

impl Hyperparameters {
    /// Shapes used by the web front end; weights stay at 1.
    pub fn web_defaults() -> Self {
        let shaped = |shape| Hyperparameter { shape, weight: 1.0 };
        Hyperparameters {
            hom: shaped(70.0),
            hairpin: shaped(8.0),
            gc_content: shaped(20.0),
            similarity: shaped(50.0),
            no_key_in_payload: Hyperparameter::default(),
        }
    }

    pub fn get(&self, kind: HyperparameterKind) -> &Hyperparameter {
        match kind {
            HyperparameterKind::Hom => &self.hom,
            HyperparameterKind::Hairpin => &self.hairpin,
            HyperparameterKind::GcContent => &self.gc_content,
            HyperparameterKind::Similarity => &self.similarity,
            HyperparameterKind::NoKeyInPayload => &self.no_key_in_payload,
        }
    }

    fn get_mut(&mut self, kind: HyperparameterKind) -> &mut Hyperparameter {
        match kind {
            HyperparameterKind::Hom => &mut self.hom,
            HyperparameterKind::Hairpin => &mut self.hairpin,
            HyperparameterKind::GcContent => &mut self.gc_content,
            HyperparameterKind::Similarity => &mut self.similarity,
            HyperparameterKind::NoKeyInPayload => &mut self.no_key_in_payload,
        }
    }

    pub fn set_shape(&mut self, kind: HyperparameterKind, shape: f64) -> Result<()> {
        self.get_mut(kind).set_shape(shape)
    }

    pub fn set_weight(&mut self, kind: HyperparameterKind, weight: f64) -> Result<()> {
        self.get_mut(kind).set_weight(weight)
    }

    /// Same shape for every constraint, handy in tests and benchmarks.
    pub fn with_shape(shape: f64) -> Result<Self> {
        let mut hyperparameters = Hyperparameters::default();
        for kind in HyperparameterKind::ALL {
            hyperparameters.set_shape(kind, shape)?;
        }
        Ok(hyperparameters)
    }
}

/// Parse a `NAME=VALUE` pair such as `hairpin=8`.
pub fn parse_assignment(s: &str) -> Result<(HyperparameterKind, f64)> {
    let (name, value) = s.split_once('=').ok_or_else(|| {
        MotifError::invalid("hyperparameter", format!("'{s}' is not of the form NAME=VALUE"))
    })?;
    let kind = name.parse()?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| MotifError::invalid(name.trim(), format!("'{}': {e}", value.trim())))?;
    Ok((kind, value))
}
