// Library exports for motifgen
pub mod batch;
pub mod builder;
pub mod constraints;
pub mod error;
pub mod hairpin;
pub mod hyperparameters;
pub mod key_score;
pub mod nucleotide;
pub mod payload_score;

pub use batch::{
    build_keys_and_payloads, motifs_of, success_rate, Batch, BatchOutcome, FailureStage,
};
pub use builder::{create_rng, RoleScorer, SequenceBuilder};
pub use constraints::{ActiveConstraints, ConstraintKind, Constraints, ConstraintsBuilder};
pub use error::{MotifError, Result};
pub use hyperparameters::{Hyperparameter, HyperparameterKind, Hyperparameters};
pub use nucleotide::{Nucleotide, Sequence};
