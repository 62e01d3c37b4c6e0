/// Worked scoring scenarios through the public API
///
/// Each case pins one literal layout and the exact log-score it must produce,
/// so drift in any scorer shows up as a concrete number.
use indexmap::IndexSet;
use motifgen::hairpin::{HairpinScorer, Role};
use motifgen::key_score::KeyScorer;
use motifgen::payload_score::PayloadScorer;
use motifgen::{motifs_of, Batch, Constraints, ConstraintsBuilder, Hyperparameters, Sequence};
use pretty_assertions::assert_eq;

const SHAPE: f64 = 5.0;

fn seq(s: &str) -> Sequence {
    s.parse().unwrap()
}

fn set(items: &[&str]) -> IndexSet<Sequence> {
    items.iter().map(|s| seq(s)).collect()
}

/// Score of a stem of `n` bases against a limit of `max`.
fn s(n: usize, max: usize) -> f64 {
    1.0 - SHAPE.powf(n as f64 / max as f64)
}

fn hyperparameters() -> Hyperparameters {
    Hyperparameters::with_shape(SHAPE).unwrap()
}

/// Ten-base payloads between two-base keys.
fn payload_layout() -> ConstraintsBuilder {
    Constraints::builder()
        .payload_size(10)
        .key_size(2)
        .key_num(10)
        .max_hom(1)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_payload_stem_into_both_key_alignments() {
    let constraints = payload_layout().max_hairpin(1).loop_size(1).build().unwrap();
    let hairpin = HairpinScorer::new(&constraints, hyperparameters().hairpin);
    let score = hairpin.backward(&seq("GA"), &IndexSet::new(), &set(&["AT", "GC"]), Role::Payload);
    // one stem per key that can precede the payload
    assert_close(score, 2.0 * s(1, 1));
}

#[test]
fn test_key_hairpin_with_itself_across_payload() {
    let constraints = Constraints::builder()
        .payload_size(10)
        .key_size(2)
        .max_hom(1)
        .max_hairpin(1)
        .loop_size(10)
        .build()
        .unwrap();
    let hairpin = HairpinScorer::new(&constraints, hyperparameters().hairpin);
    let score = hairpin.backward(&seq("GC"), &set(&["AT"]), &IndexSet::new(), Role::Key);
    assert_eq!(score, f64::NEG_INFINITY);
}

#[test]
fn test_full_motif_above_gc_band_is_forbidden() {
    let constraints = Constraints::builder()
        .key_size(4)
        .key_num(5)
        .payload_size(2)
        .max_hom(1)
        .gc_range(20, 60)
        .build()
        .unwrap();
    let mut scorer = PayloadScorer::new(&constraints, &hyperparameters());
    scorer.add_keys(set(&["GGAG", "AAAA"]));
    assert_eq!(scorer.gc_log_score(&seq("GG")), f64::NEG_INFINITY);
}

#[test]
fn test_empty_sequence_scores_zero() {
    let constraints = payload_layout().max_hairpin(2).loop_size(1).build().unwrap();
    let mut payloads = PayloadScorer::new(&constraints, &hyperparameters());
    payloads.add_keys(set(&["AT", "GC"]));
    assert_eq!(payloads.hairpin_log_score(&[]), 0.0);
    assert_eq!(payloads.homopolymer_log_score(&[]), 0.0);
    assert_eq!(payloads.similarity_log_score(&[]), 0.0);

    let mut keys = KeyScorer::new(&constraints, &hyperparameters());
    keys.add_keys(set(&["AT", "GC"]));
    assert_eq!(keys.homopolymer_log_score(&[]), 0.0);
    assert_eq!(keys.similarity_log_score(&[]), 0.0);
}

#[test]
fn test_motifs_pair_each_key_with_its_successor() {
    let motifs = motifs_of(&set(&["AC", "GT"]), &set(&["TTA"]));
    let expected: Vec<&str> = vec!["ACTTAAC", "ACTTAGT", "GTTTAGT", "GTTTAAC"];
    assert_eq!(motifs.iter().map(String::as_str).collect::<Vec<_>>(), expected);
}

#[test]
fn test_batch_validation() {
    let constraints = payload_layout().max_hairpin(1).loop_size(1).build().unwrap();
    let keys = set(&["CA", "GG", "AC"]);

    let clean = Batch {
        keys: keys.clone(),
        payloads: set(&["CCACACACAC"]),
    };
    assert!(clean.validate(&constraints, &hyperparameters()));

    let looped = Batch {
        keys,
        payloads: set(&["CGACACACAC"]),
    };
    assert!(!looped.validate(&constraints, &hyperparameters()));
}
