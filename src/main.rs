use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use motifgen::hyperparameters::parse_assignment;
use motifgen::{
    build_keys_and_payloads, create_rng, success_rate, ActiveConstraints, Batch, BatchOutcome,
    Constraints, HyperparameterKind, Hyperparameters,
};

fn parse_constraints(s: &str) -> Result<ActiveConstraints, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_hyperparameter(s: &str) -> Result<(HyperparameterKind, f64), String> {
    parse_assignment(s).map_err(|e| format!("{e}"))
}

/// motifgen - Constraint-weighted synthesis of DNA keys and payloads
///
/// Keys and payloads are grown one base at a time, sampling each base by how
/// well it satisfies the active constraints
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Length of every payload
    #[clap(long = "payload-size", default_value = "5")]
    payload_size: usize,

    /// Number of payload construction attempts
    #[clap(long = "payload-num", default_value = "1")]
    payload_num: usize,

    /// Length of every key
    #[clap(long = "key-size", default_value = "1")]
    key_size: usize,

    /// Number of key construction attempts
    #[clap(long = "key-num", default_value = "1")]
    key_num: usize,

    /// Longest allowed homopolymer run
    #[clap(long = "max-hom", default_value = "2")]
    max_hom: usize,

    /// Stem length at which a hairpin is forbidden
    #[clap(long = "max-hairpin", default_value = "2")]
    max_hairpin: usize,

    /// Fixed hairpin loop length (overrides --loop-min/--loop-max)
    #[clap(long = "loop-size", conflicts_with_all = ["loop_min", "loop_max"])]
    loop_size: Option<usize>,

    /// Shortest hairpin loop considered
    #[clap(long = "loop-min", default_value = "1")]
    loop_min: usize,

    /// Longest hairpin loop considered
    #[clap(long = "loop-max", default_value = "1")]
    loop_max: usize,

    /// Lowest GC percentage of a motif
    #[clap(long = "min-gc", default_value = "20")]
    min_gc: u32,

    /// Highest GC percentage of a motif
    #[clap(long = "max-gc", default_value = "60")]
    max_gc: u32,

    /// Active constraints, comma separated: hom, hairpin, gcContent, noKeyInPayload
    #[clap(
        short = 'c',
        long = "constraints",
        default_value = "hom,hairpin,gcContent,noKeyInPayload",
        value_parser = parse_constraints
    )]
    constraints: ActiveConstraints,

    /// Scoring curve shape, as NAME=VALUE (repeatable)
    #[clap(long = "shape", value_parser = parse_hyperparameter)]
    shapes: Vec<(HyperparameterKind, f64)>,

    /// Constraint weight, as NAME=VALUE (repeatable)
    #[clap(long = "weight", value_parser = parse_hyperparameter)]
    weights: Vec<(HyperparameterKind, f64)>,

    /// Start from the web front end's shapes instead of the library defaults
    #[clap(long = "web-defaults")]
    web_defaults: bool,

    /// Random seed for reproducible output
    #[clap(short = 's', long = "seed")]
    seed: Option<u64>,

    /// Build this many batches and report how many succeeded
    #[clap(long = "runs")]
    runs: Option<usize>,

    /// Run the hairpin validator over the finished batch
    #[clap(long = "validate")]
    validate: bool,

    /// Output file (stdout if not specified)
    #[clap(short = 'o', long = "output")]
    output: Option<String>,

    /// Debug logging
    #[clap(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Args {
    fn constraints(&self) -> Result<Constraints> {
        let mut builder = Constraints::builder()
            .payload_size(self.payload_size)
            .payload_num(self.payload_num)
            .key_size(self.key_size)
            .key_num(self.key_num)
            .max_hom(self.max_hom)
            .max_hairpin(self.max_hairpin)
            .loop_size_range(self.loop_min, self.loop_max)
            .gc_range(self.min_gc, self.max_gc);
        if let Some(size) = self.loop_size {
            builder = builder.loop_size(size);
        }
        Ok(builder.build()?)
    }

    fn hyperparameters(&self) -> Result<Hyperparameters> {
        let mut hyperparameters = if self.web_defaults {
            Hyperparameters::web_defaults()
        } else {
            Hyperparameters::default()
        };
        for &(kind, shape) in &self.shapes {
            hyperparameters.set_shape(kind, shape)?;
        }
        for &(kind, weight) in &self.weights {
            hyperparameters.set_weight(kind, weight)?;
        }
        Ok(hyperparameters)
    }
}

fn write_batch(out: &mut dyn Write, batch: &Batch, validated: Option<bool>) -> io::Result<()> {
    writeln!(out, "# keys")?;
    for key in &batch.keys {
        writeln!(out, "{key}")?;
    }
    writeln!(out, "# payloads")?;
    for payload in &batch.payloads {
        writeln!(out, "{payload}")?;
    }
    writeln!(out, "# motifs")?;
    for motif in batch.motifs() {
        writeln!(out, "{motif}")?;
    }
    if let Some(passed) = validated {
        let verdict = if passed { "passed" } else { "failed" };
        writeln!(out, "# hairpin validation: {verdict}")?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let constraints = args.constraints()?;
    let hyperparameters = args.hyperparameters()?;
    let mut rng = create_rng(args.seed);

    info!(
        "Keys {}x{}, payloads {}x{}, constraints [{}]",
        constraints.key_num(),
        constraints.key_size(),
        constraints.payload_num(),
        constraints.payload_size(),
        args.constraints
    );

    let mut output: Box<dyn Write> = if let Some(ref path) = args.output {
        let file = File::create(path).with_context(|| format!("Failed to create {path}"))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    if let Some(runs) = args.runs {
        let successes = success_rate(
            &constraints,
            &hyperparameters,
            &args.constraints,
            runs,
            &mut rng,
        );
        writeln!(output, "{successes}/{runs} batches succeeded")?;
        output.flush()?;
        return Ok(());
    }

    match build_keys_and_payloads(&constraints, &hyperparameters, &args.constraints, &mut rng) {
        BatchOutcome::Built(batch) => {
            let validated = if args.validate {
                let passed = batch.validate(&constraints, &hyperparameters);
                if !passed {
                    warn!("Batch contains a forbidden hairpin");
                }
                Some(passed)
            } else {
                None
            };
            write_batch(&mut *output, &batch, validated)?;
            output.flush()?;
        }
        BatchOutcome::Failed(stage) => {
            output.flush()?;
            eprintln!("Error: batch failed: {stage}");
            std::process::exit(1);
        }
    }

    Ok(())
}
