//! Evaluate configured predictors against a synthetic branch workload.
//!
//! The workload mixes a loop branch, a biased random branch, a correlated
//! pair, a call/return, and a flip-flopping indirect branch, so every
//! structure in the core gets exercised.

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::path::PathBuf;

use axon::{load_sections, BPredConfig, Branch, BranchPredictor, Verdict};

#[derive(Parser)]
#[command(about = "Drive branch predictor sections over a synthetic trace")]
struct Args {
    /// TOML file of named predictor sections; defaults to one section per
    /// built-in predictor type.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of workload iterations (each runs a handful of branches).
    #[arg(long, default_value_t = 20_000)]
    iterations: usize,

    /// Seed for the workload's random choices.
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,

    /// Print the per-branch accuracy report after each section.
    #[arg(long)]
    report: bool,
}

fn default_sections() -> BTreeMap<String, BPredConfig> {
    let kinds = [
        "Oracle", "NotTaken", "Taken", "Static", "2bit", "2level", "Hybrid", "2BcgSkew", "YAGS",
        "OGEHL",
    ];
    kinds
        .iter()
        .map(|kind| {
            let cfg = BPredConfig {
                kind: kind.to_string(),
                bits: if *kind == "OGEHL" { 4 } else { 2 },
                ..BPredConfig::default()
            };
            (kind.to_string(), cfg)
        })
        .collect()
}

struct RunResult {
    branches: u64,
    hits: u64,
    misses: u64,
    refused: u64,
}

fn run_section(pred: &mut BranchPredictor, iterations: usize, seed: u64) -> RunResult {
    let mut rng = StdRng::seed_from_u64(seed);

    let loop_br = Branch::conditional(0x100, 0x104, 0x080);
    let biased = Branch::conditional(0x200, 0x204, 0x180);
    let follower = Branch::conditional(0x300, 0x304, 0x280);
    let call = Branch::call(0x400, 0x404, 0x1000);
    let ret = Branch::ret(0x1010, 0x1014);
    let indirect = Branch::indirect(0x500, 0x504);

    let mut hits = 0u64;
    let mut refused = 0u64;
    let score = |v: Verdict, hits: &mut u64, refused: &mut u64| match v {
        Verdict::Correct => *hits += 1,
        Verdict::NoPrediction => *refused += 1,
        _ => {}
    };

    for i in 0..iterations {
        pred.tick();

        // Loop branch: falls out every 16th trip.
        let taken = i % 16 != 15;
        let v = pred.predict(&loop_br, if taken { 0x080 } else { 0x104 }, true);
        score(v, &mut hits, &mut refused);

        // Biased random branch.
        let taken = rng.gen_bool(0.7);
        let v = pred.predict(&biased, if taken { 0x180 } else { 0x204 }, true);
        score(v, &mut hits, &mut refused);

        // Correlated branch: follows the biased one.
        let v = pred.predict(&follower, if taken { 0x280 } else { 0x304 }, true);
        score(v, &mut hits, &mut refused);

        // Matched call/return.
        let v = pred.predict(&call, 0x1000, true);
        score(v, &mut hits, &mut refused);
        let v = pred.predict(&ret, 0x404, true);
        score(v, &mut hits, &mut refused);

        // Indirect branch hopping between two targets.
        let target = if (i / 64) % 2 == 0 { 0x2000 } else { 0x3000 };
        let v = pred.predict(&indirect, target, true);
        score(v, &mut hits, &mut refused);
    }

    let stats = pred.stats();
    RunResult {
        branches: stats.n_branches,
        hits,
        misses: stats.n_miss,
        refused,
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let sections = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            load_sections(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => default_sections(),
    };

    for (name, cfg) in sections.iter() {
        let mut pred = BranchPredictor::new(0, name, cfg)
            .with_context(|| format!("building section `{}`", name))?;

        let result = run_section(&mut pred, args.iterations, args.seed);
        println!(
            "  {:12} {:10} {}/{} ({:.2}% correct) ({} misses, {} refused)",
            name,
            cfg.kind,
            result.hits,
            result.branches,
            result.hits as f64 / result.branches as f64 * 100.0,
            result.misses,
            result.refused,
        );

        if args.report {
            println!("[*] {}", name);
            pred.switch_out(0);
        }
    }

    Ok(())
}
