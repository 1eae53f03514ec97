//! Branch-prediction core for a cycle-level out-of-order simulator.
//!
//! The fetch stage hands every dynamic branch to a [BranchPredictor]
//! together with the committed next-instruction id; the predictor answers
//! with a [Verdict] and, on update runs, learns from the oracle. Direction
//! prediction is one of several published schemes selected per
//! configuration section; call/return targets come from the return stack
//! and taken-branch targets from the branch-target buffer.

pub mod bpred;
pub mod branch;
pub mod cache;
pub mod config;
pub mod history;
pub mod predictor;
pub mod stats;

pub use bpred::*;
pub use branch::*;
pub use config::*;
pub use predictor::*;
pub use stats::*;
