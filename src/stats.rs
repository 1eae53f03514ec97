//! Counters emitted by the predictor core, and per-branch profiling.

use itertools::Itertools;
use log::warn;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Hit/miss accounting for one predictor structure.
///
/// `accesses` counts every prediction request, predicted or not; the energy
/// model hangs off it. Hits and misses are bumped by the owner of the
/// structure, never from inside a `predict` implementation, and only for
/// update-run calls that produced a real prediction.
#[derive(Clone, Copy, Debug, Default)]
pub struct Tally {
    pub hits: u64,
    pub misses: u64,
    pub accesses: u64,
}

impl Tally {
    pub fn predictions(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        self.hits as f64 / self.predictions() as f64
    }
}

/// Prediction quality observed for one static branch.
#[derive(Clone, Copy, Debug, Default)]
pub struct BranchRecord {
    pub correct: u64,
    pub mispredicted: u64,
}

impl BranchRecord {
    pub fn executions(&self) -> u64 {
        self.correct + self.mispredicted
    }

    pub fn accuracy(&self) -> f64 {
        self.correct as f64 / self.executions() as f64
    }
}

/// Execution-count buckets used by the context-switch report.
const BUCKETS: [(u64, u64, &str); 4] = [
    (0, 9, "1-9"),
    (10, 99, "10-99"),
    (100, 999, "100-999"),
    (1000, u64::MAX, "1000+"),
];

/// Per-branch prediction profile, keyed by hashed instruction id.
///
/// Diagnostic only; the map is capped so a pathological workload cannot grow
/// it without bound, and entries past the cap are silently dropped.
pub struct BranchProfile {
    data: BTreeMap<u64, BranchRecord>,
    cap: usize,
    cap_warned: bool,
}

impl BranchProfile {
    pub const DEFAULT_CAP: usize = 1 << 20;

    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            cap: Self::DEFAULT_CAP,
            cap_warned: false,
        }
    }

    pub fn record(&mut self, id: u64, correct: bool) {
        if !self.data.contains_key(&id) && self.data.len() >= self.cap {
            if !self.cap_warned {
                warn!("branch profile reached {} entries, new branches untracked", self.cap);
                self.cap_warned = true;
            }
            return;
        }
        let entry = self.data.entry(id).or_default();
        if correct {
            entry.correct += 1;
        } else {
            entry.mispredicted += 1;
        }
    }

    pub fn num_branches(&self) -> usize {
        self.data.len()
    }

    /// The most frequently executed branches, most frequent first.
    pub fn common_branches(&self, n: usize) -> Vec<(u64, BranchRecord)> {
        self.data
            .iter()
            .sorted_by_key(|(_, r)| r.executions())
            .rev()
            .take(n)
            .map(|(id, r)| (*id, *r))
            .collect()
    }

    /// The four-bucket execution-count histogram printed on switch-out.
    pub fn report(&self) -> String {
        let mut branches = [0u64; 4];
        let mut correct = [0u64; 4];
        let mut mispredicted = [0u64; 4];

        for record in self.data.values() {
            let total = record.executions();
            for (i, (lo, hi, _)) in BUCKETS.iter().enumerate() {
                if total >= *lo && total <= *hi {
                    branches[i] += 1;
                    correct[i] += record.correct;
                    mispredicted[i] += record.mispredicted;
                    break;
                }
            }
        }

        let mut out = String::new();
        writeln!(out, "Instructions Executed").unwrap();
        for (i, (_, _, label)) in BUCKETS.iter().enumerate() {
            writeln!(out, "{} Times:\t{}", label, branches[i]).unwrap();
        }
        writeln!(out).unwrap();
        writeln!(out, "Accuracies for instructions executed").unwrap();
        for (i, (_, _, label)) in BUCKETS.iter().enumerate() {
            let total = correct[i] + mispredicted[i];
            let accuracy = correct[i] as f64 / total as f64;
            writeln!(out, "{} Times:\t{:.6}", label, accuracy).unwrap();
        }
        out
    }
}

impl Default for BranchProfile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn buckets_by_execution_count() {
        let mut p = BranchProfile::new();
        // One branch executed 3 times, one executed 12 times.
        for _ in 0..3 {
            p.record(0xa, true);
        }
        for i in 0..12 {
            p.record(0xb, i % 2 == 0);
        }
        let report = p.report();
        assert!(report.contains("1-9 Times:\t1"));
        assert!(report.contains("10-99 Times:\t1"));
    }

    #[test]
    fn common_branches_ranked() {
        let mut p = BranchProfile::new();
        p.record(0x1, true);
        for _ in 0..5 {
            p.record(0x2, false);
        }
        let top = p.common_branches(1);
        assert_eq!(top[0].0, 0x2);
        assert_eq!(top[0].1.mispredicted, 5);
    }
}
