//! The two-level PAg predictor.

use crate::branch::{Branch, InstId};
use crate::config::{BPredConfig, ConfigError};
use crate::predictor::{hash_id, resolve_with_btb, Btb, CounterTable, CounterTableConfig, Verdict};

/// Per-branch local histories feeding a shared pattern table.
///
/// The first level keeps a `historySize`-bit outcome history per branch; the
/// second level is one table of counters indexed by the branch's history
/// XORed with its hashed PC.
#[derive(Debug)]
pub struct TwoLevel {
    btb: Btb,
    l1_mask: u64,
    history_mask: u64,
    history: Vec<u64>,
    pattern: CounterTable,
    addr_shift: u32,
}

impl TwoLevel {
    pub fn new(section: &str, cfg: &BPredConfig) -> Result<Self, ConfigError> {
        BPredConfig::power_of_two(section, "l1size", cfg.l1size)?;
        BPredConfig::history_bits(section, "historySize", cfg.history_size)?;
        let pattern = CounterTableConfig {
            size: cfg.l2size,
            bits: cfg.bits,
        }
        .build(section, "l2size", "bits")?;
        Ok(Self {
            btb: Btb::new(section, cfg)?,
            l1_mask: (cfg.l1size - 1) as u64,
            history_mask: (1u64 << cfg.history_size) - 1,
            history: vec![0; cfg.l1size],
            pattern,
            addr_shift: cfg.bpred_4_cycle_addr_shift,
        })
    }

    pub fn predict(&mut self, br: &Branch, oracle: InstId, update: bool) -> Verdict {
        let taken = br.resolve(oracle);
        let iid = hash_id(br.pc, self.addr_shift);

        let l1 = (iid & self.l1_mask) as usize;
        let local = self.history[l1];
        if update {
            self.history[l1] = ((local << 1) | u64::from(bool::from(taken))) & self.history_mask;
        }

        // The pattern index uses the pre-update history.
        let l2 = local ^ iid;
        let ptaken = if update {
            self.pattern.predict_update(l2, taken)
        } else {
            self.pattern.predict(l2)
        };
        resolve_with_btb(&mut self.btb, br, oracle, update, taken.into(), ptaken.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::branch::Branch;
    use crate::config::BPredConfig;

    fn twolevel() -> TwoLevel {
        TwoLevel::new("test", &BPredConfig::default()).unwrap()
    }

    #[test]
    fn learns_a_periodic_pattern() {
        // T,T,N repeating: each phase gets its own history, so each pattern
        // counter converges and the tail of the run predicts cleanly.
        let mut p = twolevel();
        let br = Branch::conditional(0x100, 0x104, 0x80);
        let stream: Vec<u64> = (0..60)
            .map(|i| if i % 3 == 2 { 0x104 } else { 0x80 })
            .collect();
        let mut tail_misses = 0;
        for (i, oracle) in stream.iter().enumerate() {
            let v = p.predict(&br, *oracle, true);
            if i >= 30 && v == Verdict::Miss {
                tail_misses += 1;
            }
        }
        assert_eq!(tail_misses, 0);
    }

    #[test]
    fn history_masks_to_configured_length() {
        let cfg = BPredConfig {
            history_size: 4,
            ..BPredConfig::default()
        };
        let mut p = TwoLevel::new("test", &cfg).unwrap();
        let br = Branch::conditional(0x100, 0x104, 0x80);
        for _ in 0..64 {
            p.predict(&br, 0x80, true);
        }
        let iid = hash_id(0x100, 0);
        assert_eq!(p.history[(iid & p.l1_mask) as usize], 0b1111);
    }

    #[test]
    fn rejects_oversized_history() {
        let cfg = BPredConfig {
            history_size: 64,
            ..BPredConfig::default()
        };
        assert!(TwoLevel::new("test", &cfg).is_err());
    }
}
