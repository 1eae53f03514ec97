//! The 2Bc-gskew predictor.

use crate::branch::{Branch, InstId, Outcome};
use crate::config::{BPredConfig, ConfigError};
use crate::predictor::{hash_id, resolve_with_btb, Btb, CounterTable, CounterTableConfig, Verdict};

/// Bimodal plus two skewed global tables under a meta chooser.
///
/// G0 and G1 hash the same history at different lengths so they alias
/// differently; the direction is the majority of {BIM, G0, G1} unless the
/// meta table (taken state) says the bimodal alone has been the better
/// guide for this history.
#[derive(Debug)]
pub struct GSkew {
    btb: Btb,
    bim: CounterTable,
    g0: CounterTable,
    g0_history_mask: u64,
    g1: CounterTable,
    g1_history_mask: u64,
    meta: CounterTable,
    meta_history_mask: u64,
    history: u64,
    addr_shift: u32,
}

impl GSkew {
    pub fn new(section: &str, cfg: &BPredConfig) -> Result<Self, ConfigError> {
        BPredConfig::history_bits(section, "G0HistSize", cfg.g0_hist_size)?;
        BPredConfig::history_bits(section, "G1HistSize", cfg.g1_hist_size)?;
        BPredConfig::history_bits(section, "MetaHistSize", cfg.meta_hist_size)?;
        let bim = CounterTableConfig {
            size: cfg.bim_size,
            bits: cfg.bim_bits,
        }
        .build(section, "BIMSize", "BIMBits")?;
        let g0 = CounterTableConfig {
            size: cfg.g0_size,
            bits: cfg.bits,
        }
        .build(section, "G0Size", "bits")?;
        let g1 = CounterTableConfig {
            size: cfg.g1_size,
            bits: cfg.bits,
        }
        .build(section, "G1Size", "bits")?;
        let meta = CounterTableConfig {
            size: cfg.meta_size,
            bits: cfg.bits,
        }
        .build(section, "MetaSize", "bits")?;
        Ok(Self {
            btb: Btb::new(section, cfg)?,
            bim,
            g0,
            g0_history_mask: (1u64 << cfg.g0_hist_size) - 1,
            g1,
            g1_history_mask: (1u64 << cfg.g1_hist_size) - 1,
            meta,
            meta_history_mask: (1u64 << cfg.meta_hist_size) - 1,
            history: 0,
            addr_shift: cfg.bpred_4_cycle_addr_shift,
        })
    }

    pub fn predict(&mut self, br: &Branch, oracle: InstId, update: bool) -> Verdict {
        let taken = br.resolve(oracle);
        let iid = hash_id(br.pc, self.addr_shift);

        let g0_idx = (self.history & self.g0_history_mask) ^ iid;
        let g1_idx = (self.history & self.g1_history_mask) ^ iid;
        let meta_idx = (self.history & self.meta_history_mask) ^ iid;

        let bim_vote = self.bim.predict(iid);
        let g0_vote = self.g0.predict(g0_idx);
        let g1_vote = self.g1.predict(g1_idx);
        let votes = [bim_vote, g0_vote, g1_vote]
            .iter()
            .filter(|v| **v == Outcome::T)
            .count();
        let majority = Outcome::from(votes >= 2);

        let ptaken = match self.meta.predict(meta_idx) {
            Outcome::T => bim_vote,
            Outcome::N => majority,
        };

        if update {
            if ptaken == taken {
                // Partial update: only the tables that voted with the final
                // direction are reinforced, so disagreeing tables keep the
                // state they earned on other histories.
                if bim_vote == ptaken {
                    self.bim.update(iid, taken);
                }
                if g0_vote == ptaken {
                    self.g0.update(g0_idx, taken);
                }
                if g1_vote == ptaken {
                    self.g1.update(g1_idx, taken);
                }
            } else {
                self.bim.update(iid, taken);
                self.g0.update(g0_idx, taken);
                self.g1.update(g1_idx, taken);
            }

            // The meta chooser learns whenever the bimodal and the skewed
            // majority part ways.
            if bim_vote != majority {
                self.meta.update(meta_idx, Outcome::from(bim_vote == taken));
            }

            self.history = (self.history << 1) | u64::from(bool::from(taken));
        }

        resolve_with_btb(&mut self.btb, br, oracle, update, taken.into(), ptaken.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::branch::Branch;
    use crate::config::BPredConfig;

    fn gskew() -> GSkew {
        GSkew::new("test", &BPredConfig::default()).unwrap()
    }

    #[test]
    fn biased_branch_converges() {
        let mut p = gskew();
        let br = Branch::conditional(0x100, 0x104, 0x80);
        let mut tail_misses = 0;
        for i in 0..80 {
            let v = p.predict(&br, 0x80, true);
            if i >= 40 && v == Verdict::Miss {
                tail_misses += 1;
            }
        }
        assert_eq!(tail_misses, 0);
    }

    #[test]
    fn misprediction_updates_every_table() {
        let mut p = gskew();
        let br = Branch::conditional(0x100, 0x104, 0x80);
        let iid = hash_id(0x100, 0);
        // All tables cold at weakly-not-taken; a taken branch misses and
        // nudges every voter.
        assert_eq!(p.predict(&br, 0x80, true), Verdict::Miss);
        assert_eq!(p.bim.predict(iid), Outcome::T);
    }

    #[test]
    fn unanimous_correct_vote_strengthens_everyone() {
        let mut p = gskew();
        let br = Branch::conditional(0x100, 0x104, 0x80);
        let iid = hash_id(0x100, 0);
        // Not-taken with all tables cold: every voter is right and deepens
        // its not-taken state.
        assert_eq!(p.predict(&br, 0x104, true), Verdict::Correct);
        assert_eq!(p.bim.raw(iid), 0b00);
    }
}
