//! The branch-target buffer.

use crate::branch::{Branch, InstId};
use crate::cache::{CacheConfig, SetAssocCache};
use crate::config::{BPredConfig, ConfigError};
use crate::predictor::{hash_id, Verdict};

/// A set-associative map from branch key to last-seen target.
///
/// Only taken branches have a target worth remembering; a not-taken oracle
/// leaves the buffer untouched.
#[derive(Debug)]
pub struct Btb {
    data: SetAssocCache<InstId>,
    addr_shift: u32,
}

impl Btb {
    pub fn new(section: &str, cfg: &BPredConfig) -> Result<Self, ConfigError> {
        let geometry = CacheConfig {
            size: cfg.btb_size,
            line_size: cfg.btb_bsize,
            assoc: cfg.btb_assoc,
        };
        geometry.validate(section)?;
        Ok(Self {
            data: SetAssocCache::new(geometry),
            addr_shift: cfg.bpred_4_cycle_addr_shift,
        })
    }

    fn key(&self, br: &Branch) -> u64 {
        hash_id(br.pc, self.addr_shift)
    }

    /// Predict the target for `br` and, on an update run, learn the oracle's.
    pub fn predict(&mut self, br: &Branch, oracle: InstId, update: bool) -> Verdict {
        // Fall-through commits never consult the buffer.
        if oracle == br.fall_through {
            return Verdict::Correct;
        }

        let key = self.key(br);
        if !update {
            return match self.data.probe(key) {
                Some(target) if *target == oracle => Verdict::Correct,
                Some(_) => Verdict::Miss,
                None => Verdict::NoTarget,
            };
        }

        match self.data.find(key, true) {
            Some(target) if *target == oracle => Verdict::Correct,
            Some(target) => {
                *target = oracle;
                Verdict::Miss
            }
            None => {
                *self.data.fill(key) = oracle;
                Verdict::NoTarget
            }
        }
    }

    /// Learn the committed target without producing a verdict. Used by
    /// direction predictors whose guess was wrong, so the buffer still
    /// tracks where the branch went.
    pub fn update_only(&mut self, br: &Branch, oracle: InstId) {
        if oracle == br.fall_through {
            return;
        }
        *self.data.fill(self.key(br)) = oracle;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::branch::Branch;
    use crate::config::BPredConfig;

    fn btb() -> Btb {
        Btb::new("test", &BPredConfig::default()).unwrap()
    }

    #[test]
    fn first_taken_sighting_has_no_target() {
        let mut b = btb();
        let br = Branch::indirect(0x300, 0x304);
        assert_eq!(b.predict(&br, 0xa, true), Verdict::NoTarget);
        assert_eq!(b.predict(&br, 0xa, true), Verdict::Correct);
    }

    #[test]
    fn target_change_mispredicts_then_relearns() {
        let mut b = btb();
        let br = Branch::indirect(0x300, 0x304);
        // Targets a, a, b, a: one allocation, one hit, two misses.
        assert_eq!(b.predict(&br, 0xa, true), Verdict::NoTarget);
        assert_eq!(b.predict(&br, 0xa, true), Verdict::Correct);
        assert_eq!(b.predict(&br, 0xb, true), Verdict::Miss);
        assert_eq!(b.predict(&br, 0xa, true), Verdict::Miss);
        assert_eq!(b.predict(&br, 0xa, true), Verdict::Correct);
    }

    #[test]
    fn fall_through_oracle_never_touches_state() {
        let mut b = btb();
        let br = Branch::conditional(0x400, 0x404, 0x80);
        assert_eq!(b.predict(&br, 0x404, true), Verdict::Correct);
        // Still no entry for the taken case.
        assert_eq!(b.predict(&br, 0x80, true), Verdict::NoTarget);
    }

    #[test]
    fn non_update_probe_leaves_state_cold() {
        let mut b = btb();
        let br = Branch::indirect(0x500, 0x504);
        assert_eq!(b.predict(&br, 0xa, false), Verdict::NoTarget);
        assert_eq!(b.predict(&br, 0xa, false), Verdict::NoTarget);
    }

    #[test]
    fn update_only_learns_the_target() {
        let mut b = btb();
        let br = Branch::conditional(0x600, 0x604, 0x80);
        b.update_only(&br, 0x80);
        assert_eq!(b.predict(&br, 0x80, true), Verdict::Correct);
        // A not-taken commit is not a target.
        let other = Branch::conditional(0x700, 0x704, 0x80);
        b.update_only(&other, 0x704);
        assert_eq!(b.predict(&other, 0x80, true), Verdict::NoTarget);
    }
}
