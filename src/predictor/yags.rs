//! The YAGS predictor.

use crate::branch::{Branch, InstId, Outcome};
use crate::config::{BPredConfig, ConfigError};
use crate::predictor::{hash_id, resolve_with_btb, Btb, CounterTable, CounterTableConfig, Verdict};

/// A bimodal baseline with two tagged exception caches.
///
/// The bimodal table captures each branch's bias; the caches capture only
/// the executions that break it. A branch the bimodal calls taken checks
/// the taken-side cache for a tagged exception entry, and symmetrically for
/// not-taken.
#[derive(Debug)]
pub struct Yags {
    btb: Btb,
    history_mask: u64,
    ghr: u64,
    bim: CounterTable,
    taken_ctr: CounterTable,
    taken_tags: Vec<u8>,
    not_taken_ctr: CounterTable,
    not_taken_tags: Vec<u8>,
    cache_mask: u64,
    tag_shift: u32,
    tag_mask: u64,
    addr_shift: u32,
}

impl Yags {
    pub fn new(section: &str, cfg: &BPredConfig) -> Result<Self, ConfigError> {
        BPredConfig::history_bits(section, "historySize", cfg.history_size)?;
        if cfg.cttagsize == 0 || cfg.cttagsize > 8 {
            return Err(ConfigError::Invalid {
                section: section.to_string(),
                key: "cttagsize",
                msg: format!("tag width {} outside 1..=8", cfg.cttagsize),
            });
        }
        let bim = CounterTableConfig {
            size: cfg.size,
            bits: cfg.bits,
        }
        .build(section, "size", "bits")?;
        let taken_ctr = CounterTableConfig {
            size: cfg.ctsize,
            bits: cfg.ctbits,
        }
        .build(section, "ctsize", "ctbits")?;
        let not_taken_ctr = taken_ctr.clone();
        Ok(Self {
            btb: Btb::new(section, cfg)?,
            history_mask: (1u64 << cfg.history_size) - 1,
            ghr: 0,
            bim,
            taken_ctr,
            taken_tags: vec![0; cfg.ctsize],
            not_taken_ctr,
            not_taken_tags: vec![0; cfg.ctsize],
            cache_mask: (cfg.ctsize - 1) as u64,
            tag_shift: cfg.ctsize.ilog2(),
            tag_mask: (1u64 << cfg.cttagsize) - 1,
            addr_shift: cfg.bpred_4_cycle_addr_shift,
        })
    }

    fn cache_index(&self, iid: u64) -> u64 {
        (iid ^ (self.ghr & self.history_mask)) & self.cache_mask
    }

    /// The partial tag comes from the id bits above the cache index.
    fn tag(&self, iid: u64) -> u8 {
        ((iid >> self.tag_shift) & self.tag_mask) as u8
    }

    pub fn predict(&mut self, br: &Branch, oracle: InstId, update: bool) -> Verdict {
        let taken = br.resolve(oracle);
        let iid = hash_id(br.pc, self.addr_shift);
        let idx = self.cache_index(iid);
        let tag = self.tag(iid);

        let bias = self.bim.predict(iid);
        let (tags, cache) = match bias {
            Outcome::T => (&mut self.taken_tags, &mut self.taken_ctr),
            Outcome::N => (&mut self.not_taken_tags, &mut self.not_taken_ctr),
        };
        let hit = tags[idx as usize] == tag;
        let ptaken = if hit { cache.predict(idx) } else { bias };

        if update {
            if hit {
                cache.update(idx, taken);
            } else if ptaken != taken {
                // The branch broke its bias with no exception entry to catch
                // it: allocate one, weakly pointed at the actual outcome.
                tags[idx as usize] = tag;
                cache.reset(idx, taken);
            }
            self.bim.update(iid, taken);
            self.ghr = (self.ghr << 1) | u64::from(bool::from(taken));
        }

        resolve_with_btb(&mut self.btb, br, oracle, update, taken.into(), ptaken.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::branch::Branch;
    use crate::config::BPredConfig;

    fn yags() -> Yags {
        Yags::new("test", &BPredConfig::default()).unwrap()
    }

    #[test]
    fn biased_branch_converges() {
        let mut p = yags();
        let br = Branch::conditional(0x100, 0x104, 0x80);
        let mut tail_misses = 0;
        for i in 0..40 {
            let v = p.predict(&br, 0x80, true);
            if i >= 8 && v == Verdict::Miss {
                tail_misses += 1;
            }
        }
        assert_eq!(tail_misses, 0);
    }

    #[test]
    fn exception_entry_overrides_the_bias() {
        // Bias the branch strongly not-taken, then repeat a taken execution
        // under one fixed history. The allocated exception entry should take
        // over for that history while the bias stays not-taken.
        let mut p = yags();
        let br = Branch::conditional(0x100, 0x104, 0x80);
        let iid = hash_id(0x100, 0);
        for _ in 0..4 {
            p.predict(&br, 0x104, true);
        }
        assert_eq!(p.bim.predict(iid), Outcome::N);
        // Breaks the bias: allocates in the not-taken-side cache.
        assert_eq!(p.predict(&br, 0x80, true), Verdict::Miss);
        assert_eq!(p.bim.predict(iid), Outcome::N);
    }

    #[test]
    fn rejects_oversized_tags() {
        let cfg = BPredConfig {
            kind: "YAGS".to_string(),
            cttagsize: 12,
            ..BPredConfig::default()
        };
        assert!(Yags::new("test", &cfg).is_err());
    }
}
