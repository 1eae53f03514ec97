//! The hybrid (tournament) predictor.

use crate::branch::{Branch, InstId, Outcome};
use crate::config::{BPredConfig, ConfigError};
use crate::predictor::{hash_id, resolve_with_btb, Btb, CounterTable, CounterTableConfig, Verdict};

/// A local and a global component arbitrated by a meta table.
///
/// The local component indexes by hashed PC; the global component and the
/// meta table index by the shared global history register. A taken meta
/// counter sides with the global component.
#[derive(Debug)]
pub struct Hybrid {
    btb: Btb,
    history_mask: u64,
    ghr: u64,
    local: CounterTable,
    global: CounterTable,
    meta: CounterTable,
    addr_shift: u32,
}

impl Hybrid {
    pub fn new(section: &str, cfg: &BPredConfig) -> Result<Self, ConfigError> {
        BPredConfig::history_bits(section, "historySize", cfg.history_size)?;
        let local = CounterTableConfig {
            size: cfg.l1size,
            bits: cfg.bits,
        }
        .build(section, "l1size", "bits")?;
        let global = CounterTableConfig {
            size: cfg.l2size,
            bits: cfg.bits,
        }
        .build(section, "l2size", "bits")?;
        let meta = CounterTableConfig {
            size: cfg.l2size,
            bits: cfg.bits,
        }
        .build(section, "l2size", "bits")?;
        Ok(Self {
            btb: Btb::new(section, cfg)?,
            history_mask: (1u64 << cfg.history_size) - 1,
            ghr: 0,
            local,
            global,
            meta,
            addr_shift: cfg.bpred_4_cycle_addr_shift,
        })
    }

    pub fn predict(&mut self, br: &Branch, oracle: InstId, update: bool) -> Verdict {
        let taken = br.resolve(oracle);
        let iid = hash_id(br.pc, self.addr_shift);
        let gindex = self.ghr & self.history_mask;

        let local = self.local.predict(iid);
        let global = self.global.predict(gindex);
        let ptaken = match self.meta.predict(gindex) {
            Outcome::T => global,
            Outcome::N => local,
        };

        if update {
            // The meta counter only moves when exactly one component was
            // right; agreement teaches it nothing.
            if local != global {
                let winner = Outcome::from(global == taken);
                self.meta.update(gindex, winner);
            }
            self.local.update(iid, taken);
            self.global.update(gindex, taken);
            self.ghr = (self.ghr << 1) | u64::from(bool::from(taken));
        }

        resolve_with_btb(&mut self.btb, br, oracle, update, taken.into(), ptaken.into())
    }
}
