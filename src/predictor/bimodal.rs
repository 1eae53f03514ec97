//! The 2-bit bimodal predictor.

use crate::branch::{Branch, InstId};
use crate::config::{BPredConfig, ConfigError};
use crate::predictor::{hash_id, resolve_with_btb, Btb, CounterTableConfig, CounterTable, Verdict};

/// One table of saturating counters indexed by hashed PC.
#[derive(Debug)]
pub struct Bimodal {
    btb: Btb,
    table: CounterTable,
    addr_shift: u32,
}

impl Bimodal {
    pub fn new(section: &str, cfg: &BPredConfig) -> Result<Self, ConfigError> {
        let table = CounterTableConfig {
            size: cfg.size,
            bits: cfg.bits,
        }
        .build(section, "size", "bits")?;
        Ok(Self {
            btb: Btb::new(section, cfg)?,
            table,
            addr_shift: cfg.bpred_4_cycle_addr_shift,
        })
    }

    pub fn predict(&mut self, br: &Branch, oracle: InstId, update: bool) -> Verdict {
        let taken = br.resolve(oracle);
        let idx = hash_id(br.pc, self.addr_shift);
        let ptaken = if update {
            self.table.predict_update(idx, taken)
        } else {
            self.table.predict(idx)
        };
        resolve_with_btb(&mut self.btb, br, oracle, update, taken.into(), ptaken.into())
    }
}
