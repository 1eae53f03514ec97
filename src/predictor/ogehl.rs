//! The O-GEHL (optimized geometric history length) predictor.

use crate::branch::{Branch, InstId, Outcome};
use crate::config::{BPredConfig, ConfigError};
use crate::history::HistoryRegister;
use crate::predictor::{hash_id, resolve_with_btb, Btb, Verdict};

/// Saturation point for the adaptive-threshold counter.
const THRESHOLD_STEP: i32 = 64;

/// Ceiling for the update threshold.
const MAX_THRESHOLD: i32 = 31;

/// Width of the mini-tag guarding the shortest-history table.
const MINI_TAG_BITS: u32 = 4;

/// A sum-of-counters predictor over geometrically spaced history lengths.
///
/// Table 0 indexes by PC alone; table `i` folds the youngest `L(i)` bits of
/// global history into its index, with the lengths forming a geometric
/// series up to `glength`. The direction is the sign of the summed signed
/// counters, and updates happen only on a misprediction or when the sum's
/// magnitude falls inside an adaptively tuned threshold.
#[derive(Debug)]
pub struct Ogehl {
    btb: Btb,
    log_size: u32,
    index_mask: u64,
    ctr_max: i8,
    ctr_min: i8,
    tables: Vec<Vec<i8>>,
    hist_lengths: Vec<usize>,
    ghr: HistoryRegister,
    path: u64,
    path_mask: u64,
    mini_tags: Vec<u8>,
    /// Index rotation stride mixing the folded bits per table.
    entry_skew: usize,
    threshold: i32,
    threshold_ctr: i32,
    addr_shift: u32,
}

impl Ogehl {
    pub fn new(section: &str, cfg: &BPredConfig) -> Result<Self, ConfigError> {
        BPredConfig::power_of_two(section, "tsize", cfg.tsize)?;
        BPredConfig::counter_bits(section, "bits", cfg.bits)?;
        if cfg.tsize < 2 {
            return Err(ConfigError::Invalid {
                section: section.to_string(),
                key: "tsize",
                msg: "folded index needs at least one bit".to_string(),
            });
        }
        if cfg.mtables < 2 {
            return Err(ConfigError::Invalid {
                section: section.to_string(),
                key: "mtables",
                msg: format!("need at least 2 tables, got {}", cfg.mtables),
            });
        }
        if cfg.glength < cfg.mtables {
            return Err(ConfigError::Invalid {
                section: section.to_string(),
                key: "glength",
                msg: format!(
                    "history length {} shorter than {} tables",
                    cfg.glength, cfg.mtables
                ),
            });
        }
        if cfg.addwidth == 0 || cfg.addwidth > 63 {
            return Err(ConfigError::Invalid {
                section: section.to_string(),
                key: "addwidth",
                msg: format!("path width {} outside 1..=63", cfg.addwidth),
            });
        }
        if cfg.nentry == 0 {
            return Err(ConfigError::Invalid {
                section: section.to_string(),
                key: "nentry",
                msg: "index skew stride must be nonzero".to_string(),
            });
        }

        let log_size = cfg.tsize.ilog2();
        let hist_lengths = Self::geometric_lengths(cfg.mtables, cfg.glength);

        Ok(Self {
            btb: Btb::new(section, cfg)?,
            log_size,
            index_mask: (cfg.tsize - 1) as u64,
            ctr_max: (1i16 << (cfg.bits - 1)) as i8 - 1,
            ctr_min: -(1i16 << (cfg.bits - 1)) as i8,
            tables: vec![vec![0; cfg.tsize]; cfg.mtables],
            hist_lengths,
            ghr: HistoryRegister::new(cfg.glength),
            path: 0,
            path_mask: (1u64 << cfg.addwidth) - 1,
            mini_tags: vec![0; cfg.tsize],
            entry_skew: cfg.nentry,
            threshold: cfg.mtables as i32,
            threshold_ctr: 0,
            addr_shift: cfg.bpred_4_cycle_addr_shift,
        })
    }

    /// History lengths `L(0) = 0 < L(1) < … < L(m-1) = glength`, spaced by a
    /// constant ratio.
    fn geometric_lengths(mtables: usize, glength: usize) -> Vec<usize> {
        let mut lengths = vec![0];
        let base = 2.0f64;
        let ratio = (glength as f64 / base).powf(1.0 / (mtables as f64 - 2.0));
        let mut prev = 0usize;
        for i in 1..mtables {
            let ideal = (base * ratio.powi(i as i32 - 1)).round() as usize;
            let len = ideal.max(prev + 1).min(glength);
            lengths.push(len);
            prev = len;
        }
        // Rounding may undershoot the configured maximum.
        *lengths.last_mut().unwrap() = glength;
        lengths
    }

    fn index(&self, table: usize, iid: u64) -> u64 {
        if table == 0 {
            return iid & self.index_mask;
        }
        let fold = self.ghr.fold(self.hist_lengths[table], self.log_size);
        // Rotate the folded bits within the index width so the tables decorrelate.
        let skew = ((table * self.entry_skew) as u32) % self.log_size;
        let fold = if skew == 0 {
            fold
        } else {
            ((fold << skew) | (fold >> (self.log_size - skew))) & self.index_mask
        };
        let path = self.path & self.path_mask;
        (iid ^ (iid >> self.log_size) ^ fold ^ path) & self.index_mask
    }

    fn mini_tag(&self, iid: u64) -> u8 {
        ((iid >> self.log_size) & ((1 << MINI_TAG_BITS) - 1)) as u8
    }

    pub fn predict(&mut self, br: &Branch, oracle: InstId, update: bool) -> Verdict {
        let taken = br.resolve(oracle);
        let iid = hash_id(br.pc, self.addr_shift);

        let indices: Vec<u64> = (0..self.tables.len()).map(|t| self.index(t, iid)).collect();
        let tag = self.mini_tag(iid);
        // The shortest nonzero history aliases hardest; its table only votes
        // when the mini-tag agrees the entry is really ours.
        let tag_hit = self.mini_tags[indices[1] as usize] == tag;

        let mut sum: i32 = 0;
        for (t, idx) in indices.iter().enumerate() {
            if t == 1 && !tag_hit {
                continue;
            }
            sum += i32::from(self.tables[t][*idx as usize]);
        }
        let ptaken = Outcome::from(sum >= 0);

        if update {
            let correct = ptaken == taken;
            if !correct || sum.abs() <= self.threshold {
                for (t, idx) in indices.iter().enumerate() {
                    if t == 1 && !tag_hit {
                        self.mini_tags[*idx as usize] = tag;
                        self.tables[t][*idx as usize] = match taken {
                            Outcome::T => 0,
                            Outcome::N => -1,
                        };
                        continue;
                    }
                    let c = &mut self.tables[t][*idx as usize];
                    *c = match taken {
                        Outcome::T => c.saturating_add(1).min(self.ctr_max),
                        Outcome::N => c.saturating_sub(1).max(self.ctr_min),
                    };
                }
            }

            // Adaptive threshold: mispredictions push the update window
            // open, easy correct predictions squeeze it shut.
            if !correct {
                self.threshold_ctr += 1;
                if self.threshold_ctr >= THRESHOLD_STEP {
                    self.threshold = (self.threshold + 1).min(MAX_THRESHOLD);
                    self.threshold_ctr = 0;
                }
            } else if sum.abs() <= self.threshold {
                self.threshold_ctr -= 1;
                if self.threshold_ctr <= -THRESHOLD_STEP {
                    self.threshold = (self.threshold - 1).max(0);
                    self.threshold_ctr = 0;
                }
            }

            self.ghr.shift_in(taken.into());
            self.path = ((self.path << 1) | (br.pc & 1)) & self.path_mask;
        }

        resolve_with_btb(&mut self.btb, br, oracle, update, taken.into(), ptaken.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::branch::Branch;
    use crate::config::BPredConfig;

    fn ogehl() -> Ogehl {
        Ogehl::new(
            "test",
            &BPredConfig {
                kind: "OGEHL".to_string(),
                bits: 4,
                ..BPredConfig::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn lengths_are_strictly_increasing_to_glength() {
        let lengths = Ogehl::geometric_lengths(8, 128);
        assert_eq!(lengths[0], 0);
        assert_eq!(*lengths.last().unwrap(), 128);
        for pair in lengths.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn biased_branch_converges() {
        let mut p = ogehl();
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
    fn counters_stay_in_signed_range() {
        let mut p = ogehl();
        let br = Branch::conditional(0x100, 0x104, 0x80);
        for i in 0..500 {
            let oracle = if i % 5 == 0 { 0x104 } else { 0x80 };
            p.predict(&br, oracle, true);
        }
        for table in p.tables.iter() {
            for c in table.iter() {
                assert!(*c >= p.ctr_min && *c <= p.ctr_max);
            }
        }
    }

    #[test]
    fn threshold_stays_bounded() {
        let mut p = ogehl();
        // Random-ish stream keeps the predictor mispredicting.
        let br = Branch::conditional(0x100, 0x104, 0x80);
        for i in 0..2000 {
            let oracle = if (i * 7) % 3 == 0 { 0x104 } else { 0x80 };
            p.predict(&br, oracle, true);
        }
        assert!(p.threshold >= 0 && p.threshold <= MAX_THRESHOLD);
    }

    #[test]
    fn rejects_short_history() {
        let cfg = BPredConfig {
            kind: "OGEHL".to_string(),
            mtables: 8,
            glength: 4,
            ..BPredConfig::default()
        };
        assert!(Ogehl::new("test", &cfg).is_err());
    }
}
