//! Stateless direction predictors: Oracle, NotTaken, Taken, Static.

use crate::branch::{Branch, InstId};
use crate::config::{BPredConfig, ConfigError};
use crate::predictor::{resolve_with_btb, Btb, Verdict};

/// Perfect direction knowledge; only the target buffer can miss.
/// Used as a ceiling when comparing real predictors.
#[derive(Debug)]
pub struct OraclePredictor {
    btb: Btb,
}

impl OraclePredictor {
    pub fn new(section: &str, cfg: &BPredConfig) -> Result<Self, ConfigError> {
        Ok(Self { btb: Btb::new(section, cfg)? })
    }

    pub fn predict(&mut self, br: &Branch, oracle: InstId, update: bool) -> Verdict {
        let taken: bool = br.resolve(oracle).into();
        if !taken {
            return Verdict::Correct;
        }
        self.btb.predict(br, oracle, update)
    }
}

/// Always guess not-taken. The implicit target is the fall-through, so the
/// buffer is never consulted.
#[derive(Debug)]
pub struct NotTakenPredictor;

impl NotTakenPredictor {
    pub fn new() -> Self {
        Self
    }

    pub fn predict(&mut self, br: &Branch, oracle: InstId, _update: bool) -> Verdict {
        if br.fall_through == oracle {
            Verdict::Correct
        } else {
            Verdict::Miss
        }
    }
}

impl Default for NotTakenPredictor {
    fn default() -> Self {
        Self::new()
    }
}

/// Always guess taken; the buffer supplies the target.
#[derive(Debug)]
pub struct TakenPredictor {
    btb: Btb,
}

impl TakenPredictor {
    pub fn new(section: &str, cfg: &BPredConfig) -> Result<Self, ConfigError> {
        Ok(Self { btb: Btb::new(section, cfg)? })
    }

    pub fn predict(&mut self, br: &Branch, oracle: InstId, update: bool) -> Verdict {
        let taken: bool = br.resolve(oracle).into();
        resolve_with_btb(&mut self.btb, br, oracle, update, taken, true)
    }
}

/// Backward-taken, forward-not-taken: a branch whose encoded target sits
/// below its fall-through is guessed taken.
#[derive(Debug)]
pub struct StaticPredictor {
    btb: Btb,
}

impl StaticPredictor {
    pub fn new(section: &str, cfg: &BPredConfig) -> Result<Self, ConfigError> {
        Ok(Self { btb: Btb::new(section, cfg)? })
    }

    pub fn predict(&mut self, br: &Branch, oracle: InstId, update: bool) -> Verdict {
        let taken: bool = br.resolve(oracle).into();
        let ptaken = match br.target {
            Some(target) => target < br.fall_through,
            None => false,
        };
        resolve_with_btb(&mut self.btb, br, oracle, update, taken, ptaken)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::branch::Branch;
    use crate::config::BPredConfig;

    fn cfg() -> BPredConfig {
        BPredConfig::default()
    }

    #[test]
    fn oracle_only_misses_cold_targets() {
        let mut p = OraclePredictor::new("test", &cfg()).unwrap();
        let br = Branch::conditional(0x100, 0x104, 0x80);
        assert_eq!(p.predict(&br, 0x80, true), Verdict::NoTarget);
        for _ in 0..4 {
            assert_eq!(p.predict(&br, 0x80, true), Verdict::Correct);
        }
        assert_eq!(p.predict(&br, 0x104, true), Verdict::Correct);
    }

    #[test]
    fn not_taken_matches_fall_through_only() {
        let mut p = NotTakenPredictor::new();
        let br = Branch::conditional(0x100, 0x104, 0x80);
        assert_eq!(p.predict(&br, 0x104, true), Verdict::Correct);
        assert_eq!(p.predict(&br, 0x80, true), Verdict::Miss);
    }

    #[test]
    fn taken_mispredicts_fall_through() {
        let mut p = TakenPredictor::new("test", &cfg()).unwrap();
        let br = Branch::conditional(0x100, 0x104, 0x80);
        assert_eq!(p.predict(&br, 0x104, true), Verdict::Miss);
        assert_eq!(p.predict(&br, 0x80, true), Verdict::NoTarget);
        assert_eq!(p.predict(&br, 0x80, true), Verdict::Correct);
    }

    #[test]
    fn static_takes_backward_branches() {
        let mut p = StaticPredictor::new("test", &cfg()).unwrap();
        // Backward branch taken 10 times: one cold target miss, then hits.
        let br = Branch::conditional(0x100, 0x104, 0x80);
        assert_eq!(p.predict(&br, 0x80, true), Verdict::NoTarget);
        for _ in 0..9 {
            assert_eq!(p.predict(&br, 0x80, true), Verdict::Correct);
        }
    }

    #[test]
    fn static_falls_through_forward_branches() {
        let mut p = StaticPredictor::new("test", &cfg()).unwrap();
        let br = Branch::conditional(0x100, 0x104, 0x200);
        assert_eq!(p.predict(&br, 0x104, true), Verdict::Correct);
        assert_eq!(p.predict(&br, 0x200, true), Verdict::Miss);
    }
}
