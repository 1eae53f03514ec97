//! The branch direction predictor family.
//!
//! Every variant answers the same question: given a dynamic branch and the
//! committed next-instruction identifier, guess taken or not-taken, then let
//! the embedded target buffer settle where a taken branch goes. Variants
//! differ only in the state they consult and the discipline they use to
//! update it.

pub mod bimodal;
pub mod btb;
pub mod counter;
pub mod gskew;
pub mod hybrid;
pub mod ogehl;
pub mod ras;
pub mod simple;
pub mod twolevel;
pub mod yags;

pub use bimodal::*;
pub use btb::*;
pub use counter::*;
pub use gskew::*;
pub use hybrid::*;
pub use ogehl::*;
pub use ras::*;
pub use simple::*;
pub use twolevel::*;
pub use yags::*;

use crate::branch::{Branch, InstId, Pid};
use crate::config::{BPredConfig, ConfigError};

/// The verdict for one prediction request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verdict {
    /// Direction and target both right.
    Correct,
    /// The structure declined to predict (non-return at the RAS, or the
    /// cycle's prediction budget ran out). Not an error.
    NoPrediction,
    /// Direction right, but the target buffer had no entry.
    NoTarget,
    /// Wrong direction or wrong target.
    Miss,
}

/// Hash a pseudo-PC down to a table key.
///
/// The shift drops the bits a single fetch slot covers; the fold spreads the
/// upper bits so neighboring branches do not march through consecutive
/// entries.
pub(crate) fn hash_id(pc: InstId, addr_shift: u32) -> u64 {
    let cid = pc >> addr_shift;
    (cid >> 17) ^ cid
}

/// Settle a direction guess against the oracle and the target buffer.
///
/// A wrong direction is a miss no matter what the BTB holds, but the BTB
/// still learns the committed target. A correct not-taken needs no target.
/// A correct taken is only as good as the BTB's entry.
pub(crate) fn resolve_with_btb(
    btb: &mut Btb,
    br: &Branch,
    oracle: InstId,
    update: bool,
    taken: bool,
    ptaken: bool,
) -> Verdict {
    if ptaken != taken {
        if update {
            btb.update_only(br, oracle);
        }
        return Verdict::Miss;
    }
    if taken {
        btb.predict(br, oracle, update)
    } else {
        Verdict::Correct
    }
}

/// The direction-predictor variants, dispatched as a tagged union.
///
/// A single match per prediction stands in for the virtual call the original
/// design paid; each variant owns its target buffer and whatever history it
/// keeps.
#[derive(Debug)]
pub enum DirectionPredictor {
    Oracle(OraclePredictor),
    NotTaken(NotTakenPredictor),
    Taken(TakenPredictor),
    Static(StaticPredictor),
    Bimodal(Bimodal),
    TwoLevel(TwoLevel),
    Hybrid(Hybrid),
    GSkew(GSkew),
    Yags(Yags),
    Ogehl(Ogehl),
}

impl DirectionPredictor {
    /// Build the variant a configuration section names.
    pub fn from_config(section: &str, cfg: &BPredConfig) -> Result<Self, ConfigError> {
        let pred = match cfg.kind.as_str() {
            "Oracle" => Self::Oracle(OraclePredictor::new(section, cfg)?),
            "NotTaken" => Self::NotTaken(NotTakenPredictor::new()),
            "Taken" => Self::Taken(TakenPredictor::new(section, cfg)?),
            "Static" => Self::Static(StaticPredictor::new(section, cfg)?),
            "2bit" => Self::Bimodal(Bimodal::new(section, cfg)?),
            "2level" => Self::TwoLevel(TwoLevel::new(section, cfg)?),
            "Hybrid" => Self::Hybrid(Hybrid::new(section, cfg)?),
            "2BcgSkew" => Self::GSkew(GSkew::new(section, cfg)?),
            "YAGS" => Self::Yags(Yags::new(section, cfg)?),
            "OGEHL" => Self::Ogehl(Ogehl::new(section, cfg)?),
            other => {
                return Err(ConfigError::UnknownType {
                    section: section.to_string(),
                    value: other.to_string(),
                })
            }
        };
        Ok(pred)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Oracle(_) => "Oracle",
            Self::NotTaken(_) => "NotTaken",
            Self::Taken(_) => "Taken",
            Self::Static(_) => "Static",
            Self::Bimodal(_) => "2bit",
            Self::TwoLevel(_) => "2level",
            Self::Hybrid(_) => "Hybrid",
            Self::GSkew(_) => "2BcgSkew",
            Self::Yags(_) => "YAGS",
            Self::Ogehl(_) => "OGEHL",
        }
    }

    /// Predict the given branch; when `update` is set, learn from the oracle.
    ///
    /// Implementations never touch hit/miss tallies here; the owner accounts
    /// for the verdict exactly once per call.
    pub fn predict(&mut self, br: &Branch, oracle: InstId, update: bool) -> Verdict {
        match self {
            Self::Oracle(p) => p.predict(br, oracle, update),
            Self::NotTaken(p) => p.predict(br, oracle, update),
            Self::Taken(p) => p.predict(br, oracle, update),
            Self::Static(p) => p.predict(br, oracle, update),
            Self::Bimodal(p) => p.predict(br, oracle, update),
            Self::TwoLevel(p) => p.predict(br, oracle, update),
            Self::Hybrid(p) => p.predict(br, oracle, update),
            Self::GSkew(p) => p.predict(br, oracle, update),
            Self::Yags(p) => p.predict(br, oracle, update),
            Self::Ogehl(p) => p.predict(br, oracle, update),
        }
    }

    /// Process-switch notification. Direction state survives the switch; the
    /// hooks exist so a variant may flush per-process state if it grows one.
    pub fn switch_in(&mut self, _pid: Pid) {}

    pub fn switch_out(&mut self, _pid: Pid) {}
}
