//! Section-scoped predictor configuration.
//!
//! A configuration document is a TOML file whose top-level tables are named
//! sections; each section deserializes into a [BPredConfig]. Every option has
//! a default, so a section only spells out what it changes. Validation is
//! deferred to the component builders so failures can name the section and
//! the offending key.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// A fatal construction-time configuration failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("[{section}] unknown predictor type `{value}`")]
    UnknownType { section: String, value: String },

    #[error("[{section}] {key} must be a nonzero power of two (got {value})")]
    NotPowerOfTwo {
        section: String,
        key: &'static str,
        value: usize,
    },

    #[error("[{section}] {key}: {msg}")]
    Invalid {
        section: String,
        key: &'static str,
        msg: String,
    },
}

/// Options recognized in one predictor section.
///
/// Key spellings follow the simulator's configuration files rather than Rust
/// convention; serde renames bridge the two.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BPredConfig {
    /// Predictor variant selector.
    #[serde(rename = "type")]
    pub kind: String,

    // Target-buffer geometry.
    #[serde(rename = "BTBSize")]
    pub btb_size: usize,
    #[serde(rename = "BTBBsize")]
    pub btb_bsize: usize,
    #[serde(rename = "BTBAssoc")]
    pub btb_assoc: usize,

    // Return stack.
    #[serde(rename = "RasSize")]
    pub ras_size: usize,
    /// When true (the hardware-faithful default) the stack mutates on every
    /// call/return it sees, updating run or not.
    #[serde(rename = "RasSpeculative")]
    pub ras_speculative: bool,

    // Per-cycle prediction bandwidth. Zero means unlimited.
    #[serde(rename = "bpred4Cycle")]
    pub bpred_4_cycle: usize,
    #[serde(rename = "bpred4CycleAddrShift")]
    pub bpred_4_cycle_addr_shift: u32,

    // Common table geometry.
    pub size: usize,
    pub bits: u32,

    // Two-level (PAg).
    pub l1size: usize,
    pub l2size: usize,
    #[serde(rename = "historySize")]
    pub history_size: u32,

    // 2Bc-gskew.
    #[serde(rename = "BIMSize")]
    pub bim_size: usize,
    #[serde(rename = "BIMBits")]
    pub bim_bits: u32,
    #[serde(rename = "G0Size")]
    pub g0_size: usize,
    #[serde(rename = "G0HistSize")]
    pub g0_hist_size: u32,
    #[serde(rename = "G1Size")]
    pub g1_size: usize,
    #[serde(rename = "G1HistSize")]
    pub g1_hist_size: u32,
    #[serde(rename = "MetaSize")]
    pub meta_size: usize,
    #[serde(rename = "MetaHistSize")]
    pub meta_hist_size: u32,

    // YAGS exception caches.
    pub ctsize: usize,
    pub ctbits: u32,
    pub cttagsize: u32,

    // O-GEHL.
    pub mtables: usize,
    pub glength: usize,
    pub nentry: usize,
    pub addwidth: u32,
    pub tsize: usize,

    /// Keep the per-branch diagnostic profile (reported on switch-out).
    pub profile: bool,
}

impl Default for BPredConfig {
    fn default() -> Self {
        Self {
            kind: "2bit".to_string(),
            btb_size: 2048,
            btb_bsize: 1,
            btb_assoc: 2,
            ras_size: 32,
            ras_speculative: true,
            bpred_4_cycle: 0,
            bpred_4_cycle_addr_shift: 0,
            size: 4096,
            bits: 2,
            l1size: 256,
            l2size: 2048,
            history_size: 11,
            bim_size: 2048,
            bim_bits: 2,
            g0_size: 2048,
            g0_hist_size: 9,
            g1_size: 2048,
            g1_hist_size: 13,
            meta_size: 2048,
            meta_hist_size: 11,
            ctsize: 1024,
            ctbits: 2,
            cttagsize: 6,
            mtables: 8,
            glength: 128,
            nentry: 3,
            addwidth: 8,
            tsize: 1024,
            profile: true,
        }
    }
}

impl BPredConfig {
    /// Check that `value` is a usable power-of-two table size.
    pub(crate) fn power_of_two(
        section: &str,
        key: &'static str,
        value: usize,
    ) -> Result<(), ConfigError> {
        if value == 0 || !value.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                section: section.to_string(),
                key,
                value,
            });
        }
        Ok(())
    }

    /// Check a saturating-counter width. The table code stores counters in a
    /// byte, so widths above 7 bits are rejected up front.
    pub(crate) fn counter_bits(
        section: &str,
        key: &'static str,
        value: u32,
    ) -> Result<(), ConfigError> {
        if value == 0 || value > 7 {
            return Err(ConfigError::Invalid {
                section: section.to_string(),
                key,
                msg: format!("counter width {} outside 1..=7", value),
            });
        }
        Ok(())
    }

    /// Check a history length against the `u64` history word.
    pub(crate) fn history_bits(
        section: &str,
        key: &'static str,
        value: u32,
    ) -> Result<(), ConfigError> {
        if value == 0 || value > 63 {
            return Err(ConfigError::Invalid {
                section: section.to_string(),
                key,
                msg: format!("history length {} outside 1..=63", value),
            });
        }
        Ok(())
    }
}

/// Parse a TOML document of named predictor sections.
pub fn load_sections(text: &str) -> Result<BTreeMap<String, BPredConfig>, toml::de::Error> {
    toml::from_str(text)
}
