//! A generic set-associative cache with LRU replacement.
//!
//! The branch-target buffer instantiates this with an instruction id as the
//! line payload; the geometry is the usual (size, line size, associativity)
//! triple with every dimension a power of two.

use crate::config::ConfigError;

/// Geometry for a [SetAssocCache].
#[derive(Clone, Copy, Debug)]
pub struct CacheConfig {
    /// Total number of lines.
    pub size: usize,
    /// Addresses per line (collapses low key bits).
    pub line_size: usize,
    /// Ways per set.
    pub assoc: usize,
}

impl CacheConfig {
    /// Validate the geometry, reporting failures against `section`.
    pub fn validate(&self, section: &str) -> Result<(), ConfigError> {
        for (key, value) in [
            ("BTBSize", self.size),
            ("BTBBsize", self.line_size),
            ("BTBAssoc", self.assoc),
        ] {
            if value == 0 || !value.is_power_of_two() {
                return Err(ConfigError::NotPowerOfTwo {
                    section: section.to_string(),
                    key,
                    value,
                });
            }
        }
        if self.assoc > self.size {
            return Err(ConfigError::Invalid {
                section: section.to_string(),
                key: "BTBAssoc",
                msg: format!("associativity {} exceeds {} lines", self.assoc, self.size),
            });
        }
        Ok(())
    }

    pub fn sets(&self) -> usize {
        self.size / self.assoc
    }
}

#[derive(Clone, Debug)]
struct Line<V> {
    tag: u64,
    valid: bool,
    stamp: u64,
    value: V,
}

/// A set-associative cache of `V` keyed by `u64`, LRU-replaced.
#[derive(Debug)]
pub struct SetAssocCache<V> {
    cfg: CacheConfig,
    line_shift: u32,
    set_mask: u64,
    lines: Vec<Line<V>>,
    stamp: u64,
}

impl<V: Clone + Default> SetAssocCache<V> {
    pub fn new(cfg: CacheConfig) -> Self {
        let line = Line {
            tag: 0,
            valid: false,
            stamp: 0,
            value: V::default(),
        };
        Self {
            line_shift: cfg.line_size.ilog2(),
            set_mask: (cfg.sets() - 1) as u64,
            lines: vec![line; cfg.size],
            stamp: 0,
            cfg,
        }
    }

    fn set_base(&self, key: u64) -> usize {
        let set = ((key >> self.line_shift) & self.set_mask) as usize;
        set * self.cfg.assoc
    }

    fn tag_of(&self, key: u64) -> u64 {
        (key >> self.line_shift) >> self.set_mask.count_ones()
    }

    /// Look up `key`; `touch` refreshes the LRU stamp on a hit.
    pub fn find(&mut self, key: u64, touch: bool) -> Option<&mut V> {
        let base = self.set_base(key);
        let tag = self.tag_of(key);
        self.stamp += 1;
        let stamp = self.stamp;
        let ways = &mut self.lines[base..base + self.cfg.assoc];
        ways.iter_mut()
            .find(|l| l.valid && l.tag == tag)
            .map(|l| {
                if touch {
                    l.stamp = stamp;
                }
                &mut l.value
            })
    }

    /// Look up `key` without disturbing replacement state.
    pub fn probe(&self, key: u64) -> Option<&V> {
        let base = self.set_base(key);
        let tag = self.tag_of(key);
        self.lines[base..base + self.cfg.assoc]
            .iter()
            .find(|l| l.valid && l.tag == tag)
            .map(|l| &l.value)
    }

    /// Return the line for `key`, allocating over the LRU victim on a miss.
    /// A freshly allocated line carries `V::default()`.
    pub fn fill(&mut self, key: u64) -> &mut V {
        let base = self.set_base(key);
        let tag = self.tag_of(key);
        self.stamp += 1;
        let stamp = self.stamp;
        let ways = &mut self.lines[base..base + self.cfg.assoc];

        let way = match ways.iter().position(|l| l.valid && l.tag == tag) {
            Some(w) => w,
            None => {
                // Prefer an invalid way; otherwise evict the oldest stamp.
                let w = ways
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, l)| (l.valid, l.stamp))
                    .map(|(i, _)| i)
                    .unwrap();
                ways[w].valid = true;
                ways[w].tag = tag;
                ways[w].value = V::default();
                w
            }
        };
        ways[way].stamp = stamp;
        &mut ways[way].value
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        for line in self.lines.iter_mut() {
            line.valid = false;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cache(size: usize, assoc: usize) -> SetAssocCache<u64> {
        SetAssocCache::new(CacheConfig { size, line_size: 1, assoc })
    }

    #[test]
    fn fill_then_find() {
        let mut c = cache(8, 2);
        *c.fill(0x100) = 0xdead;
        assert_eq!(c.find(0x100, true).copied(), Some(0xdead));
        assert_eq!(c.probe(0x104), None);
    }

    #[test]
    fn lru_evicts_oldest_way() {
        // 2 sets x 2 ways; keys 0, 2, 4 all land in set 0.
        let mut c = cache(4, 2);
        *c.fill(0) = 1;
        *c.fill(2) = 2;
        // Touch key 0 so key 2 becomes the victim.
        c.find(0, true);
        *c.fill(4) = 3;
        assert_eq!(c.probe(0).copied(), Some(1));
        assert_eq!(c.probe(2), None);
        assert_eq!(c.probe(4).copied(), Some(3));
    }

    #[test]
    fn geometry_validation() {
        let bad = CacheConfig { size: 48, line_size: 1, assoc: 2 };
        assert!(bad.validate("test").is_err());
        let good = CacheConfig { size: 64, line_size: 1, assoc: 4 };
        assert!(good.validate("test").is_ok());
    }
}
