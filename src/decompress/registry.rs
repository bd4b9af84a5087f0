//! Capability registry mapping `(from, to)` codec pairs to decompressor
//! constructors.
//!
//! Selection walks priorities from lowest upward; when a constructor fails,
//! the next priority is probed. Magic numbers identify entries for logging
//! and targeted instantiation.

use super::passthrough::PassthroughDecompressor;
use super::Decompressor;
use crate::video::Codec;

/// Constructor; `None` means this decoder is unavailable in the current
/// environment and the next candidate should be tried.
pub type DecompressorFactory = fn() -> Option<Box<dyn Decompressor>>;

#[derive(Clone)]
pub struct DecompressEntry {
    pub from: Codec,
    pub to: Codec,
    pub priority: u32,
    pub magic: u32,
    pub name: &'static str,
    pub factory: DecompressorFactory,
}

pub struct DecompressRegistry {
    entries: Vec<DecompressEntry>,
}

fn passthrough_factory() -> Option<Box<dyn Decompressor>> {
    Some(Box::new(PassthroughDecompressor::new()))
}

const PASSTHROUGH_MAGIC: u32 = u32::from_be_bytes(*b"PASS");

impl DecompressRegistry {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registry with the built-in passthrough entries for opaque codecs a
    /// display may take natively.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for codec in [Codec::Dxt1, Codec::Dxt1Yuv, Codec::Dxt5, Codec::Jpeg, Codec::H264] {
            registry.register(DecompressEntry {
                from: codec,
                to: codec,
                priority: 500,
                magic: PASSTHROUGH_MAGIC,
                name: "passthrough",
                factory: passthrough_factory,
            });
        }
        registry
    }

    pub fn register(&mut self, entry: DecompressEntry) {
        self.entries.push(entry);
    }

    /// Best (lowest-priority) available entry for a conversion within the
    /// given priority band.
    pub fn find_best(
        &self,
        from: Codec,
        to: Codec,
        prio_min: u32,
        prio_max: u32,
    ) -> Option<&DecompressEntry> {
        self.entries
            .iter()
            .filter(|e| {
                e.from == from && e.to == to && e.priority >= prio_min && e.priority <= prio_max
            })
            .min_by_key(|e| e.priority)
    }

    /// Instantiate one decoder per tile, walking priorities upward until a
    /// constructor succeeds for all tiles.
    pub fn instantiate(
        &self,
        from: Codec,
        to: Codec,
        tile_count: usize,
    ) -> Option<(Vec<Box<dyn Decompressor>>, &DecompressEntry)> {
        let mut prio_min = 0;
        loop {
            let entry = self.find_best(from, to, prio_min, u32::MAX)?;
            let instances: Vec<_> = (0..tile_count).filter_map(|_| (entry.factory)()).collect();
            if instances.len() == tile_count {
                return Some((instances, entry));
            }
            // constructor failed, try the next priority band
            prio_min = entry.priority + 1;
        }
    }
}

impl Default for DecompressRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn unavailable() -> Option<Box<dyn Decompressor>> {
        None
    }

    #[test]
    fn builtin_passthrough_is_found() {
        let registry = DecompressRegistry::with_builtins();
        let entry = registry.find_best(Codec::Dxt1, Codec::Dxt1, 0, u32::MAX).unwrap();
        assert_eq!(entry.name, "passthrough");
        assert!(registry.find_best(Codec::Dxt1, Codec::Uyvy, 0, u32::MAX).is_none());
    }

    #[test]
    fn lowest_priority_wins() {
        let mut registry = DecompressRegistry::with_builtins();
        registry.register(DecompressEntry {
            from: Codec::Dxt1,
            to: Codec::Dxt1,
            priority: 10,
            magic: 0xBEEF,
            name: "preferred",
            factory: super::passthrough_factory,
        });
        let entry = registry.find_best(Codec::Dxt1, Codec::Dxt1, 0, u32::MAX).unwrap();
        assert_eq!(entry.name, "preferred");
    }

    #[test]
    fn failed_constructor_falls_back_to_next_priority() {
        let mut registry = DecompressRegistry::with_builtins();
        registry.register(DecompressEntry {
            from: Codec::Dxt1,
            to: Codec::Dxt1,
            priority: 10,
            magic: 0xDEAD,
            name: "broken",
            factory: unavailable,
        });
        let (instances, entry) = registry.instantiate(Codec::Dxt1, Codec::Dxt1, 2).unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(entry.name, "passthrough");
    }

    #[test]
    fn unknown_conversion_yields_none() {
        let registry = DecompressRegistry::with_builtins();
        assert!(registry.instantiate(Codec::Jpeg, Codec::Rgba, 1).is_none());
    }
}
