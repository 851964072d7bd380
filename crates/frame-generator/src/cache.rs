//! Run-scoped cache of layer generators.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use frame_common::{FrameResult, LayerConfig, RegionConfig};
use tracing::debug;

use crate::layers::LayerGenerator;

/// Cache key of a layer generator.
///
/// Gridded layers are keyed by layer id alone so their open dataset and
/// palettes carry across regions. Every other layer draws a fixed image for
/// one region and styling, so the key covers the region, the full layer
/// configuration and the unscaled panel size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerIdentity(String);

impl LayerIdentity {
    pub fn for_layer(
        layer: &LayerConfig,
        region: &RegionConfig,
        panel_size: (u32, u32),
    ) -> FrameResult<Self> {
        if layer.layer_type.is_gridded() {
            return Ok(Self(layer.id.clone()));
        }
        Ok(Self(format!(
            "{}_{}_{}x{}",
            region.id,
            layer.to_json()?,
            panel_size.0,
            panel_size.1
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hit and miss counts of a [`LayerGeneratorCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Layer generators by identity, kept for one run.
#[derive(Default)]
pub struct LayerGeneratorCache {
    entries: HashMap<LayerIdentity, LayerGenerator>,
    hits: u64,
    misses: u64,
}

impl LayerGeneratorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The generator for `identity`, created by `create` on first use.
    pub fn get_or_create(
        &mut self,
        identity: &LayerIdentity,
        create: impl FnOnce() -> LayerGenerator,
    ) -> &mut LayerGenerator {
        match self.entries.entry(identity.clone()) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                debug!(identity = %identity, "Creating layer generator");
                entry.insert(create())
            }
        }
    }

    pub fn get(&self, identity: &LayerIdentity) -> Option<&LayerGenerator> {
        self.entries.get(identity)
    }

    pub fn get_mut(&mut self, identity: &LayerIdentity) -> Option<&mut LayerGenerator> {
        self.entries.get_mut(identity)
    }

    /// Drop every generator and reset the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}
