//! Lookup tables for rendered geometry layers.

use std::collections::HashMap;
use std::fmt;

use crate::geojson::Feature;

/// Composite `(type, name)` key of a map item. Displays as `type-name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureKey {
    pub kind: String,
    pub name: String,
}

impl FeatureKey {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.name)
    }
}

/// Handle of one rendered feature layer, unique for the page session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

/// Features of the currently displayed geometry set.
#[derive(Debug, Default)]
pub struct GeometryIndex {
    layers: HashMap<LayerId, Feature>,
    features: HashMap<FeatureKey, LayerId>,
    shadows: HashMap<FeatureKey, LayerId>,
}

impl GeometryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.features.clear();
        self.shadows.clear();
    }

    /// Registers a rendered feature under its regular or shadow key.
    pub fn insert(&mut self, id: LayerId, feature: Feature) {
        if let Some(key) = feature.shadow_of() {
            self.shadows.insert(key, id);
        } else if let Some(key) = feature.key() {
            if let Some(previous) = self.features.insert(key.clone(), id) {
                tracing::warn!("duplicate feature key {key}, replacing layer {previous:?}");
            }
        } else if feature.is_shadow() {
            tracing::warn!("shadow feature without original type/name");
        }
        self.layers.insert(id, feature);
    }

    pub fn feature_layer(&self, key: &FeatureKey) -> Option<LayerId> {
        self.features.get(key).copied()
    }

    pub fn shadow_layer(&self, key: &FeatureKey) -> Option<LayerId> {
        self.shadows.get(key).copied()
    }

    pub fn layer(&self, id: LayerId) -> Option<&Feature> {
        self.layers.get(&id)
    }

    /// The regular feature registered under `key`.
    pub fn feature(&self, key: &FeatureKey) -> Option<&Feature> {
        self.feature_layer(key).and_then(|id| self.layer(id))
    }

    /// Forgets a layer that was taken off the display.
    pub fn remove(&mut self, id: LayerId) -> Option<Feature> {
        let feature = self.layers.remove(&id)?;
        self.features.retain(|_, layer| *layer != id);
        self.shadows.retain(|_, layer| *layer != id);
        Some(feature)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
