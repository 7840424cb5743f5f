//! Level and geometry-type toggles.

use crate::api::{GeometryType, Level};

/// Known levels ordered by altitude, highest first, plus the current one.
#[derive(Debug, Default)]
pub struct LevelSet {
    levels: Vec<Level>,
    current: Option<String>,
}

impl LevelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the level list. The lowest level becomes current unless
    /// the current one is still present.
    pub fn load(&mut self, mut levels: Vec<Level>) {
        levels.sort_by(|a, b| b.altitude.total_cmp(&a.altitude));
        let keep = self
            .current
            .as_ref()
            .is_some_and(|current| levels.iter().any(|level| &level.name == current));
        if !keep {
            self.current = levels.last().map(|level| level.name.clone());
        }
        self.levels = levels;
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.levels.iter().any(|level| level.name == name)
    }

    /// Makes `name` current and returns the previous level.
    pub fn select(&mut self, name: &str) -> Option<String> {
        self.current.replace(name.to_string())
    }
}

#[derive(Debug, Clone)]
struct TypeToggle {
    kind: GeometryType,
    visible: bool,
}

/// Geometry types in registration order with their visibility.
#[derive(Debug, Default)]
pub struct TypeSet {
    toggles: Vec<TypeToggle>,
    loaded: bool,
}

impl TypeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the type list; every type starts visible.
    pub fn load(&mut self, types: Vec<GeometryType>) {
        self.toggles = types
            .into_iter()
            .map(|kind| TypeToggle {
                kind,
                visible: true,
            })
            .collect();
        self.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn types(&self) -> impl Iterator<Item = (&GeometryType, bool)> {
        self.toggles.iter().map(|toggle| (&toggle.kind, toggle.visible))
    }

    pub fn is_visible(&self, name: &str) -> Option<bool> {
        self.toggles
            .iter()
            .find(|toggle| toggle.kind.name == name)
            .map(|toggle| toggle.visible)
    }

    /// Sets visibility and returns the previous value, `None` for unknown types.
    pub fn set_visible(&mut self, name: &str, visible: bool) -> Option<bool> {
        let toggle = self.toggles.iter_mut().find(|toggle| toggle.kind.name == name)?;
        Some(std::mem::replace(&mut toggle.visible, visible))
    }

    pub fn visible(&self) -> impl Iterator<Item = &str> {
        self.toggles
            .iter()
            .filter(|toggle| toggle.visible)
            .map(|toggle| toggle.kind.name.as_str())
    }

    /// True when types are known and none of them is shown.
    pub fn all_hidden(&self) -> bool {
        self.loaded && self.visible().next().is_none()
    }
}
