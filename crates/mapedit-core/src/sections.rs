//! Section control: sidebar-provided links to switch the edited section.

use crate::fragment::Section;

/// Everything the client needs to draw the control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionView {
    pub sections: Vec<Section>,
    pub visible: bool,
    pub enabled: bool,
    pub expanded: bool,
}

/// Outcome of clicking a section link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionClick {
    Expanded,
    Navigate(String),
    Ignored,
}

#[derive(Debug, Default)]
pub struct SectionControl {
    view: SectionView,
}

impl SectionControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &SectionView {
        &self.view
    }

    /// Rebuilds the control from a freshly loaded fragment.
    pub fn load(&mut self, sections: Vec<Section>) {
        self.view.visible = !sections.is_empty();
        self.view.enabled = sections.len() > 1;
        self.view.expanded = false;
        self.view.sections = sections;
    }

    pub fn disable(&mut self) {
        self.view.enabled = false;
        self.view.expanded = false;
    }

    pub fn hide(&mut self) {
        self.view.visible = false;
    }

    /// Returns whether the view changed.
    pub fn expand(&mut self) -> bool {
        if !self.view.enabled || self.view.expanded {
            return false;
        }
        self.view.expanded = true;
        true
    }

    pub fn collapse(&mut self) -> bool {
        std::mem::replace(&mut self.view.expanded, false)
    }

    pub fn click(&mut self, index: usize) -> SectionClick {
        if index >= self.view.sections.len() {
            return SectionClick::Ignored;
        }
        if !self.view.expanded {
            return if self.expand() {
                SectionClick::Expanded
            } else {
                SectionClick::Ignored
            };
        }
        if !self.view.enabled {
            return SectionClick::Ignored;
        }
        for (i, section) in self.view.sections.iter_mut().enumerate() {
            section.current = i == index;
        }
        self.view.expanded = false;
        SectionClick::Navigate(self.view.sections[index].href.clone())
    }
}
