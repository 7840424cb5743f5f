//! Sidebar panel state and submit-button tracking.

use crate::fragment::SidebarFragment;

/// Request to load a fragment into the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarRequest {
    Get { url: String },
    Post { url: String, fields: Vec<(String, String)> },
}

impl SidebarRequest {
    pub fn url(&self) -> &str {
        match self {
            Self::Get { url } | Self::Post { url, .. } => url,
        }
    }
}

/// Browser history change accompanying a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryUpdate {
    Push(String),
    Replace(String),
}

#[derive(Debug, Default)]
pub struct SidebarState {
    url: Option<String>,
    loading: bool,
    has_content: bool,
    fragment: SidebarFragment,
}

impl SidebarState {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty panel replaces the history entry instead of adding one.
    pub fn history_for(&self, url: &str) -> HistoryUpdate {
        if self.has_content {
            HistoryUpdate::Push(url.to_string())
        } else {
            HistoryUpdate::Replace(url.to_string())
        }
    }

    pub fn unload(&mut self) {
        self.loading = true;
        self.has_content = false;
        self.fragment = SidebarFragment::default();
    }

    pub fn request(&mut self, request: &SidebarRequest) {
        self.url = Some(request.url().to_string());
        self.loading = true;
    }

    pub fn loaded(&mut self, fragment: SidebarFragment) {
        self.loading = false;
        self.has_content = true;
        self.fragment = fragment;
    }

    /// A redirect response sits in the panel until the target loads, so the
    /// target is recorded as a new history entry.
    pub fn redirected(&mut self) {
        self.loading = false;
        self.has_content = true;
    }

    /// The error panel counts as content.
    pub fn failed(&mut self) {
        self.loading = false;
        self.has_content = true;
        self.fragment = SidebarFragment::default();
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn has_content(&self) -> bool {
        self.has_content
    }

    pub fn fragment(&self) -> &SidebarFragment {
        &self.fragment
    }
}

#[derive(Debug, Clone)]
struct CapturedButton {
    form: usize,
    name: Option<String>,
    value: String,
    at_ms: f64,
}

/// Remembers which submit button was clicked, since form serialization
/// leaves the activating button out.
#[derive(Debug)]
pub struct SubmitCapture {
    window_ms: f64,
    pending: Option<CapturedButton>,
}

impl SubmitCapture {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            pending: None,
        }
    }

    /// Records a click, replacing any earlier capture and restarting the window.
    pub fn capture(&mut self, form: usize, name: Option<String>, value: String, at_ms: f64) {
        self.pending = Some(CapturedButton {
            form,
            name,
            value,
            at_ms,
        });
    }

    /// Consumes the capture for a submission of `form` at `now_ms`.
    pub fn take(&mut self, form: usize, now_ms: f64) -> Option<(String, String)> {
        let button = self.pending.take()?;
        if button.form != form || now_ms - button.at_ms > self.window_ms {
            return None;
        }
        button.name.map(|name| (name, button.value))
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
