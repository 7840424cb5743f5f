//! Executes editor commands against the browser.
//!
//! Events are queued and handled one at a time. Leaflet and the DOM fire
//! some events synchronously while a command runs (a reverted toggle, a
//! programmatic link click); those land in the queue and are handled after
//! the current event instead of re-entering the editor.

use std::cell::{Cell, OnceCell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use mapedit_core::{
    Command, Editor, EditorConfig, Event, GeometryPayload, HistoryUpdate, SidebarRequest,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;

use crate::dom::{self, DomError, SidebarDom};
use crate::http;
use crate::map_host::{HostError, LeafletHost};

#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("sidebar unavailable: {0}")]
    Sidebar(#[from] DomError),
    #[error("map unavailable: {0}")]
    Map(#[from] HostError),
}

pub struct Runtime {
    editor: RefCell<Editor>,
    sidebar: OnceCell<SidebarDom>,
    host: RefCell<Option<LeafletHost>>,
    queue: RefCell<VecDeque<Event>>,
    draining: Cell<bool>,
}

/// Owning handle to the running editor.
#[derive(Clone)]
pub struct EditorHandle(Rc<Runtime>);

/// Non-owning handle given to DOM and map callbacks.
#[derive(Clone)]
pub struct Dispatcher(Weak<Runtime>);

impl Dispatcher {
    pub fn dispatch(&self, event: Event) {
        if let Some(runtime) = self.0.upgrade() {
            runtime.dispatch(event);
        }
    }
}

impl EditorHandle {
    pub fn dispatch(&self, event: Event) {
        self.0.dispatch(event);
    }

    pub fn warn_before_unload(&self) -> bool {
        self.0
            .editor
            .try_borrow()
            .is_ok_and(|editor| editor.warn_before_unload())
    }
}

/// Path and query of the page, the sidebar URL it stands for.
pub fn current_location() -> String {
    let location = gloo::utils::window().location();
    format!(
        "{}{}",
        location.pathname().unwrap_or_default(),
        location.search().unwrap_or_default()
    )
}

/// Binds the sidebar and the map and starts the editor.
pub fn boot(config: &EditorConfig) -> Result<EditorHandle, BootError> {
    let runtime = Rc::new(Runtime {
        editor: RefCell::new(Editor::new(config.clone())),
        sidebar: OnceCell::new(),
        host: RefCell::new(None),
        queue: RefCell::new(VecDeque::new()),
        draining: Cell::new(false),
    });
    let dispatcher = runtime.dispatcher();

    let sidebar = SidebarDom::new(&gloo::utils::document(), &dispatcher)?;
    let _ = runtime.sidebar.set(sidebar);
    let host = LeafletHost::new(&config.map, &dispatcher)?;
    *runtime.host.borrow_mut() = Some(host);

    runtime.dispatch(Event::Start {
        location: current_location(),
    });
    Ok(EditorHandle(runtime))
}

impl Runtime {
    fn dispatcher(self: &Rc<Self>) -> Dispatcher {
        Dispatcher(Rc::downgrade(self))
    }

    fn dispatch(self: &Rc<Self>, event: Event) {
        self.queue.borrow_mut().push_back(event);
        self.drain();
    }

    fn drain(self: &Rc<Self>) {
        if self.draining.replace(true) {
            return;
        }
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            let commands = self.editor.borrow_mut().handle(event);
            for command in commands {
                self.execute(command);
            }
        }
        self.draining.set(false);
    }

    fn execute(self: &Rc<Self>, command: Command) {
        match command {
            Command::FetchLevels { url } => self.fetch_json(url, Event::LevelsLoaded),
            Command::FetchSources { url } => self.fetch_json(url, Event::SourcesLoaded),
            Command::FetchGeometryTypes { url } => self.fetch_json(url, Event::GeometryTypesLoaded),
            Command::FetchGeometryStyles { url } => self.fetch_json(url, Event::GeometryStylesLoaded),
            Command::FetchGeometries { url, query } => {
                let dispatcher = self.dispatcher();
                spawn_local(async move {
                    let result = match http::with_query(&url, &query) {
                        Ok(url) => http::get_json::<GeometryPayload>(&url).await,
                        Err(err) => Err(err),
                    };
                    match result {
                        Ok(payload) => dispatcher.dispatch(Event::GeometriesLoaded(payload.into_features())),
                        Err(err) => {
                            warn!("loading geometries failed: {err}");
                            dispatcher.dispatch(Event::GeometriesFailed);
                        }
                    }
                });
            }
            Command::FetchSidebar(request) => self.fetch_sidebar(request),

            Command::UpdateHistory(update) => update_history(&update),
            Command::UnloadSidebar => self.with_sidebar(SidebarDom::unload),
            Command::RenderSidebar { html } => self.with_sidebar(|sidebar| sidebar.render(&html)),
            Command::RenderSidebarError {
                status,
                status_text,
            } => self.with_sidebar(|sidebar| {
                if let Err(err) = sidebar.render_error(status, &status_text) {
                    warn!("failed to render sidebar error: {err}");
                }
            }),
            Command::ScrollRowIntoView(key) => self.with_sidebar(|sidebar| sidebar.scroll_row_into_view(&key)),
            Command::ActivateEditLink(key) => self.with_sidebar(|sidebar| sidebar.activate_edit_link(&key)),
            Command::SetGeometryField(json) => self.with_sidebar(|sidebar| sidebar.set_geometry_field(&json)),
            Command::SetCreationLock(locked) => self.with_sidebar(|sidebar| sidebar.set_creation_lock(locked)),
            Command::SelectLevelFields(level) => self.with_sidebar(|sidebar| sidebar.select_level(&level)),
            Command::FocusNameField => self.with_sidebar(SidebarDom::focus_name),

            Command::ClearHighlight => {
                self.with_sidebar(SidebarDom::clear_highlight);
                self.apply_map(Command::ClearHighlight);
            }
            Command::Highlight { row, feature, style } => {
                self.with_sidebar(|sidebar| sidebar.highlight_row(&row));
                self.apply_map(Command::Highlight { row, feature, style });
            }

            // The layers control is still handling the click that caused
            // these; touching its layers now would leave its inputs stale.
            command @ (Command::SwapLevelToggle { .. } | Command::SetTypeToggle { .. }) => {
                self.apply_map_later(command);
            }

            command => self.apply_map(command),
        }
    }

    fn with_sidebar(&self, f: impl FnOnce(&SidebarDom)) {
        if let Some(sidebar) = self.sidebar.get() {
            f(sidebar);
        }
    }

    fn apply_map(&self, command: Command) {
        let mut host = self.host.borrow_mut();
        let Some(host) = host.as_mut() else {
            debug!("map not ready, dropping {command:?}");
            return;
        };
        if let Err(err) = host.apply(command) {
            warn!("map command failed: {err}");
        }
    }

    fn apply_map_later(self: &Rc<Self>, command: Command) {
        let runtime = Rc::downgrade(self);
        spawn_local(async move {
            let Some(runtime) = runtime.upgrade() else {
                return;
            };
            let outer = runtime.draining.replace(true);
            runtime.apply_map(command);
            if !outer {
                runtime.draining.set(false);
                runtime.drain();
            }
        });
    }

    fn fetch_json<T, F>(self: &Rc<Self>, url: String, loaded: F)
    where
        T: DeserializeOwned + 'static,
        F: FnOnce(T) -> Event + 'static,
    {
        let dispatcher = self.dispatcher();
        spawn_local(async move {
            match http::get_json::<T>(&url).await {
                Ok(value) => dispatcher.dispatch(loaded(value)),
                Err(err) => warn!("loading {url} failed: {err}"),
            }
        });
    }

    fn fetch_sidebar(self: &Rc<Self>, request: SidebarRequest) {
        let dispatcher = self.dispatcher();
        spawn_local(async move {
            let result = match &request {
                SidebarRequest::Get { url } => http::get_fragment(url).await,
                SidebarRequest::Post { url, fields } => http::post_form(url, fields).await,
            };
            let event = match result {
                Ok(html) => match dom::fragment_from_html(&html) {
                    Ok(fragment) => Event::SidebarLoaded { html, fragment },
                    Err(err) => {
                        warn!("unreadable sidebar fragment from {}: {err}", request.url());
                        Event::SidebarFailed {
                            status: 0,
                            status_text: err.to_string(),
                        }
                    }
                },
                Err(err) => {
                    let (status, status_text) = err.status();
                    Event::SidebarFailed {
                        status,
                        status_text,
                    }
                }
            };
            dispatcher.dispatch(event);
        });
    }
}

fn update_history(update: &HistoryUpdate) {
    let Ok(history) = gloo::utils::window().history() else {
        return;
    };
    let result = match update {
        HistoryUpdate::Push(url) => history.push_state_with_url(&JsValue::NULL, "", Some(url)),
        HistoryUpdate::Replace(url) => history.replace_state_with_url(&JsValue::NULL, "", Some(url)),
    };
    if let Err(err) = result {
        warn!("history update failed: {err:?}");
    }
}
