//! Sidebar DOM access.
//!
//! Everything the editor needs from the sidebar markup goes through
//! [`SidebarDom`]: delegated event listeners, marker extraction from loaded
//! fragments, and the handful of class/value updates commands ask for.

use gloo::events::{EventListener, EventListenerOptions};
use mapedit_core::{
    Event, FeatureKey, FormSubmission, GeometryForm, ItemRow, Section, SidebarFragment,
};
use tracing::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, DomParser, Element, FormData, HtmlElement, HtmlFormElement, HtmlInputElement,
    HtmlOptionElement, HtmlSelectElement, MouseEvent, SupportedType,
};

use crate::runtime::Dispatcher;

const SIDEBAR_ID: &str = "sidebar";
const CONTENT_SELECTOR: &str = ".content";
const ROW_SELECTOR: &str = ".itemtable[data-mapitem-type] tr[data-name]";
const TABLE_SELECTOR: &str = ".itemtable[data-mapitem-type]";
const HIGHLIGHT_CLASS: &str = "highlight";
const LOADING_CLASS: &str = "loading";
const CREATION_LOCK_CLASS: &str = "creation-lock";

#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("missing element: {0}")]
    Missing(&'static str),
    #[error("DOM error: {0}")]
    Js(String),
}

impl From<JsValue> for DomError {
    fn from(value: JsValue) -> Self {
        Self::Js(format!("{value:?}"))
    }
}

/// Milliseconds since page load, the clock used for submit-button capture.
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|window| window.performance())
        .map_or(0.0, |performance| performance.now())
}

fn event_element(event: &web_sys::Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

fn closest(element: &Element, selector: &str) -> Option<Element> {
    element.closest(selector).ok().flatten()
}

fn query_all(root: &Element, selector: &str) -> Result<Vec<Element>, DomError> {
    let nodes = root.query_selector_all(selector)?;
    Ok((0..nodes.length())
        .filter_map(|i| nodes.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect())
}

fn row_key(row: &Element) -> Option<FeatureKey> {
    let table = closest(row, TABLE_SELECTOR)?;
    let kind = table.get_attribute("data-mapitem-type")?;
    let name = row.get_attribute("data-name")?;
    Some(FeatureKey::new(kind, name))
}

/// Whether the pointer moved between two elements of the same row.
fn within_row(event: &MouseEvent, row: &Element) -> bool {
    event
        .related_target()
        .and_then(|target| target.dyn_into::<Element>().ok())
        .and_then(|element| closest(&element, ROW_SELECTOR))
        .is_some_and(|other| other == *row)
}

/// Serializes successful controls the way a browser submission would,
/// leaving out file inputs and the submit button.
pub fn serialize_form(form: &HtmlFormElement) -> Result<Vec<(String, String)>, DomError> {
    let data = FormData::new_with_form(form)?;
    let mut fields = Vec::new();
    let Some(entries) = js_sys::try_iter(&data)? else {
        return Ok(fields);
    };
    for entry in entries {
        let entry: js_sys::Array = entry?.unchecked_into();
        let (Some(name), Some(value)) = (entry.get(0).as_string(), entry.get(1).as_string()) else {
            continue;
        };
        fields.push((name, value));
    }
    Ok(fields)
}

fn form_submission(form: &HtmlFormElement) -> Result<FormSubmission, DomError> {
    Ok(FormSubmission {
        action: form.action(),
        fields: serialize_form(form)?,
    })
}

/// Reads the editor markers out of a sidebar fragment.
pub fn extract_fragment(root: &Element) -> Result<SidebarFragment, DomError> {
    let redirect = root
        .query_selector("span[data-redirect]")?
        .and_then(|span| span.get_attribute("data-redirect"));

    let redirect_form = match root.query_selector("form[name=redirect]")? {
        Some(form) => Some(form_submission(form.unchecked_ref())?),
        None => None,
    };

    let geometry_form = root
        .query_selector("input[name=geometry]")?
        .and_then(|input| {
            let form = closest(&input, "form")?;
            let Some(mapitem_type) = form.get_attribute("data-mapitem-type") else {
                debug!("geometry field outside of a map item form");
                return None;
            };
            Some(GeometryForm {
                mapitem_type,
                name: form.get_attribute("data-name"),
                geomtype: form.get_attribute("data-geomtype"),
                value: input.unchecked_into::<HtmlInputElement>().value(),
            })
        });

    let level_switch = root
        .query_selector("[data-level-switch]")?
        .and_then(|element| element.get_attribute("data-level-switch"));

    let sections = query_all(root, "[data-sections] a")?
        .into_iter()
        .map(|link| Section {
            title: link.text_content().unwrap_or_default().trim().to_string(),
            href: link.get_attribute("href").unwrap_or_default(),
            current: link.class_list().contains("current"),
        })
        .collect();

    let mut rows = Vec::new();
    for row in query_all(root, ROW_SELECTOR)? {
        let Some(key) = row_key(&row) else {
            continue;
        };
        let editable = row.query_selector("td:last-child a")?.is_some();
        rows.push(ItemRow { key, editable });
    }

    Ok(SidebarFragment {
        redirect,
        redirect_form,
        geometry_form,
        level_switch,
        sections,
        rows,
        warn_before_unload: root.query_selector("[data-onbeforeunload]")?.is_some(),
    })
}

/// Parses `html` without attaching it to the page and extracts its markers.
pub fn fragment_from_html(html: &str) -> Result<SidebarFragment, DomError> {
    let document = DomParser::new()?.parse_from_string(html, SupportedType::TextHtml)?;
    let body = document.body().ok_or(DomError::Missing("body"))?;
    extract_fragment(&body)
}

/// The `#sidebar` panel and its `.content` container.
pub struct SidebarDom {
    sidebar: Element,
    content: Element,
    _listeners: Vec<EventListener>,
}

impl SidebarDom {
    pub fn new(document: &Document, dispatcher: &Dispatcher) -> Result<Self, DomError> {
        let sidebar = document
            .get_element_by_id(SIDEBAR_ID)
            .ok_or(DomError::Missing("#sidebar"))?;
        let content = sidebar
            .query_selector(CONTENT_SELECTOR)?
            .ok_or(DomError::Missing("#sidebar .content"))?;
        let listeners = Self::listen(&content, dispatcher);
        Ok(Self {
            sidebar,
            content,
            _listeners: listeners,
        })
    }

    fn listen(content: &Element, dispatcher: &Dispatcher) -> Vec<EventListener> {
        let options = EventListenerOptions::enable_prevent_default();

        let click = {
            let dispatcher = dispatcher.clone();
            let forms = content.clone();
            EventListener::new_with_options(content, "click", options, move |event| {
                let Some(target) = event_element(event) else {
                    return;
                };
                if let Some(link) = closest(&target, "a[href]") {
                    event.prevent_default();
                    if let Some(href) = link.get_attribute("href") {
                        dispatcher.dispatch(Event::Navigate(href));
                    }
                    return;
                }
                let Some(button) = closest(&target, "button[type=submit]") else {
                    return;
                };
                let Some(form) = closest(&button, "form") else {
                    return;
                };
                dispatcher.dispatch(Event::SubmitButtonClicked {
                    form: form_index(&forms, &form),
                    name: button.get_attribute("name"),
                    value: button.get_attribute("value").unwrap_or_default(),
                    at_ms: now_ms(),
                });
            })
        };

        let submit = {
            let dispatcher = dispatcher.clone();
            let forms = content.clone();
            EventListener::new_with_options(content, "submit", options, move |event| {
                event.prevent_default();
                let Some(form) = event_element(event) else {
                    return;
                };
                let index = form_index(&forms, &form);
                match form_submission(form.unchecked_ref()) {
                    Ok(submission) => dispatcher.dispatch(Event::FormSubmitted {
                        form: index,
                        submission,
                        at_ms: now_ms(),
                    }),
                    Err(err) => warn!("failed to serialize form: {err}"),
                }
            })
        };

        let over = {
            let dispatcher = dispatcher.clone();
            EventListener::new(content, "mouseover", move |event| {
                let Some(row) = event_element(event).and_then(|target| closest(&target, ROW_SELECTOR)) else {
                    return;
                };
                if within_row(event.unchecked_ref(), &row) {
                    return;
                }
                if let Some(key) = row_key(&row) {
                    dispatcher.dispatch(Event::RowHovered(key));
                }
            })
        };

        let out = {
            let dispatcher = dispatcher.clone();
            EventListener::new(content, "mouseout", move |event| {
                let Some(row) = event_element(event).and_then(|target| closest(&target, ROW_SELECTOR)) else {
                    return;
                };
                if !within_row(event.unchecked_ref(), &row) {
                    dispatcher.dispatch(Event::RowLeft);
                }
            })
        };

        vec![click, submit, over, out]
    }

    pub fn unload(&self) {
        let _ = self.sidebar.class_list().add_1(LOADING_CLASS);
        self.content.set_inner_html("");
    }

    pub fn render(&self, html: &str) {
        let _ = self.sidebar.class_list().remove_1(LOADING_CLASS);
        self.content.set_inner_html(html);
    }

    /// Replaces the panel with `Error <status>` and the status text.
    pub fn render_error(&self, status: u16, status_text: &str) -> Result<(), DomError> {
        let _ = self.sidebar.class_list().remove_1(LOADING_CLASS);
        write_error_panel(&self.content, status, status_text)
    }

    fn row(&self, key: &FeatureKey) -> Option<Element> {
        query_all(&self.content, ROW_SELECTOR)
            .ok()?
            .into_iter()
            .find(|row| row_key(row).as_ref() == Some(key))
    }

    pub fn clear_highlight(&self) {
        let Ok(rows) = query_all(&self.content, ".itemtable .highlight") else {
            return;
        };
        for row in rows {
            let _ = row.class_list().remove_1(HIGHLIGHT_CLASS);
        }
    }

    pub fn highlight_row(&self, key: &FeatureKey) {
        if let Some(row) = self.row(key) {
            let _ = row.class_list().add_1(HIGHLIGHT_CLASS);
        }
    }

    pub fn scroll_row_into_view(&self, key: &FeatureKey) {
        if let Some(row) = self.row(key) {
            row.scroll_into_view();
        }
    }

    /// Clicks the edit link in the last cell of the row.
    pub fn activate_edit_link(&self, key: &FeatureKey) {
        let link = self
            .row(key)
            .and_then(|row| row.query_selector("td:last-child a").ok().flatten());
        if let Some(link) = link.and_then(|link| link.dyn_into::<HtmlElement>().ok()) {
            link.click();
        }
    }

    fn geometry_field(&self) -> Option<HtmlInputElement> {
        self.content
            .query_selector("input[name=geometry]")
            .ok()
            .flatten()
            .and_then(|input| input.dyn_into::<HtmlInputElement>().ok())
    }

    pub fn set_geometry_field(&self, json: &str) {
        match self.geometry_field() {
            Some(field) => field.set_value(json),
            None => warn!("no geometry field to write to"),
        }
    }

    pub fn set_creation_lock(&self, locked: bool) {
        let Some(form) = self.geometry_field().and_then(|field| closest(&field, "form")) else {
            return;
        };
        let classes = form.class_list();
        let _ = if locked {
            classes.add_1(CREATION_LOCK_CLASS)
        } else {
            classes.remove_1(CREATION_LOCK_CLASS)
        };
    }

    /// Preselects `level` in the `level` and `levels` fields of the form.
    pub fn select_level(&self, level: &str) {
        if let Ok(Some(field)) = self.content.query_selector("#id_level") {
            if let Some(select) = field.dyn_ref::<HtmlSelectElement>() {
                select.set_value(level);
            } else if let Some(input) = field.dyn_ref::<HtmlInputElement>() {
                input.set_value(level);
            }
        }
        let Ok(options) = query_all(&self.content, "#id_levels option") else {
            return;
        };
        for option in options {
            if let Some(option) = option.dyn_ref::<HtmlOptionElement>() {
                if option.value() == level {
                    option.set_selected(true);
                }
            }
        }
    }

    pub fn focus_name(&self) {
        let field = self
            .content
            .query_selector("#id_name")
            .ok()
            .flatten()
            .and_then(|field| field.dyn_into::<HtmlElement>().ok());
        if let Some(field) = field {
            let _ = field.focus();
        }
    }
}

fn write_error_panel(content: &Element, status: u16, status_text: &str) -> Result<(), DomError> {
    content.set_inner_html("");
    let document = content
        .owner_document()
        .ok_or(DomError::Missing("document"))?;
    let heading = document.create_element("h3")?;
    heading.set_text_content(Some(&format!("Error {status}")));
    content.append_child(&heading)?;
    content.append_child(&document.create_text_node(status_text))?;
    Ok(())
}

/// Position of `form` among the forms of the panel.
fn form_index(content: &Element, form: &Element) -> usize {
    query_all(content, "form")
        .ok()
        .and_then(|forms| forms.iter().position(|other| other == form))
        .unwrap_or_default()
}
