//! Map control listing the sections of the current sidebar view.

use gloo::events::{EventListener, EventListenerOptions};
use mapedit_core::{Event, SectionView};
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement};

use crate::leaflet::{self, Map};
use crate::map_host::HostError;
use crate::runtime::Dispatcher;

const CONTAINER_CLASS: &str = "leaflet-control-sections leaflet-bar";
const EXPANDED_CLASS: &str = "leaflet-control-sections-expanded";
const CURRENT_CLASS: &str = "current";
const DISABLED_CLASS: &str = "leaflet-disabled";
const POSITION: &str = "bottomright";

pub struct SectionControlDom {
    container: HtmlElement,
    _listeners: Vec<EventListener>,
}

impl SectionControlDom {
    pub fn new(map: &Map, dispatcher: &Dispatcher) -> Result<Self, HostError> {
        let container: HtmlElement = gloo::utils::document()
            .create_element("div")?
            .dyn_into()
            .map_err(|_| HostError::Widget("section control is not an HTML element".to_string()))?;
        container.set_class_name(CONTAINER_CLASS);
        container.style().set_property("display", "none")?;
        leaflet::disable_click_propagation(&container);
        leaflet::add_control(map, &container, POSITION);

        let enter = {
            let dispatcher = dispatcher.clone();
            EventListener::new(&container, "mouseenter", move |_| {
                dispatcher.dispatch(Event::SectionsPointer { inside: true });
            })
        };
        let leave = {
            let dispatcher = dispatcher.clone();
            EventListener::new(&container, "mouseleave", move |_| {
                dispatcher.dispatch(Event::SectionsPointer { inside: false });
            })
        };
        let click = {
            let dispatcher = dispatcher.clone();
            let root: Element = container.clone().into();
            EventListener::new_with_options(
                &container,
                "click",
                EventListenerOptions::enable_prevent_default(),
                move |event| {
                    let Some(link) = event
                        .target()
                        .and_then(|target| target.dyn_into::<Element>().ok())
                        .and_then(|target| target.closest("a").ok().flatten())
                    else {
                        return;
                    };
                    event.prevent_default();
                    event.stop_propagation();
                    if let Some(index) = child_index(&root, &link) {
                        dispatcher.dispatch(Event::SectionClicked(index));
                    }
                },
            )
        };

        Ok(Self {
            container,
            _listeners: vec![enter, leave, click],
        })
    }

    pub fn render(&self, view: &SectionView) -> Result<(), HostError> {
        let document = gloo::utils::document();
        self.container.set_inner_html("");
        for section in &view.sections {
            let link = document.create_element("a")?;
            link.set_attribute("href", &section.href)?;
            link.set_text_content(Some(&section.title));
            let classes = link.class_list();
            if section.current {
                classes.add_1(CURRENT_CLASS)?;
            }
            if !view.enabled {
                classes.add_1(DISABLED_CLASS)?;
            }
            self.container.append_child(&link)?;
        }
        self.container
            .class_list()
            .toggle_with_force(EXPANDED_CLASS, view.expanded)?;
        let style = self.container.style();
        if view.visible {
            style.remove_property("display")?;
        } else {
            style.set_property("display", "none")?;
        }
        Ok(())
    }
}

fn child_index(root: &Element, child: &Element) -> Option<usize> {
    let children = root.children();
    (0..children.length())
        .find(|&i| children.item(i).is_some_and(|item| &item == child))
        .and_then(|i| usize::try_from(i).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_child_index() {
        let document = gloo::utils::document();
        let root = document.create_element("div").unwrap();
        root.set_inner_html(r#"<a href="/a/">A</a><a href="/b/">B</a><a href="/c/">C</a>"#);
        let second = root.children().item(1).unwrap();
        assert_eq!(child_index(&root, &second), Some(1));

        let stranger = document.create_element("a").unwrap();
        assert_eq!(child_index(&root, &stranger), None);
    }
}
