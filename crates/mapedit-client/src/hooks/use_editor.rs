//! Editor lifecycle hook.
//!
//! Boots the editor once the shell is mounted and wires the window-level
//! events (history navigation, leaving the page) into it.

use std::rc::Rc;

use gloo::events::{EventListener, EventListenerOptions};
use mapedit_core::{EditorConfig, Event};
use wasm_bindgen::JsCast;
use web_sys::BeforeUnloadEvent;
use yew::prelude::*;

use crate::runtime::{self, EditorHandle};

/// Starts the editor for `config` and keeps it alive with the component.
///
/// The shell must already contain `#map` and `#sidebar .content`, so the
/// editor is started from an effect rather than during render.
#[hook]
pub fn use_editor(config: Rc<EditorConfig>) {
    let editor_ref = use_mut_ref(|| None::<EditorHandle>);
    let listeners_ref = use_mut_ref(Vec::<EventListener>::new);

    use_effect_with(config, move |config| {
        let editor = match runtime::boot(config) {
            Ok(editor) => editor,
            Err(err) => {
                tracing::error!("failed to start the editor: {err}");
                return;
            }
        };
        let window = gloo::utils::window();

        let popstate = {
            let editor = editor.clone();
            EventListener::new(&window, "popstate", move |_| {
                editor.dispatch(Event::HistoryRestored(runtime::current_location()));
            })
        };

        // Unsaved drawings and forms marked with data-onbeforeunload.
        let beforeunload = {
            let editor = editor.clone();
            EventListener::new_with_options(
                &window,
                "beforeunload",
                EventListenerOptions::enable_prevent_default(),
                move |event| {
                    if !editor.warn_before_unload() {
                        return;
                    }
                    event.prevent_default();
                    if let Some(event) = event.dyn_ref::<BeforeUnloadEvent>() {
                        event.set_return_value("");
                    }
                },
            )
        };

        *listeners_ref.borrow_mut() = vec![popstate, beforeunload];
        *editor_ref.borrow_mut() = Some(editor);
    });
}
