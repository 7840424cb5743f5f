//! Application shell: map, sidebar, and the small-screen view switch.

use std::rc::Rc;

use mapedit_core::EditorConfig;
use yew::prelude::*;

use crate::hooks::use_editor;

#[derive(Properties, PartialEq)]
pub struct AppProps {
    pub config: Rc<EditorConfig>,
}

/// Root component.
///
/// Renders only the static frame. The map widget and the sidebar content
/// are owned by the editor runtime once it boots, so nothing here depends
/// on editor state.
#[function_component(App)]
pub fn app(props: &AppProps) -> Html {
    let show_map = use_state(|| false);
    use_editor(props.config.clone());

    let on_show_map = {
        let show_map = show_map.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            show_map.set(true);
        })
    };
    let on_show_details = {
        let show_map = show_map.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            show_map.set(false);
        })
    };

    html! {
        <div class={classes!("mapedit", (*show_map).then_some("show-map"))}>
            <div id="map"></div>
            <aside id="sidebar">
                <nav class="sidebar-switch">
                    <a id="show_map" href="#" onclick={on_show_map}>{ "Show map" }</a>
                    <a id="show_details" href="#" onclick={on_show_details}>{ "Show details" }</a>
                </nav>
                <div class="content"></div>
            </aside>
        </div>
    }
}
