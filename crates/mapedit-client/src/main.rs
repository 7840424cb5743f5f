//! Mapedit Client
//!
//! Yew WASM frontend: hosts the Leaflet map and the AJAX sidebar and runs
//! the `mapedit-core` editor against them.
//!
//! This crate is WASM-only. Use `trunk build` or `cargo check --target wasm32-unknown-unknown`.

#[cfg(not(target_arch = "wasm32"))]
compile_error!(
    "mapedit-client only supports wasm32 target. Use: cargo check -p mapedit-client --target wasm32-unknown-unknown"
);

mod app;
mod config;
mod dom;
mod hooks;
mod http;
mod leaflet;
mod map_host;
mod runtime;
mod section_control;

use std::rc::Rc;

use app::{App, AppProps};
use mapedit_core::EditorConfig;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_web::MakeWebConsoleWriter;

fn main() {
    console_error_panic_hook::set_once();

    let loaded = config::read_config();
    let directive = match &loaded {
        Ok(Some(config)) => config.log_filter.clone(),
        _ => EditorConfig::default().log_filter,
    };

    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(MakeWebConsoleWriter::new())
        .with_filter(filter);
    tracing_subscriber::registry().with(fmt_layer).init();

    let config = match loaded {
        Ok(Some(config)) => config,
        Ok(None) => {
            tracing::warn!("no #{} element, using default configuration", config::CONFIG_ELEMENT_ID);
            EditorConfig::default()
        }
        Err(err) => {
            tracing::warn!("{err}, using default configuration");
            EditorConfig::default()
        }
    };

    yew::Renderer::<App>::with_props(AppProps {
        config: Rc::new(config),
    })
    .render();
}
