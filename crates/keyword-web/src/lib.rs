//! keyword-extractor-plus Web Client
//!
//! Leptos-based WASM single-page app: Auth0 login, keyword extraction and
//! Stripe checkout against the gateway.

mod api;
mod app;
mod auth;
mod components;
mod config;
mod pages;

pub use app::App;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    leptos::mount::mount_to_body(App);
}
