//! UI Components

use leptos::prelude::*;

use crate::api::Keyword;
use crate::app::AuthContext;
use crate::auth;

/// Top bar with login state
#[component]
pub fn Nav() -> impl IntoView {
    let context = expect_context::<AuthContext>();
    let signed_in = move || context.session.get().is_some();
    let who = move || {
        context
            .profile
            .get()
            .and_then(|p| p.name.or(p.email))
            .unwrap_or_default()
    };

    view! {
        <nav class="nav">
            <a href="/" class="brand">"Keyword Extractor+"</a>
            <a href="/pricing">"Pricing"</a>
            <Show when=move || context.is_premium()>
                <span class="badge">"Premium"</span>
            </Show>
            <Show
                when=signed_in
                fallback=|| view! {
                    <button class="btn" on:click=|_| auth::login()>"Log in"</button>
                }
            >
                <span class="user">{who}</span>
                <button class="btn" on:click=|_| auth::logout()>"Log out"</button>
            </Show>
        </nav>
    }
}

/// Keyword table, most salient first
#[component]
pub fn KeywordList(keywords: Vec<Keyword>) -> impl IntoView {
    let mut keywords = keywords;
    keywords.sort_by(|a, b| b.salience.total_cmp(&a.salience));

    view! {
        <table class="keywords">
            <thead>
                <tr><th>"Keyword"</th><th>"Type"</th><th>"Salience"</th></tr>
            </thead>
            <tbody>
                {keywords
                    .into_iter()
                    .map(|k| view! {
                        <tr>
                            <td>{k.name}</td>
                            <td>{k.entity_type}</td>
                            <td>{format!("{:.2}", k.salience)}</td>
                        </tr>
                    })
                    .collect_view()}
            </tbody>
        </table>
    }
}
