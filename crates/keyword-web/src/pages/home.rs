//! Home Page: keyword extraction

use leptos::prelude::*;

use crate::api::{self, Keyword};
use crate::app::AuthContext;
use crate::components::KeywordList;

#[component]
pub fn HomePage() -> impl IntoView {
    let context = expect_context::<AuthContext>();
    let (input, set_input) = signal(String::new());
    let (keywords, set_keywords) = signal(Vec::<Keyword>::new());
    let (loading, set_loading) = signal(false);
    let (error, set_error) = signal(None::<String>);
    let (upgrade, set_upgrade) = signal(false);

    let extract = move |_| {
        let text = input.get();
        if text.trim().is_empty() {
            set_error.set(Some("Please enter some text.".into()));
            return;
        }
        if loading.get() {
            return;
        }

        set_loading.set(true);
        set_error.set(None);
        set_upgrade.set(false);

        let token = context.token();
        leptos::task::spawn_local(async move {
            match api::extract_keywords(&text, token.as_deref()).await {
                Ok(found) => {
                    set_keywords.set(found);
                    // Usage count changed on the server
                    context.refresh();
                }
                Err(e) => {
                    set_upgrade.set(e.is_free_tier_exhausted());
                    set_error.set(Some(e.message));
                }
            }
            set_loading.set(false);
        });
    };

    view! {
        <div class="home">
            <header class="hero">
                <h1>"Keyword Extractor+"</h1>
                <p class="tagline">"Paste any text and get its most salient entities"</p>
            </header>

            <section class="extract">
                <textarea
                    placeholder="Barack Obama was born in Hawaii."
                    prop:value=move || input.get()
                    on:input=move |ev| set_input.set(event_target_value(&ev))
                />
                <button class="btn btn-primary" on:click=extract disabled=move || loading.get()>
                    {move || if loading.get() { "Extracting..." } else { "Extract Keywords" }}
                </button>
            </section>

            <Show when=move || error.get().is_some()>
                <p class="error">{move || error.get().unwrap_or_default()}</p>
            </Show>
            <Show when=move || upgrade.get()>
                <a href="/pricing" class="btn btn-primary">"Upgrade to Premium"</a>
            </Show>

            <Show when=move || !keywords.get().is_empty()>
                {move || view! { <KeywordList keywords=keywords.get() /> }}
            </Show>
        </div>
    }
}
