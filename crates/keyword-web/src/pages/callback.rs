//! Auth0 login callback

use leptos::prelude::*;
use leptos_router::hooks::use_navigate;

use crate::app::AuthContext;
use crate::auth;

#[component]
pub fn CallbackPage() -> impl IntoView {
    let context = expect_context::<AuthContext>();
    let navigate = use_navigate();
    let (failed, set_failed) = signal(false);

    Effect::new(move |_| {
        let fragment = web_sys::window()
            .and_then(|w| w.location().hash().ok())
            .unwrap_or_default();

        match auth::complete_login(&fragment) {
            Some(session) => {
                context.sign_in(session);
                navigate("/", Default::default());
            }
            None => set_failed.set(true),
        }
    });

    view! {
        <div class="callback">
            <Show
                when=move || failed.get()
                fallback=|| view! { <p>"Signing you in..."</p> }
            >
                <p class="error">"Login failed or was cancelled."</p>
                <button class="btn" on:click=|_| auth::login()>"Try again"</button>
            </Show>
        </div>
    }
}
