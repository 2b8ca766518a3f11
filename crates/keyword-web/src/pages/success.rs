//! Checkout success

use leptos::prelude::*;
use leptos_router::hooks::use_query_map;

use crate::api;
use crate::app::AuthContext;

#[component]
pub fn SuccessPage() -> impl IntoView {
    let context = expect_context::<AuthContext>();
    let query = use_query_map();
    let session_id = move || {
        query
            .with(|q| q.get("session_id").map(|id| id.to_string()))
            .unwrap_or_default()
    };
    // Stripe can only be asked about subscriptions; one-time purchases are
    // confirmed by the webhook alone
    let is_subscription = move || query.with(|q| q.get("mode").as_deref() == Some("subscription"));
    let (status, set_status) = signal(None::<String>);

    // The webhook may land after the redirect; reload once now
    context.refresh();

    let verify = move |_| {
        let Some(token) = context.token() else {
            set_status.set(Some("Log in to verify your subscription.".into()));
            return;
        };
        leptos::task::spawn_local(async move {
            match api::verify_subscription(&token).await {
                Ok(true) => {
                    context.refresh();
                    set_status.set(Some("Premium is active.".into()));
                }
                Ok(false) => set_status.set(Some(
                    "Subscription not confirmed yet. It can take a minute to arrive.".into(),
                )),
                Err(e) => set_status.set(Some(e.message)),
            }
        });
    };

    let reload = move |_| {
        context.refresh();
        set_status.set(Some("Checking your account...".into()));
    };

    view! {
        <div class="result success">
            <h1>"Thank you!"</h1>
            <p>"Your payment went through."</p>
            <p class="muted">{move || format!("Reference: {}", session_id())}</p>
            <Show
                when=move || context.is_premium()
                fallback=move || view! {
                    <Show
                        when=is_subscription
                        fallback=move || view! {
                            <p>"Premium turns on as soon as Stripe confirms the payment."</p>
                            <button class="btn" on:click=reload>"Check again"</button>
                        }
                    >
                        <button class="btn" on:click=verify>"Verify now"</button>
                    </Show>
                }
            >
                <p>"Premium is active on your account."</p>
            </Show>
            <p class="status">{move || status.get().unwrap_or_default()}</p>
            <a href="/" class="btn btn-primary">"Back to extraction"</a>
        </div>
    }
}
