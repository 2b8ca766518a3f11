//! Pricing Page

use leptos::prelude::*;

use crate::api;
use crate::app::AuthContext;
use crate::auth;
use crate::config;

#[component]
pub fn PricingPage() -> impl IntoView {
    let context = expect_context::<AuthContext>();
    let (error, set_error) = signal(None::<String>);
    let (busy, set_busy) = signal(false);

    let checkout = move |_| {
        if context.token().is_none() {
            auth::login();
            return;
        }
        let Some(profile) = context.profile.get_untracked() else {
            set_error.set(Some("Still loading your profile, try again in a moment.".into()));
            return;
        };
        let customer_id = context
            .metadata
            .get_untracked()
            .and_then(|m| m.stripe_customer_id);

        set_busy.set(true);
        set_error.set(None);
        leptos::task::spawn_local(async move {
            match api::create_checkout(&profile, customer_id.as_deref()).await {
                Ok(url) => auth::navigate_external(&url),
                Err(e) => {
                    set_error.set(Some(e.message));
                    set_busy.set(false);
                }
            }
        });
    };

    // Plain form post: the gateway answers 303 and the browser follows it
    // to Stripe
    let access_token = move || {
        context
            .session
            .get()
            .map(|s| s.access_token)
            .unwrap_or_default()
    };
    let cached_customer = move || {
        context
            .metadata
            .get()
            .and_then(|m| m.stripe_customer_id)
            .unwrap_or_default()
    };

    view! {
        <div class="pricing">
            <h1>"Pricing"</h1>
            <p class="subtitle">"Start free, upgrade when you need more"</p>

            <div class="plans">
                <div class="plan">
                    <h2>"Free"</h2>
                    <div class="price">"$0"</div>
                    <ul>
                        <li>"10 extractions when signed in"</li>
                        <li>"Entity type and salience"</li>
                    </ul>
                    <a href="/" class="btn">"Get Started"</a>
                </div>

                <div class="plan featured">
                    <span class="badge">"Premium Access"</span>
                    <h2>"Premium"</h2>
                    <div class="price">"$9.99"<span>" one-time"</span></div>
                    <ul>
                        <li>"Unlimited extractions"</li>
                        <li>"Premium-only features"</li>
                    </ul>
                    <Show
                        when=move || !context.is_premium()
                        fallback=|| view! { <p class="owned">"You already have Premium."</p> }
                    >
                        <button class="btn btn-primary" on:click=checkout disabled=move || busy.get()>
                            {move || if busy.get() { "Redirecting..." } else { "Buy Premium" }}
                        </button>
                    </Show>
                </div>

                <div class="plan">
                    <h2>"Premium Subscription"</h2>
                    <div class="price">"$50"<span>" / month"</span></div>
                    <ul>
                        <li>"Unlimited extractions"</li>
                        <li>"Cancel any time"</li>
                    </ul>
                    <Show
                        when=move || !context.is_premium()
                        fallback=|| view! { <p class="owned">"You already have Premium."</p> }
                    >
                        <Show
                            when=move || context.session.get().is_some()
                            fallback=|| view! {
                                <button class="btn" on:click=|_| auth::login()>"Log in to subscribe"</button>
                            }
                        >
                            <form method="post" action=config::backend("/create-subscription-session")>
                                <input type="hidden" name="token" prop:value=access_token />
                                <input type="hidden" name="customerId" prop:value=cached_customer />
                                <button type="submit" class="btn">"Subscribe"</button>
                            </form>
                        </Show>
                    </Show>
                </div>
            </div>

            <Show when=move || error.get().is_some()>
                <p class="error">{move || error.get().unwrap_or_default()}</p>
            </Show>
        </div>
    }
}
