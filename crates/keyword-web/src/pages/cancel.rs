//! Checkout cancelled

use leptos::prelude::*;

#[component]
pub fn CancelPage() -> impl IntoView {
    view! {
        <div class="result cancel">
            <h1>"Checkout cancelled"</h1>
            <p>"No payment was taken."</p>
            <a href="/pricing" class="btn">"Back to pricing"</a>
        </div>
    }
}
