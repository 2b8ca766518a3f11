//! Main App Component

use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::{components::*, path};

use crate::api::{self, UserMetadata, UserProfile};
use crate::auth::{self, Session};
use crate::components::Nav;
use crate::pages::{CallbackPage, CancelPage, HomePage, PricingPage, SuccessPage};

/// Who is signed in, shared through context
#[derive(Clone, Copy)]
pub struct AuthContext {
    pub session: RwSignal<Option<Session>>,
    pub profile: RwSignal<Option<UserProfile>>,
    pub metadata: RwSignal<Option<UserMetadata>>,
}

impl AuthContext {
    fn new(session: Option<Session>) -> Self {
        Self {
            session: RwSignal::new(session),
            profile: RwSignal::new(None),
            metadata: RwSignal::new(None),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.session.get_untracked().map(|s| s.access_token)
    }

    pub fn is_premium(&self) -> bool {
        self.metadata.get().is_some_and(|m| m.is_premium)
    }

    /// Adopt a fresh session and load the user's profile and metadata.
    pub fn sign_in(self, session: Session) {
        self.session.set(Some(session));
        self.refresh();
    }

    /// Reload profile and metadata for the current session.
    pub fn refresh(self) {
        let Some(token) = self.token() else {
            return;
        };

        spawn_local(async move {
            match api::user_profile(&token).await {
                Ok(profile) => self.profile.set(Some(profile)),
                Err(e) => leptos::logging::warn!("Profile unavailable: {}", e.message),
            }

            match api::user_metadata(&token).await {
                Ok(metadata) => self.metadata.set(Some(metadata)),
                Err(e) if e.code.as_deref() == Some("UNAUTHORIZED") => {
                    leptos::logging::warn!("Session rejected, signing out locally");
                    auth::clear_session();
                    self.session.set(None);
                    self.profile.set(None);
                    self.metadata.set(None);
                }
                Err(e) => leptos::logging::warn!("Metadata unavailable: {}", e.message),
            }
        });
    }
}

/// Root application component
#[component]
pub fn App() -> impl IntoView {
    let context = AuthContext::new(auth::load_session());
    context.refresh();
    provide_context(context);

    view! {
        <Router>
            <Nav />
            <main class="app">
                <Routes fallback=|| view! { <p>"Page not found"</p> }>
                    <Route path=path!("/") view=HomePage />
                    <Route path=path!("/pricing") view=PricingPage />
                    <Route path=path!("/success") view=SuccessPage />
                    <Route path=path!("/cancel") view=CancelPage />
                    <Route path=path!("/callback") view=CallbackPage />
                </Routes>
            </main>
        </Router>
    }
}
