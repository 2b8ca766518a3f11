//! Auth0 login (implicit redirect flow)
//!
//! `/authorize` sends the browser back to `/callback` with the access token
//! in the URL fragment. The token lives in `sessionStorage`, so it ends with
//! the tab.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config;

const SESSION_KEY: &str = "keyword.session";
const STATE_KEY: &str = "keyword.auth_state";

/// Signed-in session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,

    /// Unix seconds
    pub expires_at: i64,
}

impl Session {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// `/authorize` URL for an implicit-flow login
pub fn authorize_url(redirect_uri: &str, state: &str) -> String {
    let mut params = vec![
        ("response_type", "token"),
        ("client_id", config::AUTH0_CLIENT_ID),
        ("redirect_uri", redirect_uri),
        ("scope", "openid profile email"),
        ("state", state),
    ];
    if !config::AUTH0_AUDIENCE.is_empty() {
        params.push(("audience", config::AUTH0_AUDIENCE));
    }
    with_query(&format!("{}/authorize", config::auth0_base()), &params)
}

/// `/v2/logout` URL returning to `return_to`
pub fn logout_url(return_to: &str) -> String {
    with_query(
        &format!("{}/v2/logout", config::auth0_base()),
        &[("client_id", config::AUTH0_CLIENT_ID), ("returnTo", return_to)],
    )
}

fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    match Url::parse_with_params(base, params) {
        Ok(url) => url.into(),
        Err(_) => base.to_string(),
    }
}

/// Parse the callback fragment (`#access_token=...&expires_in=...&state=...`).
///
/// Returns the session and the echoed `state`.
pub fn parse_fragment(fragment: &str, now: i64) -> Option<(Session, Option<String>)> {
    let mut url = Url::parse("http://callback.invalid/").ok()?;
    url.set_query(Some(fragment.trim_start_matches('#')));

    let mut token = None;
    let mut expires_in = 7200_i64;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "access_token" => token = Some(value.into_owned()),
            "expires_in" => expires_in = value.parse().unwrap_or(expires_in),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    let access_token = token.filter(|t| !t.is_empty())?;
    Some((
        Session {
            access_token,
            expires_at: now + expires_in,
        },
        state,
    ))
}

fn storage() -> Option<web_sys::Storage> {
    web_sys::window()?.session_storage().ok()?
}

/// Start login: remember a fresh `state`, then leave for Auth0.
pub fn login() {
    let state = random_state();
    match storage() {
        Some(storage) => {
            if let Err(e) = storage.set_item(STATE_KEY, &state) {
                leptos::logging::warn!("Could not store login state, callback will fail: {e:?}");
            }
        }
        None => leptos::logging::warn!("sessionStorage unavailable, callback will fail"),
    }
    let redirect = format!("{}/callback", config::origin());
    navigate_external(&authorize_url(&redirect, &state));
}

/// Forget the session and sign out of Auth0 as well.
pub fn logout() {
    clear_session();
    navigate_external(&logout_url(&config::origin()));
}

/// Finish login from the current URL fragment. `None` when the fragment
/// has no token or its `state` is not the one we sent.
pub fn complete_login(fragment: &str) -> Option<Session> {
    let storage = storage();
    let expected = storage
        .as_ref()
        .and_then(|s| s.get_item(STATE_KEY).ok().flatten());
    if let Some(Err(e)) = storage.as_ref().map(|s| s.remove_item(STATE_KEY)) {
        leptos::logging::warn!("Could not clear login state: {e:?}");
    }

    let (session, state) = parse_fragment(fragment, chrono::Utc::now().timestamp())?;
    if let Err(reason) = check_state(expected.as_deref(), state.as_deref()) {
        leptos::logging::warn!("Login callback rejected: {reason}");
        return None;
    }

    store_session(&session);
    Some(session)
}

/// Compare the `state` we stored before leaving for Auth0 with the one
/// echoed back
fn check_state(expected: Option<&str>, received: Option<&str>) -> Result<(), &'static str> {
    match (expected, received) {
        (None, _) => Err("no login state was stored"),
        (Some(_), None) => Err("callback carries no state"),
        (Some(expected), Some(received)) if expected == received => Ok(()),
        _ => Err("state mismatch"),
    }
}

/// Stored session, if one exists and has not expired
pub fn load_session() -> Option<Session> {
    let raw = storage()?.get_item(SESSION_KEY).ok()??;
    let session: Session = serde_json::from_str(&raw).ok()?;
    if session.is_expired_at(chrono::Utc::now().timestamp()) {
        clear_session();
        return None;
    }
    Some(session)
}

fn store_session(session: &Session) {
    if let (Some(storage), Ok(raw)) = (storage(), serde_json::to_string(session)) {
        if let Err(e) = storage.set_item(SESSION_KEY, &raw) {
            leptos::logging::warn!("Could not store session, it ends with this page: {e:?}");
        }
    }
}

pub fn clear_session() {
    if let Some(storage) = storage() {
        if let Err(e) = storage.remove_item(SESSION_KEY) {
            leptos::logging::warn!("Could not clear session: {e:?}");
        }
    }
}

pub fn navigate_external(url: &str) {
    if let Some(window) = web_sys::window() {
        if let Err(e) = window.location().set_href(url) {
            leptos::logging::error!("Navigation to {url} failed: {e:?}");
        }
    }
}

fn random_state() -> String {
    let mut bytes = [0_u8; 16];
    if let Some(crypto) = web_sys::window().and_then(|w| w.crypto().ok()) {
        if let Err(e) = crypto.get_random_values_with_u8_array(&mut bytes) {
            leptos::logging::warn!("No random login state available: {e:?}");
        }
    }
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
