//! Build-time client settings
//!
//! Baked in at compile time (`KEYWORD_BACKEND_URL=... trunk build`), the
//! browser has no environment to read at runtime.

pub const BACKEND_URL: &str = match option_env!("KEYWORD_BACKEND_URL") {
    Some(url) => url,
    None => "http://localhost:3000",
};

pub const AUTH0_DOMAIN: &str = match option_env!("KEYWORD_AUTH0_DOMAIN") {
    Some(domain) => domain,
    None => "keyword-extractor-plus.us.auth0.com",
};

pub const AUTH0_CLIENT_ID: &str = match option_env!("KEYWORD_AUTH0_CLIENT_ID") {
    Some(id) => id,
    None => "",
};

/// API audience for the access token; empty requests an opaque token
pub const AUTH0_AUDIENCE: &str = match option_env!("KEYWORD_AUTH0_AUDIENCE") {
    Some(audience) => audience,
    None => "",
};

/// Full URL of a gateway route
pub fn backend(path: &str) -> String {
    format!("{}{path}", BACKEND_URL.trim_end_matches('/'))
}

/// Base URL of the Auth0 tenant
pub fn auth0_base() -> String {
    if AUTH0_DOMAIN.starts_with("http://") || AUTH0_DOMAIN.starts_with("https://") {
        AUTH0_DOMAIN.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", AUTH0_DOMAIN.trim_end_matches('/'))
    }
}

/// Origin this app is served from
pub fn origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| "http://localhost:4200".into())
}
