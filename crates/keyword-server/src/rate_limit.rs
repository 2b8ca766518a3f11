//! Per-client sliding-window rate limiting
//!
//! Each client address keeps the instants of its accepted requests within
//! the window. A request is refused when the window already holds `limit`
//! of them; refused requests are not recorded.
//!
//! Clients are keyed by the socket peer address. `X-Forwarded-For` is only
//! read when the gateway runs behind a trusted proxy, and then only the hop
//! that proxy appended.

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

pub const WINDOW: Duration = Duration::from_secs(60 * 60);

/// Most clients tracked at once
pub const MAX_TRACKED_CLIENTS: usize = 10_000;

/// Minimum gap between two sweeps of idle clients
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Bucket for requests without a peer address
const UNKNOWN_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

#[derive(Default)]
struct Hits {
    clients: HashMap<IpAddr, VecDeque<Instant>>,
    swept_at: Option<Instant>,
}

impl Hits {
    /// Drop clients with nothing left in the window, at most once per
    /// `SWEEP_INTERVAL`.
    fn sweep(&mut self, now: Instant, window: Duration) {
        if self
            .swept_at
            .is_some_and(|last| now.duration_since(last) < SWEEP_INTERVAL)
        {
            return;
        }
        self.swept_at = Some(now);

        let before = self.clients.len();
        self.clients.retain(|_, queue| {
            queue
                .back()
                .is_some_and(|last| now.duration_since(*last) < window)
        });
        tracing::debug!(removed = before - self.clients.len(), "Swept idle rate-limit clients");
    }
}

pub struct RateLimiter {
    limit: usize,
    window: Duration,
    max_clients: usize,
    hits: Mutex<Hits>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: usize::try_from(limit).unwrap_or(usize::MAX),
            window,
            max_clients: MAX_TRACKED_CLIENTS,
            hits: Mutex::new(Hits::default()),
        }
    }

    pub fn per_hour(limit: u32) -> Self {
        Self::new(limit, WINDOW)
    }

    #[must_use]
    pub const fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    /// Admit one request from `client`, or return how long until a slot frees.
    pub fn check(&self, client: IpAddr) -> Result<(), Duration> {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: IpAddr, now: Instant) -> Result<(), Duration> {
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);

        if !hits.clients.contains_key(&client) && hits.clients.len() >= self.max_clients {
            hits.sweep(now, self.window);
            if hits.clients.len() >= self.max_clients {
                tracing::warn!(
                    client = %client,
                    tracked = hits.clients.len(),
                    "Rate-limit table full, refusing new client"
                );
                return Err(SWEEP_INTERVAL);
            }
        }

        let queue = hits.clients.entry(client).or_default();
        while queue
            .front()
            .is_some_and(|first| now.duration_since(*first) >= self.window)
        {
            queue.pop_front();
        }

        if queue.len() >= self.limit {
            let retry_after = queue
                .front()
                .map_or(self.window, |first| self.window.saturating_sub(now.duration_since(*first)));
            return Err(retry_after);
        }

        queue.push_back(now);
        Ok(())
    }

    /// Number of clients currently tracked
    pub fn tracked(&self) -> usize {
        self.hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clients
            .len()
    }
}

/// Rate-limit key for a request.
///
/// The socket peer, unless `trust_proxy` is set: then the last
/// `X-Forwarded-For` hop, which the proxy in front of us appended. Hops
/// that are not IP addresses are ignored.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> IpAddr {
    let forwarded = trust_proxy
        .then(|| {
            headers
                .get_all("x-forwarded-for")
                .iter()
                .filter_map(|value| value.to_str().ok())
                .flat_map(|value| value.split(','))
                .last()
                .and_then(|hop| hop.trim().parse::<IpAddr>().ok())
        })
        .flatten();

    forwarded
        .or_else(|| peer.map(|addr| addr.ip()))
        .unwrap_or(UNKNOWN_CLIENT)
}

/// Middleware refusing requests past the per-client limit before any
/// handler work runs
pub async fn limit_by_client(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer, state.config.trust_proxy);

    match state.limiter.check(client) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(client = %client, retry_after_secs = retry_after.as_secs(), "Rate limit exceeded");
            ApiError::RateLimited { retry_after }.into_response()
        }
    }
}
