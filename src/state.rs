//! Gateway State Management
//!
//! This module holds the state shared by every request: the remote API
//! backends, the delivery fee, and one `Session` (auth plus cart) per
//! browser, keyed by the `storefront_session` cookie. Sessions are only
//! created by sign-in, end at sign-out, and are swept once idle.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::{ApiClient, AuthBackend, CartBackend, CatalogBackend, CheckoutBackend};
use crate::auth::session::SIGN_IN_REQUIRED;
use crate::auth::{AuthSession, Credentials, MemoryTokenStore};
use crate::cart::CartStore;
use crate::error::{ErrorKind, Result, StorefrontError};

/// Name of the cookie that carries the session id.
pub const SESSION_COOKIE: &str = "storefront_session";

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state that can be safely passed between threads
pub type SharedState = Arc<AppState>;

/// The remote API, split along the seams the stores depend on.
#[derive(Clone)]
pub struct Backends {
    pub cart: Arc<dyn CartBackend>,
    pub checkout: Arc<dyn CheckoutBackend>,
    pub auth: Arc<dyn AuthBackend>,
    pub catalog: Arc<dyn CatalogBackend>,
}

impl Backends {
    /// Serves every seam from one HTTP client.
    pub fn from_client(client: ApiClient) -> Self {
        let client = Arc::new(client);

        Self {
            cart: client.clone(),
            checkout: client.clone(),
            auth: client.clone(),
            catalog: client,
        }
    }
}

/// Auth and cart state for one browser.
pub struct Session {
    pub auth: AuthSession,
    pub cart: CartStore,
    last_seen: Mutex<Instant>,
}

impl Session {
    /// Creates an anonymous session with an empty cart.
    pub fn new(backends: &Backends) -> Self {
        Self {
            auth: AuthSession::new(backends.auth.clone(), Arc::new(MemoryTokenStore::default())),
            cart: CartStore::new(backends.cart.clone()),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    /// Marks the session as used now.
    pub fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Time since the session was last used.
    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().unwrap_or_else(PoisonError::into_inner).elapsed()
    }

    /// Credentials for authenticated calls.
    ///
    /// # Errors
    ///
    /// Returns an auth error when nobody is signed in.
    pub fn credentials(&self) -> Result<Credentials> {
        self.auth.credentials()
    }

    /// Signs out and forgets the cart.
    pub fn sign_out(&self) {
        self.auth.logout();
        self.cart.reset();
    }

    /// Passes `outcome` through, signing the session out when the API
    /// rejected its token.
    pub fn guard<T>(&self, outcome: Result<T>) -> Result<T> {
        if let Err(error) = &outcome {
            if error.kind() == ErrorKind::Auth && self.auth.is_authenticated() {
                info!(%error, "token rejected, signing session out");
                self.sign_out();
            }
        }

        outcome
    }
}

/// Core application state containing sessions and backends
pub struct AppState {
    /// Sessions keyed by cookie value.
    /// DashMap allows concurrent access without external Mutexes.
    pub sessions: DashMap<String, Arc<Session>>,

    pub backends: Backends,

    /// Flat delivery fee added to every order.
    pub delivery_fee: f64,

    /// Sessions unused for this long are dropped.
    pub idle_timeout: Duration,

    /// Creating a session beyond this many drops the least recently used one.
    pub max_sessions: usize,
}

impl AppState {
    pub fn new(backends: Backends, delivery_fee: f64) -> Self {
        Self {
            sessions: DashMap::new(),
            backends,
            delivery_fee,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    #[must_use]
    pub fn with_session_limits(mut self, idle_timeout: Duration, max_sessions: usize) -> Self {
        self.idle_timeout = idle_timeout;
        self.max_sessions = max_sessions;
        self
    }

    /// Looks up the live session named by the request's cookie. Never
    /// creates one; an idle session found here is dropped instead.
    pub fn find_session(&self, headers: &HeaderMap) -> Option<(String, Arc<Session>)> {
        let id = session_cookie(headers)?;
        let session = Arc::clone(self.sessions.get(&id)?.value());

        if session.idle_for() >= self.idle_timeout {
            self.sessions.remove(&id);
            debug!(session_id = %id, "dropped idle session");
            return None;
        }

        session.touch();
        Some((id, session))
    }

    /// The request's session, for routes that only make sense signed in.
    ///
    /// # Errors
    ///
    /// Returns an auth error when the request carries no live session.
    pub fn require_session(&self, headers: &HeaderMap) -> Result<Arc<Session>> {
        self.find_session(headers)
            .map(|(_, session)| session)
            .ok_or_else(|| StorefrontError::Unauthorized(SIGN_IN_REQUIRED.into()))
    }

    /// Looks up the session named by the request's cookie, creating one
    /// when the cookie is missing or unknown.
    ///
    /// Returns the session id, the session, and whether it was just created.
    pub fn session(&self, headers: &HeaderMap) -> (String, Arc<Session>, bool) {
        if let Some((id, session)) = self.find_session(headers) {
            return (id, session, false);
        }

        self.make_room();

        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(&self.backends));
        self.sessions.insert(id.clone(), session.clone());
        debug!(session_id = %id, "created session");

        (id, session, true)
    }

    /// Forgets a session. Requests still holding it finish normally.
    pub fn end_session(&self, session_id: &str) -> Option<Arc<Session>> {
        let ended = self.sessions.remove(session_id).map(|(_, session)| session);
        if ended.is_some() {
            debug!(session_id, "ended session");
        }
        ended
    }

    /// Drops every session idle for at least `idle_timeout`.
    ///
    /// Returns how many were dropped.
    pub fn evict_idle(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.idle_for() < self.idle_timeout);

        before.saturating_sub(self.sessions.len())
    }

    fn make_room(&self) {
        if self.sessions.len() < self.max_sessions {
            return;
        }

        let evicted = self.evict_idle();
        if evicted > 0 {
            debug!(evicted, "evicted idle sessions");
        }
        if self.sessions.len() < self.max_sessions {
            return;
        }

        let oldest = self
            .sessions
            .iter()
            .max_by_key(|entry| entry.value().idle_for())
            .map(|entry| entry.key().clone());
        if let Some(id) = oldest {
            self.sessions.remove(&id);
            info!(session_id = %id, max_sessions = self.max_sessions, "session limit reached, dropped least recently used");
        }
    }
}

/// Sweeps idle sessions in the background every `every`.
pub fn spawn_session_sweeper(state: SharedState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(every.max(Duration::from_secs(1)));
        loop {
            ticks.tick().await;
            let evicted = state.evict_idle();
            if evicted > 0 {
                info!(evicted, remaining = state.sessions.len(), "evicted idle sessions");
            }
        }
    })
}

// =============================================================================
// Session Cookie
// =============================================================================

/// Reads the session id from the `Cookie` header.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value for a new session.
pub fn session_set_cookie(session_id: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .ok()
}

/// `Set-Cookie` value that makes the browser forget its session.
pub fn expired_session_cookie() -> HeaderValue {
    HeaderValue::from_static("storefront_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Attaches the session cookie to `response` when the session is new.
pub fn with_session_cookie(response: impl IntoResponse, session_id: &str, created: bool) -> Response {
    let mut response = response.into_response();

    if created {
        if let Some(cookie) = session_set_cookie(session_id) {
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
    }

    response
}
