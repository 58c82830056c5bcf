//! Auth Session
//!
//! Owns the current customer and bearer token for one browser session and
//! moves between `Anonymous`, `Authenticating` and `Authenticated`. There is
//! no refresh flow: an expired token is discovered when a request fails and
//! the caller signs the session out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::models::{AuthState, Credentials, Customer, TokenStore};
use crate::api::models::{AuthResponse, LoginRequest, PasswordResetRequest, RegisterRequest};
use crate::api::AuthBackend;
use crate::error::{Result, StorefrontError};

pub(crate) const SIGN_IN_REQUIRED: &str = "Please sign in to continue";

/// Sign-in state for one browser session.
pub struct AuthSession {
    backend: Arc<dyn AuthBackend>,
    tokens: Arc<dyn TokenStore>,
    state: watch::Sender<AuthState>,
    epoch: AtomicU64,
}

impl AuthSession {
    /// Creates an anonymous session.
    pub fn new(backend: Arc<dyn AuthBackend>, tokens: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(AuthState::Anonymous);

        Self {
            backend,
            tokens,
            state,
            epoch: AtomicU64::new(0),
        }
    }

    /// Receives every state transition.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Whether a customer is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().customer().is_some()
    }

    /// Credentials for authenticated requests.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Unauthorized`] unless the session is
    /// authenticated and holds a token.
    pub fn credentials(&self) -> Result<Credentials> {
        if !self.is_authenticated() {
            return Err(StorefrontError::Unauthorized(SIGN_IN_REQUIRED.into()));
        }

        self.tokens
            .load()
            .ok_or_else(|| StorefrontError::Unauthorized(SIGN_IN_REQUIRED.into()))
    }

    /// Re-validates a stored token against the API.
    ///
    /// Without a token the session stays anonymous. A token the API rejects,
    /// for whatever reason, is cleared and the session falls back to
    /// anonymous without surfacing an error.
    pub async fn restore(&self) -> AuthState {
        let Some(credentials) = self.tokens.load() else {
            self.transition(AuthState::Anonymous);
            return AuthState::Anonymous;
        };

        // A signed-in session keeps its credentials while the token is checked.
        let ticket = if self.is_authenticated() {
            self.epoch.load(Ordering::SeqCst)
        } else {
            self.begin()
        };
        let outcome = self.backend.current_customer(&credentials).await;

        if !self.is_current(ticket) {
            return self.state();
        }

        match outcome {
            Ok(customer) => {
                debug!(customer_id = %customer.id, "restored session");
                self.transition(AuthState::Authenticated { customer });
            }
            Err(error) => {
                warn!(%error, "stored token rejected, signing out");
                self.tokens.clear();
                self.transition(AuthState::Anonymous);
            }
        }

        self.state()
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank input, the API's error when the
    /// login is rejected, or [`StorefrontError::Cancelled`] when the session
    /// was signed out while the request was in flight.
    pub async fn login(&self, email: &str, password: &str) -> Result<Customer> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(StorefrontError::Validation(
                "Email and password are required".into(),
            ));
        }

        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        let ticket = self.begin();
        let outcome = self.backend.login(&request).await;
        self.complete(ticket, outcome)
    }

    /// Registers a new customer and signs them in.
    ///
    /// # Errors
    ///
    /// Same as [`AuthSession::login`].
    pub async fn register(&self, request: RegisterRequest) -> Result<Customer> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(StorefrontError::Validation(
                "Email and password are required".into(),
            ));
        }

        let ticket = self.begin();
        let outcome = self.backend.register(&request).await;
        self.complete(ticket, outcome)
    }

    /// Signs out, dropping the token and any in-flight sign-in.
    pub fn logout(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.tokens.clear();
        self.transition(AuthState::Anonymous);
        info!("session signed out");
    }

    /// Starts password recovery by emailing a one-time code.
    ///
    /// # Errors
    ///
    /// Returns the API's error when the request is rejected.
    pub async fn request_password_reset(&self, email: &str) -> Result<String> {
        let request = PasswordResetRequest {
            email: required(email, "Email is required")?,
            ..PasswordResetRequest::default()
        };

        self.backend.request_password_reset(&request).await
    }

    /// Checks a one-time code sent by [`AuthSession::request_password_reset`].
    ///
    /// # Errors
    ///
    /// Returns the API's error when the code is rejected.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<String> {
        let request = PasswordResetRequest {
            email: required(email, "Email is required")?,
            otp: Some(required(otp, "OTP is required")?),
            new_password: None,
        };

        self.backend.verify_otp(&request).await
    }

    /// Sets a new password using a verified one-time code.
    ///
    /// # Errors
    ///
    /// Returns the API's error when the reset is rejected.
    pub async fn reset_password(&self, email: &str, otp: &str, new_password: &str) -> Result<String> {
        let request = PasswordResetRequest {
            email: required(email, "Email is required")?,
            otp: Some(required(otp, "OTP is required")?),
            new_password: Some(required(new_password, "New password is required")?),
        };

        self.backend.reset_password(&request).await
    }

    fn begin(&self) -> u64 {
        let ticket = self.epoch.load(Ordering::SeqCst);
        self.transition(AuthState::Authenticating);
        ticket
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == ticket
    }

    fn complete(&self, ticket: u64, outcome: Result<AuthResponse>) -> Result<Customer> {
        if !self.is_current(ticket) {
            debug!("discarding sign-in response for a signed-out session");
            return Err(StorefrontError::Cancelled);
        }

        match outcome {
            Ok(AuthResponse { token, customer }) => {
                self.tokens.save(&Credentials::new(customer.id.clone(), token));
                info!(customer_id = %customer.id, "customer signed in");
                self.transition(AuthState::Authenticated {
                    customer: customer.clone(),
                });
                Ok(customer)
            }
            Err(error) => {
                warn!(%error, "sign-in failed");
                self.tokens.clear();
                self.transition(AuthState::Anonymous);
                Err(error)
            }
        }
    }

    fn transition(&self, next: AuthState) {
        self.state.send_replace(next);
    }
}

fn required(value: &str, message: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StorefrontError::Validation(message.into()));
    }

    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use testresult::TestResult;
    use tokio::sync::Notify;

    use super::*;
    use crate::auth::models::MemoryTokenStore;

    #[derive(Default)]
    struct FakeAuth {
        reject_token: bool,
        profile_calls: AtomicUsize,
        hold_login: Option<Arc<Notify>>,
        hold_profile: Option<Arc<Notify>>,
    }

    fn customer(id: &str) -> Customer {
        Customer {
            id: id.into(),
            email: Some("nimal@example.com".into()),
            ..Customer::default()
        }
    }

    #[async_trait]
    impl AuthBackend for FakeAuth {
        async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
            if let Some(gate) = &self.hold_login {
                gate.notified().await;
            }
            if request.password != "correct" {
                return Err(StorefrontError::Unauthorized("Invalid credentials".into()));
            }
            Ok(AuthResponse {
                token: "jwt-1".into(),
                customer: customer("C1"),
            })
        }

        async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
            Ok(AuthResponse {
                token: "jwt-new".into(),
                customer: Customer {
                    id: "C2".into(),
                    email: Some(request.email.clone()),
                    ..Customer::default()
                },
            })
        }

        async fn current_customer(&self, credentials: &Credentials) -> Result<Customer> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.hold_profile {
                gate.notified().await;
            }
            if self.reject_token {
                return Err(StorefrontError::Unauthorized("jwt expired".into()));
            }
            Ok(customer(&credentials.customer_id))
        }

        async fn request_password_reset(&self, _request: &PasswordResetRequest) -> Result<String> {
            Ok("OTP sent".into())
        }

        async fn verify_otp(&self, request: &PasswordResetRequest) -> Result<String> {
            match request.otp.as_deref() {
                Some("123456") => Ok("OTP verified".into()),
                _ => Err(StorefrontError::server(400, "Invalid OTP")),
            }
        }

        async fn reset_password(&self, _request: &PasswordResetRequest) -> Result<String> {
            Ok("Password updated".into())
        }
    }

    fn session(backend: FakeAuth) -> (AuthSession, Arc<MemoryTokenStore>) {
        let tokens = Arc::new(MemoryTokenStore::default());
        (AuthSession::new(Arc::new(backend), tokens.clone()), tokens)
    }

    #[tokio::test]
    async fn login_authenticates_and_stores_token() -> TestResult {
        let (auth, tokens) = session(FakeAuth::default());

        let customer = auth.login("nimal@example.com", "correct").await?;

        assert_eq!(customer.id, "C1");
        assert!(auth.is_authenticated());
        assert_eq!(auth.credentials()?, Credentials::new("C1", "jwt-1"));
        assert!(tokens.load().is_some());

        Ok(())
    }

    #[tokio::test]
    async fn rejected_login_returns_to_anonymous() {
        let (auth, tokens) = session(FakeAuth::default());

        let result = auth.login("nimal@example.com", "wrong").await;

        assert_eq!(result, Err(StorefrontError::Unauthorized("Invalid credentials".into())));
        assert_eq!(auth.state(), AuthState::Anonymous);
        assert!(tokens.load().is_none());
    }

    #[tokio::test]
    async fn failed_login_drops_the_previous_token() -> TestResult {
        let (auth, tokens) = session(FakeAuth::default());
        auth.login("nimal@example.com", "correct").await?;

        let result = auth.login("nimal@example.com", "wrong").await;

        assert!(result.is_err());
        assert!(tokens.load().is_none());
        assert_eq!(auth.restore().await, AuthState::Anonymous);
        assert!(auth.credentials().is_err());

        Ok(())
    }

    #[tokio::test]
    async fn blank_credentials_never_reach_the_api() {
        let (auth, _) = session(FakeAuth::default());

        let result = auth.login("  ", "correct").await;

        assert!(matches!(result, Err(StorefrontError::Validation(_))));
        assert_eq!(auth.state(), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn anonymous_sessions_have_no_credentials() {
        let (auth, _) = session(FakeAuth::default());

        assert_eq!(
            auth.credentials().map_err(|e| e.kind()),
            Err(crate::error::ErrorKind::Auth)
        );
    }

    #[tokio::test]
    async fn restore_without_token_skips_the_api() {
        let backend = Arc::new(FakeAuth::default());
        let auth = AuthSession::new(backend.clone(), Arc::new(MemoryTokenStore::default()));

        assert_eq!(auth.restore().await, AuthState::Anonymous);
        assert_eq!(backend.profile_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn restore_with_valid_token_authenticates() {
        let (auth, tokens) = session(FakeAuth::default());
        tokens.save(&Credentials::new("C9", "jwt-9"));

        let state = auth.restore().await;

        assert_eq!(state.customer().map(|c| c.id.as_str()), Some("C9"));
    }

    #[tokio::test]
    async fn restore_with_rejected_token_clears_it() {
        let (auth, tokens) = session(FakeAuth {
            reject_token: true,
            ..FakeAuth::default()
        });
        tokens.save(&Credentials::new("C9", "stale"));

        assert_eq!(auth.restore().await, AuthState::Anonymous);
        assert!(tokens.load().is_none());
    }

    #[tokio::test]
    async fn credentials_stay_usable_while_the_token_is_checked() -> TestResult {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(FakeAuth {
            hold_profile: Some(gate.clone()),
            ..FakeAuth::default()
        });
        let auth = Arc::new(AuthSession::new(backend.clone(), Arc::new(MemoryTokenStore::default())));
        auth.login("nimal@example.com", "correct").await?;

        let pending = tokio::spawn({
            let auth = auth.clone();
            async move { auth.restore().await }
        });
        while backend.profile_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(auth.credentials()?, Credentials::new("C1", "jwt-1"));
        assert!(auth.is_authenticated());

        gate.notify_one();
        let restored = pending.await?;
        assert_eq!(restored.customer().map(|c| c.id.as_str()), Some("C1"));

        Ok(())
    }

    #[tokio::test]
    async fn logout_discards_an_in_flight_login() -> TestResult {
        let gate = Arc::new(Notify::new());
        let (auth, tokens) = session(FakeAuth {
            hold_login: Some(gate.clone()),
            ..FakeAuth::default()
        });
        let auth = Arc::new(auth);

        let pending = tokio::spawn({
            let auth = auth.clone();
            async move { auth.login("nimal@example.com", "correct").await }
        });

        let mut states = auth.subscribe();
        states
            .wait_for(|state| *state == AuthState::Authenticating)
            .await?;

        auth.logout();
        gate.notify_one();

        assert_eq!(pending.await?, Err(StorefrontError::Cancelled));
        assert_eq!(auth.state(), AuthState::Anonymous);
        assert!(tokens.load().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn register_signs_the_new_customer_in() -> TestResult {
        let (auth, _) = session(FakeAuth::default());

        let customer = auth
            .register(RegisterRequest {
                first_name: "Kamala".into(),
                last_name: "Perera".into(),
                email: "kamala@example.com".into(),
                password: "s3cret".into(),
                phone: None,
            })
            .await?;

        assert_eq!(customer.id, "C2");
        assert!(auth.is_authenticated());

        Ok(())
    }

    #[tokio::test]
    async fn password_recovery_validates_and_forwards() -> TestResult {
        let (auth, _) = session(FakeAuth::default());

        assert_eq!(auth.request_password_reset("a@b.lk").await?, "OTP sent");
        assert_eq!(auth.verify_otp("a@b.lk", "123456").await?, "OTP verified");
        assert_eq!(
            auth.verify_otp("a@b.lk", "000000").await,
            Err(StorefrontError::server(400, "Invalid OTP"))
        );
        assert!(matches!(
            auth.reset_password("a@b.lk", "123456", "").await,
            Err(StorefrontError::Validation(_))
        ));

        Ok(())
    }
}
