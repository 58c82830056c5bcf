//! Shopping Cart State Management
//!
//! `CartStore` keeps the signed-in customer's cart lines. Every mutation is a
//! round trip to the cart API followed by a full replacement of the local
//! lines with what the server reports; quantities and prices are never edited
//! locally.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::helpers::{normalize_cart, with_stock_hint};
use super::models::CartLine;
use crate::api::models::ServerCartItem;
use crate::api::CartBackend;
use crate::auth::models::Credentials;
use crate::error::{Result, StorefrontError};

// =============================================================================
// State and Reducer
// =============================================================================

/// Snapshot observed by subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartState {
    pub items: Vec<CartLine>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Named transitions of [`CartState`].
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    /// A request is in flight.
    Started,
    /// The server returned the full cart.
    Replaced(Vec<CartLine>),
    /// The server confirmed the cart is empty.
    Emptied,
    /// The request failed; the last known lines stay.
    Failed(String),
    /// In-flight requests were abandoned.
    Cancelled,
    /// The owner changed; forget everything.
    Reset,
}

impl CartState {
    /// Applies one transition.
    pub fn reduce(&mut self, action: CartAction) {
        match action {
            CartAction::Started => {
                self.loading = true;
                self.error = None;
            }
            CartAction::Replaced(items) => {
                self.items = items;
                self.loading = false;
                self.error = None;
            }
            CartAction::Emptied => {
                self.items.clear();
                self.loading = false;
                self.error = None;
            }
            CartAction::Failed(message) => {
                self.loading = false;
                self.error = Some(message);
            }
            CartAction::Cancelled => self.loading = false,
            CartAction::Reset => *self = Self::default(),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Server-authoritative cart for one customer session.
///
/// Only one mutation is expected in flight at a time. Responses that arrive
/// after [`CartStore::cancel_pending`] or [`CartStore::reset`] are dropped and
/// reported as [`StorefrontError::Cancelled`].
pub struct CartStore {
    backend: Arc<dyn CartBackend>,
    state: watch::Sender<CartState>,
    epoch: AtomicU64,
}

impl CartStore {
    pub fn new(backend: Arc<dyn CartBackend>) -> Self {
        let (state, _) = watch::channel(CartState::default());

        Self {
            backend,
            state,
            epoch: AtomicU64::new(0),
        }
    }

    /// Receives every state change.
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> CartState {
        self.state.borrow().clone()
    }

    /// Last known lines.
    pub fn items(&self) -> Vec<CartLine> {
        self.state.borrow().items.clone()
    }

    /// Replaces the lines with the server's cart.
    ///
    /// On failure the last known lines are kept and the error is recorded.
    ///
    /// # Errors
    ///
    /// Returns the API error, or [`StorefrontError::Cancelled`] for a
    /// superseded response.
    pub async fn fetch(&self, credentials: &Credentials) -> Result<Vec<CartLine>> {
        let ticket = self.begin();
        let outcome = self.backend.fetch_cart(credentials).await;

        self.settle(ticket, outcome.map(Some), credentials, "fetch")
            .await?;
        Ok(self.items())
    }

    /// Adds `qty` units of a variation.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero quantity, otherwise the API's
    /// error with the server message preserved.
    pub async fn add(&self, credentials: &Credentials, variation_id: &str, qty: u32) -> Result<()> {
        if qty == 0 {
            return Err(StorefrontError::Validation(
                "Quantity must be at least 1".into(),
            ));
        }

        let ticket = self.begin();
        let outcome = self.backend.add_item(credentials, variation_id, qty).await;

        self.settle(ticket, outcome, credentials, "add").await?;
        info!(customer_id = %credentials.customer_id, variation_id, qty, "added to cart");
        Ok(())
    }

    /// Sets a line's quantity.
    ///
    /// Quantities below 1 are ignored without contacting the API; quantities
    /// that do not fit a `u32` are rejected. When the
    /// API reports how much stock is left, the hint is appended to the error
    /// message.
    ///
    /// # Errors
    ///
    /// Returns the API's error or [`StorefrontError::Cancelled`].
    pub async fn update_quantity(&self, credentials: &Credentials, variation_id: &str, qty: i64) -> Result<()> {
        if qty < 1 {
            debug!(variation_id, qty, "ignoring quantity below 1");
            return Ok(());
        }
        let qty = u32::try_from(qty).map_err(|_| StorefrontError::Validation("Quantity is too large".into()))?;

        let ticket = self.begin();
        let outcome = self
            .backend
            .update_item(credentials, variation_id, qty)
            .await
            .map_err(with_stock_hint);

        self.settle(ticket, outcome, credentials, "update").await
    }

    /// Removes a line.
    ///
    /// # Errors
    ///
    /// Returns the API's error or [`StorefrontError::Cancelled`].
    pub async fn remove(&self, credentials: &Credentials, variation_id: &str) -> Result<()> {
        let ticket = self.begin();
        let outcome = self.backend.remove_item(credentials, variation_id).await;

        self.settle(ticket, outcome, credentials, "remove").await
    }

    /// Empties the cart.
    ///
    /// # Errors
    ///
    /// Returns the API's error or [`StorefrontError::Cancelled`].
    pub async fn clear(&self, credentials: &Credentials) -> Result<()> {
        let ticket = self.begin();
        let outcome = self.backend.clear_cart(credentials).await;

        if !self.is_current(ticket) {
            return Err(StorefrontError::Cancelled);
        }

        match outcome {
            Ok(()) => {
                self.dispatch(CartAction::Emptied);
                Ok(())
            }
            Err(error) => Err(self.fail("clear", error)),
        }
    }

    /// Abandons in-flight requests; their responses will be discarded.
    pub fn cancel_pending(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.dispatch(CartAction::Cancelled);
    }

    /// Abandons in-flight requests and forgets the lines, e.g. on sign-out.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.dispatch(CartAction::Reset);
    }

    fn begin(&self) -> u64 {
        let ticket = self.epoch.load(Ordering::SeqCst);
        self.dispatch(CartAction::Started);
        ticket
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == ticket
    }

    fn dispatch(&self, action: CartAction) {
        self.state.send_modify(|state| state.reduce(action));
    }

    fn fail(&self, operation: &str, error: StorefrontError) -> StorefrontError {
        warn!(operation, %error, "cart request failed");
        self.dispatch(CartAction::Failed(error.to_string()));
        error
    }

    /// Applies a mutation's outcome. Acknowledgements without a cart body
    /// trigger a re-fetch so the lines still come from the server.
    async fn settle(
        &self,
        ticket: u64,
        outcome: Result<Option<Vec<ServerCartItem>>>,
        credentials: &Credentials,
        operation: &str,
    ) -> Result<()> {
        let outcome = match outcome {
            Ok(None) if self.is_current(ticket) => self.backend.fetch_cart(credentials).await,
            Ok(Some(items)) => Ok(items),
            Ok(None) => return Err(StorefrontError::Cancelled),
            Err(error) => Err(error),
        };

        if !self.is_current(ticket) {
            debug!(operation, "discarding superseded cart response");
            return Err(StorefrontError::Cancelled);
        }

        match outcome {
            Ok(items) => {
                self.dispatch(CartAction::Replaced(normalize_cart(items)));
                Ok(())
            }
            Err(error) => Err(self.fail(operation, error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use testresult::TestResult;
    use tokio::sync::Notify;

    use super::*;

    /// In-memory cart API recording how often it was called.
    #[derive(Default)]
    struct FakeCart {
        lines: Mutex<Vec<ServerCartItem>>,
        calls: AtomicUsize,
        failure: Mutex<Option<StorefrontError>>,
        acknowledge_only: bool,
        hold_fetch: Option<Arc<Notify>>,
    }

    impl FakeCart {
        fn with_line(variation_id: &str, qty: u32) -> Self {
            let fake = Self::default();
            fake.put(variation_id, qty);
            fake
        }

        fn put(&self, variation_id: &str, qty: u32) {
            let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
            lines.retain(|line| line.variation_id != variation_id);
            lines.push(ServerCartItem {
                variation_id: variation_id.into(),
                product_id: "P1".into(),
                name: "Linen Shirt".into(),
                cart_qty: qty,
                selling_price: Some(8990.0.into()),
                net_amount: Some((8091.0 * f64::from(qty)).into()),
                market_price: Some(12000.0.into()),
                available_stock: 5,
                ..ServerCartItem::default()
            });
        }

        fn fail_next(&self, error: StorefrontError) {
            *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
        }

        fn call(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failure.lock().unwrap_or_else(|e| e.into_inner()).take() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }

        fn current(&self) -> Vec<ServerCartItem> {
            self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }

        fn reply(&self) -> Option<Vec<ServerCartItem>> {
            (!self.acknowledge_only).then(|| self.current())
        }
    }

    #[async_trait]
    impl CartBackend for FakeCart {
        async fn fetch_cart(&self, _credentials: &Credentials) -> Result<Vec<ServerCartItem>> {
            if let Some(gate) = &self.hold_fetch {
                gate.notified().await;
            }
            self.call()?;
            Ok(self.current())
        }

        async fn add_item(&self, _c: &Credentials, variation_id: &str, qty: u32) -> Result<Option<Vec<ServerCartItem>>> {
            self.call()?;
            self.put(variation_id, qty);
            Ok(self.reply())
        }

        async fn update_item(&self, _c: &Credentials, variation_id: &str, qty: u32) -> Result<Option<Vec<ServerCartItem>>> {
            self.call()?;
            self.put(variation_id, qty);
            Ok(self.reply())
        }

        async fn remove_item(&self, _c: &Credentials, variation_id: &str) -> Result<Option<Vec<ServerCartItem>>> {
            self.call()?;
            self.lines
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|line| line.variation_id != variation_id);
            Ok(self.reply())
        }

        async fn clear_cart(&self, _c: &Credentials) -> Result<()> {
            self.call()?;
            self.lines.lock().unwrap_or_else(|e| e.into_inner()).clear();
            Ok(())
        }
    }

    fn credentials() -> Credentials {
        Credentials::new("C1", "jwt")
    }

    #[test]
    fn reducer_keeps_items_on_failure() {
        let mut state = CartState::default();
        state.reduce(CartAction::Started);
        assert!(state.loading);

        state.reduce(CartAction::Failed("offline".into()));
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("offline"));
        assert!(state.items.is_empty());

        state.reduce(CartAction::Started);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn fetch_replaces_items_with_server_cart() -> TestResult {
        let store = CartStore::new(Arc::new(FakeCart::with_line("V1", 2)));

        let items = store.fetch(&credentials()).await?;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price, 8091.0);
        assert!(!store.snapshot().loading);

        Ok(())
    }

    #[tokio::test]
    async fn failed_fetch_keeps_last_known_items() -> TestResult {
        let backend = Arc::new(FakeCart::with_line("V1", 2));
        let store = CartStore::new(backend.clone());
        store.fetch(&credentials()).await?;

        backend.fail_next(StorefrontError::Network("connection refused".into()));
        let result = store.fetch(&credentials()).await;

        assert!(matches!(result, Err(StorefrontError::Network(_))));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.error.as_deref(), Some("network error: connection refused"));

        Ok(())
    }

    #[tokio::test]
    async fn add_replaces_items_from_response() -> TestResult {
        let store = CartStore::new(Arc::new(FakeCart::default()));

        store.add(&credentials(), "V7", 3).await?;

        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].variation_id, "V7");
        assert_eq!(items[0].quantity, 3);

        Ok(())
    }

    #[tokio::test]
    async fn acknowledgement_only_responses_trigger_a_refetch() -> TestResult {
        let backend = Arc::new(FakeCart {
            acknowledge_only: true,
            ..FakeCart::default()
        });
        let store = CartStore::new(backend.clone());

        store.add(&credentials(), "V7", 1).await?;

        assert_eq!(store.items().len(), 1);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);

        Ok(())
    }

    #[tokio::test]
    async fn failed_add_surfaces_server_message_and_keeps_items() -> TestResult {
        let backend = Arc::new(FakeCart::with_line("V1", 1));
        let store = CartStore::new(backend.clone());
        store.fetch(&credentials()).await?;

        backend.fail_next(StorefrontError::server(409, "Out of stock"));
        let result = store.add(&credentials(), "V2", 1).await;

        assert_eq!(result.map_err(|e| e.to_string()), Err("Out of stock".to_string()));
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.snapshot().error.as_deref(), Some("Out of stock"));

        Ok(())
    }

    #[tokio::test]
    async fn quantities_below_one_send_nothing() -> TestResult {
        let backend = Arc::new(FakeCart::with_line("V1", 2));
        let store = CartStore::new(backend.clone());

        store.update_quantity(&credentials(), "V1", 0).await?;
        store.update_quantity(&credentials(), "V1", -1).await?;

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.snapshot(), CartState::default());

        Ok(())
    }

    #[tokio::test]
    async fn oversized_quantities_are_rejected() {
        let backend = Arc::new(FakeCart::with_line("V1", 2));
        let store = CartStore::new(backend.clone());

        let result = store.update_quantity(&credentials(), "V1", i64::from(u32::MAX) + 1).await;

        assert_eq!(result, Err(StorefrontError::Validation("Quantity is too large".into())));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn update_failure_carries_stock_hint() {
        let backend = Arc::new(FakeCart::with_line("V1", 2));
        let store = CartStore::new(backend.clone());
        backend.fail_next(StorefrontError::Server {
            status: 400,
            message: "Insufficient stock".into(),
            available_quantity: Some(4),
        });

        let result = store.update_quantity(&credentials(), "V1", 9).await;

        assert_eq!(
            result.map_err(|e| e.to_string()),
            Err("Insufficient stock (available: 4)".to_string())
        );
        assert_eq!(
            store.snapshot().error.as_deref(),
            Some("Insufficient stock (available: 4)")
        );
    }

    #[tokio::test]
    async fn update_and_remove_follow_the_server() -> TestResult {
        let backend = Arc::new(FakeCart::with_line("V1", 2));
        let store = CartStore::new(backend.clone());

        store.update_quantity(&credentials(), "V1", 4).await?;
        assert_eq!(store.items()[0].quantity, 4);

        store.remove(&credentials(), "V1").await?;
        assert!(store.items().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn clear_empties_the_cart() -> TestResult {
        let store = CartStore::new(Arc::new(FakeCart::with_line("V1", 2)));
        store.fetch(&credentials()).await?;

        store.clear(&credentials()).await?;

        assert!(store.items().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn zero_quantity_add_is_rejected_locally() {
        let backend = Arc::new(FakeCart::default());
        let store = CartStore::new(backend.clone());

        let result = store.add(&credentials(), "V1", 0).await;

        assert!(matches!(result, Err(StorefrontError::Validation(_))));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_fetch_response_is_discarded() -> TestResult {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(FakeCart {
            hold_fetch: Some(gate.clone()),
            ..FakeCart::with_line("V1", 2)
        });
        let store = Arc::new(CartStore::new(backend));

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.fetch(&credentials()).await }
        });

        store.subscribe().wait_for(|state| state.loading).await?;
        store.cancel_pending();
        gate.notify_one();

        assert_eq!(pending.await?, Err(StorefrontError::Cancelled));
        assert!(store.items().is_empty());
        assert!(!store.snapshot().loading);

        Ok(())
    }

    #[tokio::test]
    async fn subscribers_see_the_replacement() -> TestResult {
        let store = CartStore::new(Arc::new(FakeCart::with_line("V1", 1)));
        let mut updates = store.subscribe();

        store.fetch(&credentials()).await?;

        assert!(updates.has_changed()?);
        assert_eq!(updates.borrow_and_update().items.len(), 1);

        Ok(())
    }
}
