//! Auth Domain Models

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::pricing::helpers::deserialize_id;

/// The signed-in customer's profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(alias = "Customer_ID", alias = "customerId", alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(alias = "First_Name", alias = "first_name", default)]
    pub first_name: Option<String>,

    #[serde(alias = "Last_Name", alias = "last_name", default)]
    pub last_name: Option<String>,

    #[serde(alias = "Email", default)]
    pub email: Option<String>,

    #[serde(alias = "Phone", alias = "phone_number", default)]
    pub phone: Option<String>,
}

/// Bearer token plus the customer it belongs to.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub customer_id: String,
    pub token: String,
}

impl Credentials {
    pub fn new(customer_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("customer_id", &self.customer_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Where a session is in the sign-in lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated { customer: Customer },
}

impl AuthState {
    /// The signed-in customer, if any.
    pub fn customer(&self) -> Option<&Customer> {
        match self {
            Self::Authenticated { customer } => Some(customer),
            Self::Anonymous | Self::Authenticating => None,
        }
    }
}

/// Persistence for the session's bearer token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<Credentials>;
    fn save(&self, credentials: &Credentials);
    fn clear(&self);
}

/// Token storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<Credentials>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<Credentials> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn save(&self, credentials: &Credentials) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(credentials.clone());
    }

    fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn credentials_debug_hides_the_token() {
        let credentials = Credentials::new("C1", "secret-jwt");

        let debug = format!("{credentials:?}");

        assert!(debug.contains("C1"));
        assert!(!debug.contains("secret-jwt"));
    }

    #[test]
    fn customer_accepts_numeric_ids() -> TestResult {
        let customer: Customer =
            serde_json::from_value(json!({ "Customer_ID": 17, "First_Name": "Nimal" }))?;

        assert_eq!(customer.id, "17");
        assert_eq!(customer.first_name.as_deref(), Some("Nimal"));

        Ok(())
    }

    #[test]
    fn auth_state_serialises_with_status_tag() -> TestResult {
        let state = AuthState::Authenticated {
            customer: Customer {
                id: "C1".into(),
                ..Customer::default()
            },
        };

        let value = serde_json::to_value(&state)?;

        assert_eq!(value["status"], "authenticated");
        assert_eq!(value["customer"]["id"], "C1");

        Ok(())
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryTokenStore::default();
        store.save(&Credentials::new("C1", "t"));
        assert_eq!(store.load().map(|c| c.customer_id), Some("C1".to_string()));

        store.clear();
        assert!(store.load().is_none());
    }
}
