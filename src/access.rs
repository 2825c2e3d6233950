//! Role checks and customer-scoped listing.
//!
//! The role directory stands in for the host identity system; the listing
//! passthrough narrows what non-administrators can see to the one customer
//! their email is linked to.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::Reading;
use crate::error::LedgerError;
use crate::store::{ConsumptionStore, ReadingQuery};

/// Role granting read access to consumption data.
pub const CUSTOMER_ROLE: &str = "Customer";

/// Directory of user role assignments.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn user_has_role(&self, user: &str, role: &str) -> Result<bool, LedgerError>;
    /// Distinct users holding the role, sorted.
    async fn users_with_role(&self, role: &str) -> Result<Vec<String>, LedgerError>;
}

/// In-memory role directory.
#[derive(Default)]
pub struct MemoryRoleDirectory {
    // user -> roles
    inner: RwLock<HashMap<String, HashSet<String>>>,
}

impl MemoryRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn assign(&self, user: &str, role: &str) {
        let mut map = self.inner.write().await;
        map.entry(user.to_string())
            .or_default()
            .insert(role.to_string());
    }
}

#[async_trait]
impl RoleDirectory for MemoryRoleDirectory {
    async fn user_has_role(&self, user: &str, role: &str) -> Result<bool, LedgerError> {
        let map = self.inner.read().await;
        Ok(map.get(user).map_or(false, |roles| roles.contains(role)))
    }

    async fn users_with_role(&self, role: &str) -> Result<Vec<String>, LedgerError> {
        let map = self.inner.read().await;
        let mut users: Vec<String> = map
            .iter()
            .filter(|(_, roles)| roles.contains(role))
            .map(|(user, _)| user.clone())
            .collect();
        users.sort();
        Ok(users)
    }
}

/// The identity a listing runs as.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: String,
    pub is_administrator: bool,
}

impl Caller {
    pub fn administrator() -> Self {
        Self {
            user: "Administrator".to_string(),
            is_administrator: true,
        }
    }

    pub fn user(email: &str) -> Self {
        Self {
            user: email.to_string(),
            is_administrator: false,
        }
    }
}

pub struct AccessControl {
    store: Arc<dyn ConsumptionStore>,
    roles: Arc<dyn RoleDirectory>,
}

impl AccessControl {
    pub fn new(store: Arc<dyn ConsumptionStore>, roles: Arc<dyn RoleDirectory>) -> Self {
        Self { store, roles }
    }

    /// Whether the user holds the Customer role.
    pub async fn check_customer_role(&self, email: &str) -> Result<bool, LedgerError> {
        self.roles.user_has_role(email, CUSTOMER_ROLE).await
    }

    /// All users holding the Customer role.
    pub async fn customer_users(&self) -> Result<Vec<String>, LedgerError> {
        self.roles.users_with_role(CUSTOMER_ROLE).await
    }

    /// List submitted readings as the caller.
    ///
    /// Administrators see whatever the query asks for. Anyone else has the
    /// customer filter forced to their linked customer; without a link they
    /// see nothing, whatever the query said.
    pub async fn list_readings(
        &self,
        caller: &Caller,
        mut query: ReadingQuery,
    ) -> Result<Vec<Reading>, LedgerError> {
        if !caller.is_administrator {
            match self.store.customer_for_user(&caller.user).await? {
                Some(customer) => {
                    debug!(user = %caller.user, customer = %customer, "scoped listing");
                    query.customer = Some(customer);
                }
                None => {
                    debug!(user = %caller.user, "listing for unlinked user");
                    return Ok(Vec::new());
                }
            }
        }
        self.store.submitted_readings(query).await
    }
}
