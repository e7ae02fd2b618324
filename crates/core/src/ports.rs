//! Infrastructure ports.

use async_trait::async_trait;
use tablecat_domain::{Result, Table};

/// Port for reading the table catalog of the configured database.
#[async_trait]
pub trait TableCatalog: Send + Sync {
    /// List up to `limit` tables from the catalog, in catalog order.
    async fn list_tables(&self, limit: i64) -> Result<Vec<Table>>;

    /// Release the underlying database session, if any.
    async fn disconnect(&self);
}

/// Port for role and permission lookups.
///
/// The production implementation would query an identity provider; the
/// shipped implementation serves mocked data (see
/// `tablecat-infra::directory`).
pub trait Directory: Send + Sync {
    /// Roles assigned to the user. Empty for an unknown user id.
    fn user_roles(&self, user_id: &str) -> Vec<String>;

    /// Whether the user holds the admin role.
    fn user_has_admin_role(&self, user_id: &str) -> bool {
        self.user_roles(user_id).iter().any(|role| role == "admin")
    }

    /// Whether the user may execute the given operation.
    fn user_has_permission(&self, user_id: &str, operation_id: &str) -> bool;
}
