//! Catalog use cases.

use std::sync::Arc;

use tablecat_domain::{AuthContext, Result, Table, TablecatError};
use tracing::{info, warn};

use crate::ports::{Directory, TableCatalog};

const OPERATION_LIST_TABLES: &str = "ListTables";

/// Service in front of the table catalog: applies the permission check and
/// normalizes inputs before delegating to the port.
pub struct CatalogService {
    catalog: Arc<dyn TableCatalog>,
    directory: Arc<dyn Directory>,
    /// Whether any authentication scheme is enabled. When false, anonymous
    /// requests are allowed through (local development mode).
    auth_enforced: bool,
}

impl CatalogService {
    pub fn new(
        catalog: Arc<dyn TableCatalog>,
        directory: Arc<dyn Directory>,
        auth_enforced: bool,
    ) -> Self {
        Self { catalog, directory, auth_enforced }
    }

    /// List tables on behalf of `user`.
    ///
    /// A non-positive limit is floored to 1 rather than rejected; the HTTP
    /// layer already validates the declared range.
    pub async fn list_tables(&self, user: Option<&AuthContext>, limit: i64) -> Result<Vec<Table>> {
        self.check_permissions(user, OPERATION_LIST_TABLES)?;

        let limit = if limit > 0 { limit } else { 1 };
        let tables = self.catalog.list_tables(limit).await?;

        info!(count = tables.len(), "list tables");
        Ok(tables)
    }

    fn check_permissions(&self, user: Option<&AuthContext>, operation_id: &str) -> Result<()> {
        let Some(user) = user else {
            if self.auth_enforced {
                return Err(TablecatError::Auth("user is not authenticated".to_string()));
            }
            // Debug mode: no user is authenticated and auth is disabled.
            return Ok(());
        };

        if self.directory.user_has_permission(&user.user_id, operation_id) {
            return Ok(());
        }

        warn!(user = %user.display_name, operation_id, "permission denied");
        Err(TablecatError::PermissionDenied(format!(
            "user {} does not have enough permissions for the operation {}",
            user.display_name, operation_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tablecat_domain::AuthMethod;

    use super::*;

    struct FixedCatalog;

    #[async_trait]
    impl TableCatalog for FixedCatalog {
        async fn list_tables(&self, limit: i64) -> Result<Vec<Table>> {
            Ok((0..limit).map(|i| Table::new(i, format!("table{i}"))).collect())
        }

        async fn disconnect(&self) {}
    }

    struct DenyList(Vec<String>);

    impl Directory for DenyList {
        fn user_roles(&self, _user_id: &str) -> Vec<String> {
            vec!["admin".to_string(), "user".to_string()]
        }

        fn user_has_permission(&self, user_id: &str, _operation_id: &str) -> bool {
            !self.0.iter().any(|denied| denied == user_id)
        }
    }

    fn user(id: &str) -> AuthContext {
        AuthContext {
            user_id: id.to_string(),
            display_name: format!("{id}@example.com"),
            method: AuthMethod::Bearer,
        }
    }

    fn service(denied: Vec<String>, auth_enforced: bool) -> CatalogService {
        CatalogService::new(Arc::new(FixedCatalog), Arc::new(DenyList(denied)), auth_enforced)
    }

    #[tokio::test]
    async fn anonymous_allowed_when_auth_disabled() {
        let tables = service(vec![], false).list_tables(None, 3).await.unwrap();
        assert_eq!(tables.len(), 3);
    }

    #[tokio::test]
    async fn anonymous_rejected_when_auth_enforced() {
        let result = service(vec![], true).list_tables(None, 3).await;
        assert!(matches!(result, Err(TablecatError::Auth(_))));
    }

    #[tokio::test]
    async fn denied_user_gets_permission_error() {
        let result =
            service(vec!["blocked".to_string()], true).list_tables(Some(&user("blocked")), 3).await;
        assert!(matches!(result, Err(TablecatError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn non_positive_limit_is_floored_to_one() {
        let tables = service(vec![], false).list_tables(None, 0).await.unwrap();
        assert_eq!(tables.len(), 1);

        let tables = service(vec![], false).list_tables(None, -5).await.unwrap();
        assert_eq!(tables.len(), 1);
    }
}
