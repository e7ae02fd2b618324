//! Mocked directory adapter.
//!
//! Stands in for the identity-provider lookups of the real deployment.
//! Every known user gets the full role set and every permission; the port
//! boundary is what matters here, not the data.

use tablecat_core::Directory;

/// Directory serving fixed data.
// TODO: replace with a client for the real identity provider once its API
// is available.
#[derive(Debug, Default, Clone)]
pub struct StaticDirectory;

impl Directory for StaticDirectory {
    fn user_roles(&self, user_id: &str) -> Vec<String> {
        if user_id.is_empty() {
            return Vec::new();
        }
        vec!["admin".to_string(), "user".to_string()]
    }

    fn user_has_permission(&self, user_id: &str, operation_id: &str) -> bool {
        !user_id.is_empty() && !operation_id.is_empty()
    }
}
