//! Demo endpoints.

use axum::extract::{Query, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use tablecat_domain::{AuthMethod, GetDateResponse, ListTablesResponse};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

const LIMIT_MIN: i64 = 1;
const LIMIT_MAX: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct ListTablesParams {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    1
}

/// `GET /api/v1/demo/name/` — return a list of tables.
///
/// Admin-gated for bearer users; basic-auth users are trusted inner
/// services and skip the role check.
pub async fn list_tables(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<ListTablesParams>,
) -> Result<Json<ListTablesResponse>, ApiError> {
    if !(LIMIT_MIN..=LIMIT_MAX).contains(&params.limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between {LIMIT_MIN} and {LIMIT_MAX}"
        )));
    }

    if let Some(user) = &user {
        if user.method == AuthMethod::Bearer && !state.directory.user_has_admin_role(&user.user_id)
        {
            return Err(ApiError::Forbidden(format!(
                "User {} does not have admin permissions",
                user.display_name
            )));
        }
    }

    let tables = state.service.list_tables(user.as_ref(), params.limit).await?;
    Ok(Json(ListTablesResponse { tables }))
}

/// `GET /api/v1/demo/date/` — return the current date.
pub async fn get_date() -> Json<GetDateResponse> {
    Json(GetDateResponse { date: Utc::now() })
}

/// `GET /api/v1/demo/error/` — return an error, deliberately.
pub async fn get_error() -> ApiError {
    ApiError::NotImplemented
}
