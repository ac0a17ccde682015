//! Role flags for the signed-in user.

use axum::{Json, extract::State};
use serde::Serialize;

use ahmed_mart_core::access::{Role, RoleFlags};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::access::AccessService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub signed_in_as: Role,
    #[serde(flatten)]
    pub flags: RoleFlags,
}

/// Roles the signed-in user currently holds.
pub async fn roles(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<RolesResponse>> {
    let flags = AccessService::new(state.pool())
        .resolve_roles(&user)
        .await?;
    Ok(Json(RolesResponse {
        signed_in_as: user.signed_in_as,
        flags,
    }))
}
