// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    middleware::auth::AuthenticatedAccount,
    models::account::{Account, Role},
    services::access_policy::provisioned_role,
};

/// A set of roles allowed through a route.
pub trait RoleGate: Send + Sync + 'static {
    fn allows(role: Role) -> bool;
    fn description() -> &'static str;
}

/// Roles that manage accounts, i.e. those the provisioning table lets create one.
pub struct AdminGate;

impl RoleGate for AdminGate {
    fn allows(role: Role) -> bool {
        provisioned_role(role).is_some()
    }

    fn description() -> &'static str {
        "Admin access required"
    }
}

/// Extractor that rejects callers whose role the gate does not allow.
/// Must run behind `auth_guard`.
pub struct RequireRole<G>(pub AuthenticatedAccount, PhantomData<G>);

impl<G> RequireRole<G> {
    pub fn into_account(self) -> Account {
        (self.0).0
    }
}

impl<G, S> FromRequestParts<S> for RequireRole<G>
where
    G: RoleGate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let caller = AuthenticatedAccount::from_request_parts(parts, state).await?;

        if !G::allows(caller.0.role) {
            return Err(AppError::forbidden(G::description()));
        }
        Ok(RequireRole(caller, PhantomData))
    }
}
