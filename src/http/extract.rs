//! Bearer-token extractors.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Redirect, Response},
};

use crate::access::{self, Access};
use crate::auth::Identity;
use crate::domain::aggregates::Role;
use crate::{Storefront, StorefrontError};

/// Any signed-in caller.
pub struct Shopper(pub Identity);

#[async_trait]
impl FromRequestParts<Storefront> for Shopper {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, app: &Storefront) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StorefrontError::NotAuthenticated)?;
        Ok(Self(app.auth().verify(token.trim())?))
    }
}

/// Caller whose profile carries the admin role. Everyone else is sent to
/// their landing route.
pub struct AdminUser(pub Identity);

#[async_trait]
impl FromRequestParts<Storefront> for AdminUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, app: &Storefront) -> Result<Self, Self::Rejection> {
        let Shopper(identity) = Shopper::from_request_parts(parts, app).await.map_err(IntoResponse::into_response)?;
        let role = app.request_accounts().role_of(&identity.uid).await.map_err(IntoResponse::into_response)?;
        match access::guard(role, Some(Role::Admin)) {
            Access::Granted => Ok(Self(identity)),
            Access::Redirect(to) => {
                tracing::debug!(uid = %identity.uid, to, "admin route refused");
                Err(Redirect::to(to).into_response())
            }
        }
    }
}
