//! Axum extractors for authentication and authorization.
//!
//! Every extractor reads the bearer token from the `Authorization` header and
//! resolves it through the [`SharedAuthenticator`] found in router state.
//!
//! # Usage
//!
//! ```ignore
//! use prospect_axum::{MaybeAuth, RequireAuth};
//!
//! // Requires authentication (401 if not authenticated)
//! async fn me(auth: RequireAuth) -> String {
//!     format!("Hello, {}!", auth.username)
//! }
//!
//! // Optional authentication
//! async fn greet(auth: MaybeAuth) -> String {
//!     match auth.0 {
//!         Some(principal) => format!("Hello, {}!", principal.username),
//!         None => "Hello, guest!".to_string(),
//!     }
//! }
//! ```

use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use prospect_auth_core::{AuthorizationGate, Authenticator, Principal};
use prospect_types::PermissionCode;

use crate::error::AuthRejection;

/// Authenticator handle the extractors pull out of router state
pub type SharedAuthenticator = Arc<dyn Authenticator>;

/// Extract the bearer token from the `Authorization` header
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthRejection> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| AuthRejection::InvalidHeader)?;
    match value.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(Some(token)),
        _ => Err(AuthRejection::InvalidHeader),
    }
}

/// Extractor that requires a valid access token.
///
/// Returns 401 when the header is missing or the token does not verify, and
/// when the account behind it is gone or deactivated.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub Principal);

impl Deref for RequireAuth {
    type Target = Principal;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    SharedAuthenticator: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AuthRejection::MissingToken)?;
        let authenticator = SharedAuthenticator::from_ref(state);

        let principal = authenticator.authenticate(token).await.map_err(|e| {
            tracing::debug!(error = %e, "Bearer authentication failed");
            AuthRejection::from(e)
        })?;

        Ok(Self(principal))
    }
}

/// Extractor for optional authentication.
///
/// Yields `None` instead of rejecting when the token is missing or invalid.
#[derive(Debug, Clone)]
pub struct MaybeAuth(pub Option<Principal>);

impl Deref for MaybeAuth {
    type Target = Option<Principal>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuth
where
    SharedAuthenticator: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match RequireAuth::from_request_parts(parts, state).await {
            Ok(RequireAuth(principal)) => Ok(Self(Some(principal))),
            Err(_) => Ok(Self(None)),
        }
    }
}

/// A `module:action` requirement known at compile time.
pub trait PermissionSpec: Send + Sync + 'static {
    const MODULE: &'static str;
    const ACTION: &'static str;

    /// The required code
    fn code() -> PermissionCode {
        PermissionCode::new(Self::MODULE, Self::ACTION)
    }
}

/// Extractor that requires an access token whose account holds `P`.
///
/// Returns 401 like [`RequireAuth`], or 403 naming the missing permission.
pub struct RequirePermission<P> {
    principal: Principal,
    _spec: PhantomData<fn() -> P>,
}

impl<P: PermissionSpec> RequirePermission<P> {
    /// The permission this extractor checked
    pub fn required(&self) -> PermissionCode {
        P::code()
    }

    pub fn into_inner(self) -> Principal {
        self.principal
    }
}

impl<P> Deref for RequirePermission<P> {
    type Target = Principal;

    fn deref(&self) -> &Self::Target {
        &self.principal
    }
}

impl<P> Clone for RequirePermission<P> {
    fn clone(&self) -> Self {
        Self {
            principal: self.principal.clone(),
            _spec: PhantomData,
        }
    }
}

impl<P: PermissionSpec> std::fmt::Debug for RequirePermission<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequirePermission")
            .field("required", &P::code())
            .field("principal", &self.principal)
            .finish()
    }
}

#[async_trait]
impl<S, P> FromRequestParts<S> for RequirePermission<P>
where
    SharedAuthenticator: FromRef<S>,
    S: Send + Sync,
    P: PermissionSpec,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(principal) = RequireAuth::from_request_parts(parts, state).await?;
        AuthorizationGate::from(P::code()).check(&principal)?;

        Ok(Self {
            principal,
            _spec: PhantomData,
        })
    }
}
