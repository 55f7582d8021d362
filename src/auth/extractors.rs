use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use super::{
    claims::{Claims, Role, TokenKind},
    jwt::JwtKeys,
};
use crate::{error::ApiError, moderation::ApprovalStatus, state::AppState};

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized("missing Authorization header"))?;

    // Expect "Bearer <token>"
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or(ApiError::Unauthorized("invalid auth scheme"))
}

fn access_claims(parts: &Parts, state: &AppState) -> Result<Claims, ApiError> {
    let token = bearer_token(parts)?;
    let claims = JwtKeys::from_ref(state).verify(token).map_err(|_| {
        warn!("invalid or expired token");
        ApiError::Unauthorized("invalid or expired token")
    })?;
    if claims.kind != TokenKind::Access {
        return Err(ApiError::Unauthorized("access token required"));
    }
    Ok(claims)
}

/// An authenticated administrator. Re-validated against the credential store
/// on every request; nothing is cached between requests.
pub struct AdminUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = access_claims(parts, state)?;
        if claims.role != Role::Admin {
            warn!(sub = %claims.sub, "non-admin token on admin route");
            return Err(ApiError::AdminRequired);
        }
        match state.admins.find_by_id(claims.sub).await? {
            Some(admin) => Ok(AdminUser(admin.id)),
            None => {
                warn!(admin_id = %claims.sub, "token for unknown admin");
                Err(ApiError::Unauthorized("invalid or expired token"))
            }
        }
    }
}

/// An authenticated student whose account is currently approved.
pub struct StudentUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for StudentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = access_claims(parts, state)?;
        if claims.role != Role::Student {
            return Err(ApiError::Unauthorized("student token required"));
        }
        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(ApiError::Unauthorized("invalid or expired token"))?;
        match user.status {
            ApprovalStatus::Approved => Ok(StudentUser(user.id)),
            other => Err(ApiError::ForbiddenStatus(other)),
        }
    }
}

/// Key the login limiters count attempts under: the client IP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

#[async_trait]
impl FromRequestParts<AppState> for ClientKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(client_key(parts, state.config.trust_proxy_headers))
    }
}

fn client_key(parts: &Parts, trust_proxy_headers: bool) -> ClientKey {
    if trust_proxy_headers {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let real_ip = || {
            parts
                .headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };
        if let Some(ip) = forwarded.or_else(real_ip) {
            return ClientKey(ip.to_string());
        }
    }
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| ClientKey(addr.ip().to_string()))
        .unwrap_or_else(|| ClientKey("unknown".into()))
}
