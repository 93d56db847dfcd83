use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{Role, User};
use crate::services::identity::SessionIdentity;
use crate::services::Actor;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub session: SessionIdentity,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.session.role == Role::Admin
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user: self.user.clone(),
            is_admin: self.is_admin(),
        }
    }
}

// Bearer-токен сессии -> провайдер идентификации -> локальное зеркало пользователя
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let session = state
            .identity
            .session(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let user = state
            .users
            .find_by_external_id(&session.external_user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        Ok(AuthUser { user, session })
    }
}

/// Пользователь с админской сессией.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<Arc<crate::AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(auth))
    }
}
