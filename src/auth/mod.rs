// src/auth/mod.rs
pub mod jwt;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{User, Viewer};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub exp: usize,
    pub iat: usize,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

async fn load_user(state: &AppState, token: &str) -> Result<Option<User>, AppError> {
    let Ok(user_id) = jwt::validate_token(token, &state.config.jwt_secret) else {
        return Ok(None);
    };
    let user = state.db.get_user_by_id(user_id).await?;
    Ok(user.filter(|u| !u.is_deleted))
}

/// A signed-in, email-verified viewer. Rejects the request otherwise.
#[derive(Debug)]
pub struct AuthViewer(pub Viewer);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthViewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let user = load_user(state, token).await?.ok_or(AppError::Unauthorized)?;

        if !user.is_verified {
            return Err(AppError::Forbidden("Email not verified"));
        }

        Ok(AuthViewer(user.into()))
    }
}

/// Viewer if a valid token for a verified account was sent, anonymous otherwise.
#[derive(Debug)]
pub struct OptionalViewer(pub Option<Viewer>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalViewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(OptionalViewer(None));
        };

        let viewer = load_user(state, token)
            .await?
            .filter(|u| u.is_verified)
            .map(Viewer::from);

        Ok(OptionalViewer(viewer))
    }
}
