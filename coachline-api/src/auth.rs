use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// The authenticated user behind a request, taken from the bearer token's `sub`.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub role: String,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Admins act on anyone's behalf; everyone else only on their own.
    pub fn ensure_any_of(&self, owners: &[Option<Uuid>]) -> Result<(), AppError> {
        if self.is_admin() || owners.iter().any(|o| *o == Some(self.id)) {
            return Ok(());
        }
        Err(AppError::AuthorizationError(
            "Not a party to this resource".to_string(),
        ))
    }
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // 1. Bearer token
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::AuthenticationError("Missing bearer token".to_string()))?;

        // 2. Decode and validate
        let token_data = decode::<Claims>(
            bearer.token(),
            &DecodingKey::from_secret(state.auth.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::AuthenticationError(e.to_string()))?;

        // 3. Subject must be a user id
        let id = Uuid::parse_str(&token_data.claims.sub)
            .map_err(|_| AppError::AuthenticationError("Token subject is not a user id".to_string()))?;

        Ok(Actor {
            id,
            role: token_data.claims.role,
        })
    }
}

/// Sign an HS256 token for `user_id`. Used by ops tooling and tests.
pub fn issue_token(secret: &str, user_id: Uuid, role: &str, ttl_seconds: i64) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_owned(),
        exp: (Utc::now() + Duration::seconds(ttl_seconds)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}
