/*!
 * # Authentication
 *
 * Bearer JWT validation for the marketplace API. Tokens are issued elsewhere;
 * this module only verifies them (HS256, issuer and audience checked) and
 * turns the claims into an [`AuthUser`] the handlers can authorize against.
 */

use crate::entities::user::UserRole;
use crate::errors::ServiceError;
use crate::services::history::Actor;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // Subject (user ID)
    pub name: Option<String>,     // User's name
    pub roles: Vec<String>,       // customer | vendor | delivery_partner | admin
    pub jti: String,              // JWT ID
    pub iat: i64,                 // Issued at time
    pub exp: i64,                 // Expiration time
    pub iss: String,              // Issuer
    pub aud: String,              // Audience
}

/// Authenticated caller extracted from the bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub roles: Vec<UserRole>,
    pub token_id: String,
}

impl AuthUser {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    /// Fails with 403 unless the caller holds `role`.
    pub fn require(&self, role: UserRole) -> Result<Actor, ServiceError> {
        if self.has_role(role) {
            Ok(self.actor_as(role))
        } else {
            Err(ServiceError::Forbidden(format!("Requires the {} role", role)))
        }
    }

    /// Admins pass any role check.
    pub fn require_or_admin(&self, role: UserRole) -> Result<Actor, ServiceError> {
        if self.has_role(role) {
            Ok(self.actor_as(role))
        } else if self.is_admin() {
            Ok(Actor::admin(self.user_id))
        } else {
            Err(ServiceError::Forbidden(format!("Requires the {} role", role)))
        }
    }

    pub fn actor_as(&self, role: UserRole) -> Actor {
        match role {
            UserRole::Customer => Actor::customer(self.user_id),
            UserRole::Vendor => Actor::vendor(self.user_id),
            UserRole::DeliveryPartner => Actor::delivery_partner(self.user_id),
            UserRole::Admin => Actor::admin(self.user_id),
        }
    }

    /// The caller's most privileged role as an actor.
    pub fn actor(&self) -> Actor {
        [
            UserRole::Admin,
            UserRole::Vendor,
            UserRole::DeliveryPartner,
            UserRole::Customer,
        ]
        .into_iter()
        .find(|r| self.has_role(*r))
        .map(|r| self.actor_as(r))
        .unwrap_or_else(|| Actor::customer(self.user_id))
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_audience: "marketplace-api".to_string(),
            jwt_issuer: "marketplace-auth".to_string(),
            access_token_ttl: Duration::minutes(30),
        }
    }
}

/// Authentication error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => {
                ServiceError::Unauthorized("No authentication token provided".to_string())
            }
            AuthError::InvalidToken => {
                ServiceError::Unauthorized("Invalid authentication token".to_string())
            }
            AuthError::TokenExpired => ServiceError::Unauthorized("Token has expired".to_string()),
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

/// Validates tokens; issuing is kept for tooling and tests.
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Signs an access token for `user_id` with the given roles.
    pub fn issue_token(
        &self,
        user_id: Uuid,
        name: Option<String>,
        roles: &[UserRole],
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            name,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.config.access_token_ttl).timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Claims to caller; unknown role names are ignored.
    pub fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let roles = claims
            .roles
            .iter()
            .filter_map(|r| UserRole::from_str(r).ok())
            .collect();
        Ok(AuthUser {
            user_id,
            name: claims.name,
            roles,
            token_id: claims.jti,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthService>::from_ref(state);
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let user = auth.authenticate(token)?;
        debug!(user_id = %user.user_id, roles = ?user.roles, "authenticated");
        Ok(user)
    }
}
