use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::User,
    repository::RepositoryState,
};

/// Role value that grants moderation rights over every advertisement.
pub const ADMIN_ROLE: &str = "admin";

/// Header accepted in `Env::Local` in place of a bearer token.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload expected inside the HS256 bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID in the `users` table.
    pub sub: Uuid,
    /// Expiration time (seconds since the epoch). Always validated.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
}

/// AuthUser
///
/// Resolved identity of an authenticated request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    /// 'admin' or 'member'.
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}

/// Requester
///
/// Who is making the request. Passed explicitly into every filter, validator and
/// authorizer instead of being read from ambient request context.
#[derive(Debug, Clone, PartialEq)]
pub enum Requester {
    Anonymous,
    User(AuthUser),
}

impl Requester {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Requester::User(user) => Some(user),
            Requester::Anonymous => None,
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        self.user().map(|user| user.id)
    }

    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(AuthUser::is_admin)
    }

    /// The authenticated identity, or `ApiError::Unauthenticated` for anonymous requests.
    pub fn require_user(&self) -> Result<&AuthUser, ApiError> {
        self.user().ok_or(ApiError::Unauthenticated)
    }
}

/// Requester Extractor
///
/// Never rejects a request that carries no credentials: those resolve to
/// `Requester::Anonymous`. Credentials that are present but malformed, expired or
/// pointing at an unknown user are rejected with 401.
///
/// Resolution order:
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing user.
/// 2. `Authorization: Bearer <jwt>`, validated with the configured secret.
/// 3. DB lookup of the token subject, so deleted users lose access immediately.
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get(DEV_USER_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| Uuid::parse_str(raw).ok());

            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await? {
                    return Ok(Requester::User(user.into()));
                }
                tracing::debug!(%user_id, "dev bypass user not found, falling back to bearer auth");
            }
        }

        let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(Requester::Anonymous);
        };

        let token = auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthenticated)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!("rejected token: {:?}", other),
            }
            ApiError::Unauthenticated
        })?;

        let user = repo
            .get_user(token_data.claims.sub)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        Ok(Requester::User(user.into()))
    }
}

/// AuthUser Extractor
///
/// Like [`Requester`] but rejects anonymous requests with 401. Used by the
/// authentication middleware and by handlers that only make sense for a signed-in user.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Requester::from_request_parts(parts, state).await? {
            Requester::User(user) => Ok(user),
            Requester::Anonymous => Err(ApiError::Unauthenticated),
        }
    }
}
