use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts, TypedHeader};
use axum::headers::authorization::Basic;
use axum::headers::Authorization;
use axum::http::request::Parts;
use tracing::debug;

use crate::error::ApiError;
use crate::users::Users;

/// A request whose basic-auth credentials matched a known user.
#[derive(Debug)]
pub struct AuthUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Users: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(credentials)) =
            TypedHeader::<Authorization<Basic>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized)?;

        let users = Users::from_ref(state);
        if !users.validate(credentials.username(), credentials.password()) {
            debug!("rejected credentials for user '{}'", credentials.username());
            return Err(ApiError::Unauthorized);
        }

        Ok(AuthUser(credentials.username().to_owned()))
    }
}
