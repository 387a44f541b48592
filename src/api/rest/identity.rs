use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

/// Header carrying the caller's identity, already verified upstream.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// The authenticated courier or restaurant making the request.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ActorId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .ok_or_else(|| AppError::BadRequest(format!("missing {ACTOR_HEADER} header")))?;

        let id = raw
            .to_str()
            .map_err(|_| AppError::BadRequest(format!("{ACTOR_HEADER} is not valid text")))?
            .trim();

        if id.is_empty() {
            return Err(AppError::BadRequest(format!("{ACTOR_HEADER} cannot be empty")));
        }

        Ok(ActorId(id.to_string()))
    }
}
