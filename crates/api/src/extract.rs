//! Request extractors shared by the route handlers.

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use common::{Actor, AggregateId, StaffRole};

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// The staff member making the request, taken from the `x-actor-id` and
/// `x-actor-role` headers set by the upstream authenticator.
///
/// A missing or blank id, or a role that does not parse, is rejected with
/// 401. A missing role means [`StaffRole::Staff`].
pub struct CurrentActor(pub Actor);

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let id = header(ACTOR_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {ACTOR_ID_HEADER} header")))?;
        let role = match header(ACTOR_ROLE_HEADER) {
            Some(role) => role
                .parse::<StaffRole>()
                .map_err(|e| ApiError::Unauthorized(e.to_string()))?,
            None => StaffRole::default(),
        };

        Ok(Self(Actor::new(id, role)))
    }
}

/// `Json` whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejections render as [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Parses a path segment as a stream id.
pub fn parse_id(raw: &str) -> Result<AggregateId, ApiError> {
    AggregateId::parse(raw).map_err(|e| ApiError::BadRequest(format!("invalid id '{raw}': {e}")))
}
