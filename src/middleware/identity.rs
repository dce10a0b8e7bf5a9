use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::Error;

pub const STUDENT_ID_HEADER: &str = "x-student-id";

/// Caller identity, asserted by the gateway in front of this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for StudentId
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(STUDENT_ID_HEADER)
            .ok_or_else(|| Error::Unauthorized(format!("missing {} header", STUDENT_ID_HEADER)))?
            .to_str()
            .map_err(|_| Error::Unauthorized(format!("unreadable {} header", STUDENT_ID_HEADER)))?;
        let id = Uuid::parse_str(raw.trim())
            .map_err(|_| Error::Unauthorized(format!("{} is not a UUID", STUDENT_ID_HEADER)))?;
        Ok(StudentId(id))
    }
}
