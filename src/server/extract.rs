//! A `Json` extractor that turns deserialize failures into
//! [`EngineError::ProtocolError`] instead of axum's default plain-text
//! rejection, so malformed request bodies get the same `{"error",
//! "detail"}` envelope as every other engine error.

use axum::Json;
use axum::extract::{FromRequest, Request};

use crate::error::EngineError;

/// Drop-in replacement for `axum::Json` as a request extractor. Only
/// wraps extraction; responses still use `axum::Json` directly.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = EngineError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| EngineError::ProtocolError(rejection.body_text()))?;
        Ok(AppJson(value))
    }
}
