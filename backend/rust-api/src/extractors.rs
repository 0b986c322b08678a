use axum::{
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};
use validator::Validate;

use crate::handlers::ApiError;

/// Custom JSON extractor that returns JSON error responses instead of HTML
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(bad_request(format!(
                "Failed to parse JSON request body: {}",
                rejection
            ))),
        }
    }
}

/// [`AppJson`] followed by `validator` rules.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AppJson(value) = AppJson::<T>::from_request(req, state).await?;
        value
            .validate()
            .map_err(|e| bad_request(format!("Validation error: {}", e)))?;
        Ok(ValidatedJson(value))
    }
}

fn bad_request(message: String) -> Response {
    tracing::warn!("{}", message);
    ApiError::BadRequest(message).into_response()
}
