//! HTTP error mapping.
//!
//! Every error leaves the handler as `{"error": <CODE>, "message": <text>}`
//! with the status code reported by the underlying error type.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::error;
use validator::Validate;

use factura_core::invoice::InvoiceError;
use factura_shared::AppError;

/// Error returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Lifecycle rejection.
    Invoice(InvoiceError),
    /// Request validation or infrastructure failure.
    App(AppError),
}

impl ApiError {
    /// Shorthand for a 400 validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::App(AppError::Validation(message.into()))
    }

    fn parts(&self) -> (u16, &'static str, String) {
        match self {
            Self::Invoice(e) => (e.status_code(), e.error_code(), e.to_string()),
            Self::App(e) => (e.status_code(), e.error_code(), e.to_string()),
        }
    }
}

impl From<InvoiceError> for ApiError {
    fn from(err: InvoiceError) -> Self {
        Self::Invoice(err)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %message, code, "Request failed");
            return (
                status,
                Json(json!({ "error": code, "message": "An internal error occurred" })),
            )
                .into_response();
        }

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

/// JSON body extractor that runs `validator` rules after deserializing.
///
/// Malformed bodies and failed rules both become `VALIDATION_ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::validation(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| ApiError::validation(errors.to_string()))?;
        Ok(Self(value))
    }
}
