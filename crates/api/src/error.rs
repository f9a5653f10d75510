//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind};
use serde::Serialize;

const INTERNAL_MESSAGE: &str = "internal server error";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request from the client.
    BadRequest(String),
    /// Missing or unusable credentials.
    Unauthorized(String),
    /// Authenticated, but not allowed to act on the resource.
    Forbidden(String),
    PayloadTooLarge(String),
    /// Error returned by a domain service.
    Domain(DomainError),
    /// Internal failure. The message is logged and never returned.
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorMessage<'a>,
}

#[derive(Serialize)]
struct ErrorMessage<'a> {
    message: &'a str,
}

/// Renders the `{"error":{"message":…}}` envelope.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorMessage { message },
    };
    (status, axum::Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
            ApiError::Unauthorized(msg) => error_response(StatusCode::UNAUTHORIZED, &msg),
            ApiError::Forbidden(msg) => error_response(StatusCode::FORBIDDEN, &msg),
            ApiError::PayloadTooLarge(msg) => error_response(StatusCode::PAYLOAD_TOO_LARGE, &msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
            }
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn domain_error_to_response(err: DomainError) -> Response {
    let status = status_for(err.kind());
    match err.public_message() {
        Some(message) if err.kind() != ErrorKind::Internal => {
            tracing::debug!(error = %err, %status, "request rejected");
            error_response(status, message)
        }
        _ => {
            tracing::error!(error = %err, "internal server error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("request body is too large".to_string())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// JSON body extractor and response that reports errors in the API envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Path extractor that reports errors in the API envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

/// Query string extractor that reports errors in the API envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_domain_kinds_map_to_status() {
        let cases = [
            (DomainError::validation("bad page"), StatusCode::BAD_REQUEST),
            (
                DomainError::new(ErrorKind::Unauthorized, "who").with_public("who"),
                StatusCode::UNAUTHORIZED,
            ),
            (DomainError::forbidden("not yours"), StatusCode::FORBIDDEN),
            (DomainError::not_found("no product"), StatusCode::NOT_FOUND),
            (DomainError::conflict("exists"), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[tokio::test]
    async fn test_public_message_is_returned() {
        let err = DomainError::conflict("email already registered")
            .context("CustomerService.create_customer", "inserting user");
        let response = ApiError::from(err).into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "email already registered");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let err = DomainError::internal("connection reset by peer")
            .context("CustomerService.create_order", "locking product 7");
        let response = ApiError::from(err).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_internal_with_public_message_stays_opaque() {
        let err = DomainError::internal("pool timed out").with_public("try again");
        let response = ApiError::from(err).into_response();

        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], INTERNAL_MESSAGE);
    }
}
