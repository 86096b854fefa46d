use axum::{http::StatusCode, response::Json};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    AuthenticationRequired,
    #[error("Invalid principal")]
    InvalidPrincipal,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<tonic::Status> for ApiError {
    fn from(status: tonic::Status) -> Self {
        let message = status.message().to_string();
        match status.code() {
            tonic::Code::InvalidArgument => ApiError::BadRequest(message),
            tonic::Code::PermissionDenied => ApiError::Forbidden(message),
            tonic::Code::NotFound => ApiError::NotFound(message),
            tonic::Code::AlreadyExists
            | tonic::Code::FailedPrecondition
            | tonic::Code::ResourceExhausted => ApiError::Conflict(message),
            tonic::Code::Unavailable => ApiError::ServiceUnavailable(message),
            _ => ApiError::InternalError(message),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::AuthenticationRequired | ApiError::InvalidPrincipal => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn grpc_codes_map_to_http_statuses() {
        let cases = [
            (tonic::Code::InvalidArgument, StatusCode::BAD_REQUEST),
            (tonic::Code::PermissionDenied, StatusCode::FORBIDDEN),
            (tonic::Code::NotFound, StatusCode::NOT_FOUND),
            (tonic::Code::AlreadyExists, StatusCode::CONFLICT),
            (tonic::Code::FailedPrecondition, StatusCode::CONFLICT),
            (tonic::Code::ResourceExhausted, StatusCode::CONFLICT),
            (tonic::Code::Unavailable, StatusCode::SERVICE_UNAVAILABLE),
            (tonic::Code::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, expected) in cases {
            let error = ApiError::from(tonic::Status::new(code, "boom"));
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn no_availability_message_survives_the_mapping() {
        let status = tonic::Status::resource_exhausted("Please try another date or time.");
        let error = ApiError::from(status);
        assert!(matches!(&error, ApiError::Conflict(m) if m.contains("another date")));
    }
}
