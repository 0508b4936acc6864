use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Uniform `{"error": "..."}` body for every failed request, with the
/// status code chosen by the underlying error kind rather than hardcoded
/// per handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] envoy_store::StoreError),
    #[error(transparent)]
    Agent(#[from] envoy_agent::AgentError),
    #[error(transparent)]
    Scheduler(#[from] envoy_scheduler::SchedulerError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(envoy_store::StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Store(envoy_store::StoreError::DuplicateName { .. }) => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Agent(envoy_agent::AgentError::Provider(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Agent(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Scheduler(envoy_scheduler::SchedulerError::InvalidCron(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Scheduler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn validation_is_bad_request() {
        assert_eq!(
            status_of(ApiError::Validation("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_found_is_404() {
        assert_eq!(
            status_of(ApiError::NotFound("missing".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn store_not_found_maps_to_404() {
        let err = ApiError::Store(envoy_store::StoreError::NotFound {
            kind: "session",
            id: "abc".to_string(),
        });
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_duplicate_name_maps_to_409() {
        let err = ApiError::Store(envoy_store::StoreError::DuplicateName {
            kind: "tool",
            name: "dup".to_string(),
        });
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn provider_error_maps_to_bad_gateway() {
        let err = ApiError::Agent(envoy_agent::AgentError::Provider(
            envoy_agent::ProviderError::Unavailable("down".to_string()),
        ));
        assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn invalid_cron_maps_to_bad_request() {
        let err = ApiError::Scheduler(envoy_scheduler::SchedulerError::InvalidCron(
            "not a cron".to_string(),
        ));
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }
}
