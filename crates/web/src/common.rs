use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pipeline::PipelineError;
use routing::RoutingError;
use serde::Serialize;

pub type RouteResult<T> = Result<Json<T>, RouteErrorResponse>;

/// User-facing error body. Internal error types are folded into the
/// documented taxonomy here and nowhere else.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteErrorResponse {
    #[serde(skip)]
    pub status: StatusCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl RouteErrorResponse {
    pub fn bad_request(errors: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "validation failed".to_owned(),
            errors,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            errors: Vec::new(),
        }
    }
}

impl IntoResponse for RouteErrorResponse {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl From<RoutingError> for RouteErrorResponse {
    fn from(why: RoutingError) -> Self {
        match why {
            RoutingError::GraphUnavailable => {
                Self::service_unavailable(why.to_string())
            }
        }
    }
}

impl From<PipelineError> for RouteErrorResponse {
    fn from(why: PipelineError) -> Self {
        match &why {
            PipelineError::AlreadyRunning => Self::conflict(why.to_string()),
            PipelineError::ReinitForbidden => Self::forbidden(why.to_string()),
            PipelineError::Storage(_) | PipelineError::Worker { .. } => {
                Self::internal(why.to_string())
            }
        }
    }
}

impl From<storage::StorageError> for RouteErrorResponse {
    fn from(why: storage::StorageError) -> Self {
        match why {
            storage::StorageError::NotFound => {
                Self::not_found("entity not found")
            }
            other => Self::internal(other.to_string()),
        }
    }
}
