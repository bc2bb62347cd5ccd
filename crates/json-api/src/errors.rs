//! Error responses that carry a JSON body.

use salvo::{
    oapi::{self, Components, EndpointOutRegister, Operation, ToSchema},
    prelude::*,
    writing::Scribe,
};
use serde::{Deserialize, Serialize};

use atelier_app::domain::bookings::validation::{ValidationError, Violation};

/// One rejected field.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ViolationResponse {
    /// Request field the rule applies to
    pub field: String,

    /// What is wrong with it
    pub message: String,
}

impl From<Violation> for ViolationResponse {
    fn from(violation: Violation) -> Self {
        Self {
            field: violation.field,
            message: violation.message,
        }
    }
}

/// Validation failure body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ValidationErrorResponse {
    /// The first violation, phrased for the end user
    pub error: String,

    /// Every violated rule
    pub violations: Vec<ViolationResponse>,
}

impl ValidationErrorResponse {
    pub(crate) fn single(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();

        Self {
            error: message.clone(),
            violations: vec![ViolationResponse {
                field: field.to_string(),
                message,
            }],
        }
    }
}

impl From<ValidationError> for ValidationErrorResponse {
    fn from(error: ValidationError) -> Self {
        Self {
            error: error.first.message,
            violations: error.violations.into_iter().map(Into::into).collect(),
        }
    }
}

/// Handler error: a plain status, or a 422 with the violated rules.
#[derive(Debug)]
pub(crate) enum ApiError {
    Validation(ValidationErrorResponse),
    Status(StatusError),
}

impl From<StatusError> for ApiError {
    fn from(error: StatusError) -> Self {
        Self::Status(error)
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error.into())
    }
}

impl Scribe for ApiError {
    fn render(self, res: &mut Response) {
        match self {
            Self::Validation(body) => {
                res.status_code(StatusCode::UNPROCESSABLE_ENTITY);
                res.render(Json(body));
            }
            Self::Status(error) => res.render(error),
        }
    }
}

impl EndpointOutRegister for ApiError {
    fn register(components: &mut Components, operation: &mut Operation) {
        <StatusError as EndpointOutRegister>::register(components, operation);

        operation.responses.insert(
            StatusCode::UNPROCESSABLE_ENTITY.as_str(),
            oapi::Response::new("Validation failed").add_content(
                "application/json",
                oapi::Content::new(ValidationErrorResponse::to_schema(components)),
            ),
        );
    }
}
