use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use auth_guard::{GuardError, RejectionPayload};
use request_context::ContextError;
use serde::Serialize;
use std::fmt;

/// Guard rejection rendered as an HTTP response
///
/// Body: `{"error", "status", "code", "requiredRoles"?, "userRole"?}`. The
/// internal rejection reason is never included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRejection(GuardError);

#[derive(Serialize)]
struct RejectionBody<'a> {
    status: u16,
    #[serde(flatten)]
    payload: &'a RejectionPayload,
}

impl HttpRejection {
    pub fn new(error: GuardError) -> Self {
        Self(error)
    }

    pub fn guard_error(&self) -> &GuardError {
        &self.0
    }
}

impl fmt::Display for HttpRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<GuardError> for HttpRejection {
    fn from(error: GuardError) -> Self {
        Self(error)
    }
}

impl From<ContextError> for HttpRejection {
    fn from(error: ContextError) -> Self {
        Self(GuardError::from(error))
    }
}

impl ResponseError for HttpRejection {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let payload = self.0.payload();

        HttpResponse::build(status).json(RejectionBody {
            status: status.as_u16(),
            payload: &payload,
        })
    }
}
