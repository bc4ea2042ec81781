use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::json;

const CONFIG_HELP: &str = "Check your EMAIL_USER and EMAIL_PASS configuration";

/// Route-level failure. Renders as `{"success": false, "error": ...}` with
/// the matching status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("Too many emails sent, try again later")]
    Throttled,
    /// Credential check against the relay failed.
    #[error("{0}")]
    Verify(String),
    /// The relay refused or never received a message.
    #[error("{0}")]
    Delivery(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::Throttled => Status::TooManyRequests,
            ApiError::Verify(_) | ApiError::Delivery(_) => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let mut body = json!({
            "success": false,
            "error": self.to_string(),
        });
        if let ApiError::Verify(_) = self {
            body["help"] = json!(CONFIG_HELP);
        }
        (self.status(), Json(body)).respond_to(req)
    }
}
