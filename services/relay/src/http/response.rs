use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_protocol::HttpErrorEnvelope;

use crate::error::RelayError;

pub type HttpResponse = Response;
pub type HttpResult<T = ()> = Result<T, HttpResponse>;

pub(crate) fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> HttpResponse {
    (
        status,
        Json(HttpErrorEnvelope {
            code: code.into(),
            message: message.into(),
            details: None,
        }),
    )
        .into_response()
}

/// Maps a `RelayError` to its one frozen `(status, code, message)` REST
/// representation.
pub fn error_response(err: RelayError) -> HttpResponse {
    json_error(err.http_status(), err.wire_code(), err.to_string())
}

pub fn bad_request(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::BAD_REQUEST, "bad_request", message)
}
