use crate::command::{CommandResponse, CommandStatus, ResponseMeta};
use crate::server_security::{AuthToken, AUTH_TOKEN_ENV};
use axum::{
    body::Body,
    http::{header::AUTHORIZATION, HeaderMap, Response as HttpResponse, StatusCode},
    response::Response,
};
use huilerie_protocol::{error_codes, serialize_json, ErrorEnvelope};
use serde::Serialize;

/// True when no token is configured or the request carries the right one.
pub(crate) fn is_authorized(headers: &HeaderMap, token: Option<&AuthToken>) -> bool {
    let Some(token) = token else {
        return true;
    };
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| token.accepts(value))
}

pub(crate) fn unauthorized() -> Result<Response, StatusCode> {
    let response = error_response(
        error_codes::UNAUTHORIZED,
        "Missing or invalid Authorization header".to_string(),
    );
    build_response(StatusCode::UNAUTHORIZED, &response)
}

pub(crate) fn error_response(code: &str, message: String) -> CommandResponse {
    let hint = if code == error_codes::UNAUTHORIZED {
        format!("This server was started with an auth token ({AUTH_TOKEN_ENV} or --auth-token). Send Authorization: Bearer <token>.")
    } else {
        "Send a JSON body shaped like {\"action\": ..., \"payload\": {...}}; action=capabilities lists every action."
            .to_string()
    };

    let mut error = ErrorEnvelope::new(code, message.clone());
    error.hint = Some(hint);
    CommandResponse {
        status: CommandStatus::Error,
        message: Some(message),
        error: Some(error),
        hints: Vec::new(),
        next_actions: Vec::new(),
        data: serde_json::Value::Null,
        meta: ResponseMeta::default(),
    }
}

pub(crate) fn build_response<T: Serialize>(
    status: StatusCode,
    body: &T,
) -> Result<Response, StatusCode> {
    let bytes = serialize_json(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_bytes();

    let mut builder = HttpResponse::builder()
        .status(status)
        .header("content-type", "application/json");
    if status == StatusCode::UNAUTHORIZED {
        builder = builder.header("www-authenticate", "Bearer");
    }
    builder
        .body(Body::from(bytes))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
