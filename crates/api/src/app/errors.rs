use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use backoffice_core::DomainError;
use backoffice_infra::ServiceError;

/// Error body: `{ "error": <message>, "code": <snake_case kind> }`.
pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": message.into(),
            "code": code,
        })),
    )
        .into_response()
}

pub fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::InvalidAmount(_)
        | DomainError::InvalidOperation(_)
        | DomainError::InvalidCategory(_)
        | DomainError::InvalidStatus(_)
        | DomainError::InvalidTransition(_)
        | DomainError::Validation(_)
        | DomainError::NoOp => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Unauthorized => StatusCode::UNAUTHORIZED,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    json_error(domain_status(&err), err.code(), err.to_string())
}

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "internal storage error",
            )
        }
    }
}

pub fn unauthorized() -> Response {
    domain_error_to_response(DomainError::Unauthorized)
}

/// Malformed JSON bodies get the same error shape as everything else.
pub fn json_rejection(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (DomainError::invalid_amount("x"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_transition("x"), StatusCode::BAD_REQUEST),
            (DomainError::NoOp, StatusCode::BAD_REQUEST),
            (DomainError::not_found("x"), StatusCode::NOT_FOUND),
            (DomainError::conflict("x"), StatusCode::CONFLICT),
            (DomainError::Unauthorized, StatusCode::UNAUTHORIZED),
            (DomainError::forbidden("x"), StatusCode::FORBIDDEN),
        ];
        for (err, status) in cases {
            assert_eq!(domain_status(&err), status, "{err:?}");
        }
    }

    #[test]
    fn storage_errors_are_opaque() {
        let res = service_error_to_response(ServiceError::Store(
            backoffice_infra::StoreError::Storage("password=hunter2".to_string()),
        ));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
