use std::sync::Arc;

use axum::{
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn get_summary(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.back_office.summary().await {
        Ok(summary) => (StatusCode::OK, Json(dto::summary_to_json(&summary))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn post_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::LedgerRequestBody>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let request = match body.into_request() {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.back_office.handle_ledger_request(request).await {
        Ok(outcome) => (StatusCode::OK, Json(dto::ledger_outcome_to_json(&outcome))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
