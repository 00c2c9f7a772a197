use std::sync::Arc;

use axum::{
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

type Resp = axum::response::Response;

pub async fn list_transfers(
    Extension(services): Extension<Arc<AppServices>>,
) -> Resp {
    match services.back_office.list_transfers().await {
        Ok(items) => {
            let items = items.iter().map(dto::transfer_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateTransferRequest>, JsonRejection>,
) -> Resp {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let input = match body.into_new_transfer() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.back_office.create_transfer(input).await {
        Ok(t) => (StatusCode::CREATED, Json(dto::transfer_to_json(&t))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Resp {
    let transfer_id = match dto::parse_transfer_id(&id) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.back_office.get_transfer(transfer_id).await {
        Ok(t) => (StatusCode::OK, Json(dto::transfer_to_json(&t))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateTransferRequest>, JsonRejection>,
) -> Resp {
    let transfer_id = match dto::parse_transfer_id(&id) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    match services
        .back_office
        .update_transfer(transfer_id, body.into())
        .await
    {
        Ok(t) => (StatusCode::OK, Json(dto::transfer_to_json(&t))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_receipts(
    Extension(services): Extension<Arc<AppServices>>,
) -> Resp {
    match services.back_office.list_receipts().await {
        Ok(items) => {
            let items = items.iter().map(dto::receipt_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateReceiptRequest>, JsonRejection>,
) -> Resp {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let input = match body.into_new_receipt() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.back_office.create_receipt(input).await {
        Ok(r) => (StatusCode::CREATED, Json(dto::receipt_to_json(&r))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Resp {
    let receipt_id = match dto::parse_receipt_id(&id) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.back_office.get_receipt(receipt_id).await {
        Ok(r) => (StatusCode::OK, Json(dto::receipt_to_json(&r))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
