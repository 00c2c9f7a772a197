use axum::{
    Router,
    routing::get,
};

pub mod ledger;
pub mod system;
pub mod treasury;

/// Protected routes. Auth middleware is layered on by `build_app`.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/ledger", get(ledger::get_summary).post(ledger::post_ledger))
        .route(
            "/treasury/transfers",
            get(treasury::list_transfers).post(treasury::create_transfer),
        )
        .route(
            "/treasury/transfers/:id",
            get(treasury::get_transfer).patch(treasury::update_transfer),
        )
        .route(
            "/treasury/receipts",
            get(treasury::list_receipts).post(treasury::create_receipt),
        )
        .route("/treasury/receipts/:id", get(treasury::get_receipt))
}
