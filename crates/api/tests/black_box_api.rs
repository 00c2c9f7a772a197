use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use backoffice_auth::{JwtClaims, PrincipalId, Role};
use backoffice_infra::{AppConfig, Environment};

struct TestServer {
    base_url: String,
    jwt_secret: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(environment: Environment) -> Self {
        let jwt_secret = "test-secret".to_string();
        let config = AppConfig {
            jwt_secret: jwt_secret.clone(),
            environment,
            ..AppConfig::default()
        };

        // Same router as prod, bound to an ephemeral port.
        let app = backoffice_api::app::build_app(&config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            jwt_secret,
            handle,
        }
    }

    fn admin_token(&self) -> String {
        mint_jwt(&self.jwt_secret, vec![Role::admin()])
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: PrincipalId::new(),
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn post_ledger(
    client: &reqwest::Client,
    srv: &TestServer,
    token: &str,
    body: Value,
) -> (StatusCode, Value) {
    let res = client
        .post(srv.url("/ledger"))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn balance(client: &reqwest::Client, srv: &TestServer, token: &str, account: &str) -> i64 {
    let summary: Value = client
        .get(srv.url("/ledger"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    summary["accounts"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["id"] == account)
        .map(|a| a["balanceCents"].as_i64().unwrap())
        .unwrap_or(0)
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn(Environment::Test).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "unauthorized");

    let res = client
        .get(srv.url("/ledger"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let forged = mint_jwt("some-other-secret", vec![Role::admin()]);
    let res = client
        .get(srv.url("/ledger"))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admin_tokens_are_rejected() {
    let srv = TestServer::spawn(Environment::Test).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(&srv.jwt_secret, vec![Role::new("viewer")]);

    let res = client
        .get(srv.url("/ledger"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public_and_whoami_echoes_the_principal() {
    let srv = TestServer::spawn(Environment::Test).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(srv.admin_token())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["roles"], json!(["admin"]));
    assert!(body["principal_id"].is_string());
}

#[tokio::test]
async fn cash_income_posts_balanced_entries() {
    let srv = TestServer::spawn(Environment::Test).await;
    let client = reqwest::Client::new();
    let token = srv.admin_token();

    let (status, body) = post_ledger(
        &client,
        &srv,
        &token,
        json!({ "action": "recordCashIncome", "amountUsd": 500, "clientName": "Acme" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let entries = body["result"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    let total: i64 = entries.iter().map(|e| e["amountCents"].as_i64().unwrap()).sum();
    assert_eq!(total, 0);
    assert_eq!(body["summary"]["entryCount"], 2);

    assert_eq!(balance(&client, &srv, &token, "CASH_ON_HAND").await, 50_000);
    assert_eq!(balance(&client, &srv, &token, "REVENUE").await, -50_000);
}

#[tokio::test]
async fn invalid_requests_leave_the_books_untouched() {
    let srv = TestServer::spawn(Environment::Test).await;
    let client = reqwest::Client::new();
    let token = srv.admin_token();

    let (status, body) = post_ledger(
        &client,
        &srv,
        &token,
        json!({ "action": "recordCashIncome", "amountUsd": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_amount");

    let (status, body) = post_ledger(
        &client,
        &srv,
        &token,
        json!({ "action": "recordExpense", "amountUsd": 10, "category": "yachts", "paidFrom": "bank" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_category");

    let (status, body) = post_ledger(&client, &srv, &token, json!({ "action": "mintMoney" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_operation");

    let (status, body) = post_ledger(
        &client,
        &srv,
        &token,
        json!({ "action": "getLedgerSummary" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["entryCount"], 0);
}

#[tokio::test]
async fn ach_transfer_confirmed_through_patch_lands_in_kraken() {
    let srv = TestServer::spawn(Environment::Test).await;
    let client = reqwest::Client::new();
    let token = srv.admin_token();

    post_ledger(
        &client,
        &srv,
        &token,
        json!({ "action": "recordCapitalContribution", "amountUsd": 2000 }),
    )
    .await;
    let (status, body) = post_ledger(
        &client,
        &srv,
        &token,
        json!({ "action": "achToKraken", "amountUsd": "1500.50" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let transfer = &body["result"]["transfer"];
    assert_eq!(transfer["status"], "SUBMITTED");
    assert_eq!(transfer["amountCents"], 150_050);
    let id = transfer["id"].as_str().unwrap().to_string();

    assert_eq!(balance(&client, &srv, &token, "KRAKEN_PENDING").await, 150_050);

    let res = client
        .patch(srv.url(&format!("/treasury/transfers/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "status": "confirmed", "krakenRef": "KR-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "CONFIRMED");
    assert_eq!(body["amountUsd"], 1500.5);
    assert_eq!(body["krakenRef"], "KR-1");

    assert_eq!(balance(&client, &srv, &token, "KRAKEN").await, 150_050);
    assert_eq!(balance(&client, &srv, &token, "KRAKEN_PENDING").await, 0);

    // A second confirmation is an invalid transition, not a second settlement.
    let (status, body) = post_ledger(
        &client,
        &srv,
        &token,
        json!({ "action": "completeTransfer", "transferId": id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_transition");
    assert_eq!(balance(&client, &srv, &token, "KRAKEN").await, 150_050);
}

#[tokio::test]
async fn manual_transfers_enforce_the_status_table() {
    let srv = TestServer::spawn(Environment::Test).await;
    let client = reqwest::Client::new();
    let token = srv.admin_token();

    let res = client
        .post(srv.url("/treasury/transfers"))
        .bearer_auth(&token)
        .json(&json!({
            "fromAccount": "Fulton",
            "toAccount": "Kraken",
            "method": "wire",
            "amountUsd": 75,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["status"], "PLANNED");
    assert_eq!(created["ledgerTracked"], false);
    let id = created["id"].as_str().unwrap().to_string();

    let res = client
        .patch(srv.url(&format!("/treasury/transfers/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "status": "CONFIRMED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "invalid_transition");
    assert_eq!(
        body["error"],
        "Cannot transition from PLANNED to CONFIRMED. Allowed: SUBMITTED, CANCELED"
    );

    let res = client
        .patch(srv.url(&format!("/treasury/transfers/{id}")))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "no_op");

    let res = client
        .get(srv.url(&format!("/treasury/transfers/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "PLANNED");

    // Manual transfers never touch the ledger.
    assert_eq!(balance(&client, &srv, &token, "KRAKEN").await, 0);
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let srv = TestServer::spawn(Environment::Test).await;
    let client = reqwest::Client::new();
    let token = srv.admin_token();
    let missing = uuid_like();

    let res = client
        .patch(srv.url(&format!("/treasury/transfers/{missing}")))
        .bearer_auth(&token)
        .json(&json!({ "status": "SUBMITTED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "not_found");

    // Ids are opaque; one that is not even a UUID is just as unknown.
    let res = client
        .patch(srv.url("/treasury/transfers/clx123"))
        .bearer_auth(&token)
        .json(&json!({ "status": "SUBMITTED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "not_found");

    let res = client
        .get(srv.url("/treasury/receipts/not-a-receipt"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let (status, body) = post_ledger(
        &client,
        &srv,
        &token,
        json!({ "action": "completeTransfer", "transferId": "clx123" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn canceled_exchange_transfer_returns_funds_to_the_bank() {
    let srv = TestServer::spawn(Environment::Test).await;
    let client = reqwest::Client::new();
    let token = srv.admin_token();

    let (_, body) = post_ledger(
        &client,
        &srv,
        &token,
        json!({ "action": "achToKraken", "amountUsd": 100 }),
    )
    .await;
    let id = body["result"]["transfer"]["id"].as_str().unwrap().to_string();
    assert_eq!(balance(&client, &srv, &token, "KRAKEN_PENDING").await, 10_000);

    let res = client
        .patch(srv.url(&format!("/treasury/transfers/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "status": "CANCELED", "notes": "returned by bank" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "CANCELED");

    assert_eq!(balance(&client, &srv, &token, "KRAKEN_PENDING").await, 0);
    assert_eq!(balance(&client, &srv, &token, "BANK_FULTON").await, 0);
    assert_eq!(balance(&client, &srv, &token, "KRAKEN").await, 0);
}

#[tokio::test]
async fn receipts_are_recorded_and_fund_one_transfer() {
    let srv = TestServer::spawn(Environment::Test).await;
    let client = reqwest::Client::new();
    let token = srv.admin_token();

    let res = client
        .post(srv.url("/treasury/receipts"))
        .bearer_auth(&token)
        .json(&json!({ "method": "zelle", "amountUsd": 250, "payerName": "Acme" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let receipt: Value = res.json().await.unwrap();
    assert_eq!(receipt["status"], "RECEIVED");
    assert_eq!(receipt["amountCents"], 25_000);
    let receipt_id = receipt["id"].as_str().unwrap().to_string();

    let transfer_body = json!({
        "fromAccount": "Fulton",
        "toAccount": "Kraken",
        "method": "ach",
        "amountUsd": 250,
        "receiptId": receipt_id,
    });
    let res = client
        .post(srv.url("/treasury/transfers"))
        .bearer_auth(&token)
        .json(&transfer_body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let transfer: Value = res.json().await.unwrap();

    let res = client
        .post(srv.url("/treasury/transfers"))
        .bearer_auth(&token)
        .json(&transfer_body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .get(srv.url(&format!("/treasury/receipts/{receipt_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched["transferId"], transfer["id"]);

    let res = client
        .get(srv.url("/treasury/receipts"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let list: Value = res.json().await.unwrap();
    assert_eq!(list["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn reset_clears_the_ledger_outside_production() {
    let srv = TestServer::spawn(Environment::Test).await;
    let client = reqwest::Client::new();
    let token = srv.admin_token();

    post_ledger(
        &client,
        &srv,
        &token,
        json!({ "action": "recordCashIncome", "amountUsd": 40 }),
    )
    .await;
    let (status, body) = post_ledger(&client, &srv, &token, json!({ "action": "resetLedger" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["reset"]["entriesRemoved"], 2);
    assert_eq!(body["summary"]["entryCount"], 0);
    assert_eq!(balance(&client, &srv, &token, "CASH_ON_HAND").await, 0);
}

#[tokio::test]
async fn reset_is_forbidden_in_production() {
    let srv = TestServer::spawn(Environment::Production).await;
    let client = reqwest::Client::new();
    let token = srv.admin_token();

    post_ledger(
        &client,
        &srv,
        &token,
        json!({ "action": "recordCashIncome", "amountUsd": 40 }),
    )
    .await;
    let (status, body) = post_ledger(&client, &srv, &token, json!({ "action": "resetLedger" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
    assert_eq!(balance(&client, &srv, &token, "CASH_ON_HAND").await, 4_000);
}

fn uuid_like() -> String {
    backoffice_core::TransferId::new().to_string()
}
