//! Quotation lifecycle integration tests.

mod common;

use common::{TestApp, dec_field};
use rust_decimal_macros::dec;
use serde_json::{Value, json};

#[tokio::test]
async fn create_quotation_computes_totals_and_number() {
    let app = TestApp::spawn().await;

    let data = app
        .create_quotation(json!({
            "subject": "Office renovation",
            "subtotal": "300",
            "tax_rate": "10",
            "discount_rate": "5"
        }))
        .await;

    assert_eq!(data["status"], "draft");
    assert!(
        data["quotation_number"]
            .as_str()
            .unwrap()
            .starts_with("QT-"),
        "unexpected number: {}",
        data["quotation_number"]
    );
    assert_eq!(dec_field(&data, "subtotal"), dec!(300));
    assert_eq!(dec_field(&data, "tax_amount"), dec!(30));
    assert_eq!(dec_field(&data, "discount_amount"), dec!(15));
    assert_eq!(dec_field(&data, "total_amount"), dec!(315));
    assert_eq!(data["currency"], "USD");

    app.cleanup().await;
}

#[tokio::test]
async fn explicit_duplicate_number_conflicts() {
    let app = TestApp::spawn().await;

    app.create_quotation(json!({
        "subject": "First",
        "quotation_number": "QT-CUSTOM-1"
    }))
    .await;

    let response = app
        .post("/quotations")
        .json(&json!({
            "subject": "Second",
            "quotation_number": "QT-CUSTOM-1"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    app.cleanup().await;
}

#[tokio::test]
async fn get_unknown_quotation_is_404() {
    let app = TestApp::spawn().await;

    let response = app
        .get("/quotations/99999999-9999-9999-9999-999999999999")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn missing_tenant_headers_are_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/quotations", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    app.cleanup().await;
}

#[tokio::test]
async fn update_recomputes_derived_totals() {
    let app = TestApp::spawn().await;

    let data = app
        .create_quotation(json!({
            "subject": "Reprice me",
            "subtotal": "100",
            "tax_rate": "10"
        }))
        .await;
    let id = data["quotation_id"].as_str().unwrap();

    let response = app
        .patch(&format!("/quotations/{}", id))
        .json(&json!({ "discount_rate": "5" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let envelope: Value = response.json().await.unwrap();
    let updated = &envelope["data"];

    assert_eq!(dec_field(updated, "subtotal"), dec!(100));
    assert_eq!(dec_field(updated, "tax_amount"), dec!(10));
    assert_eq!(dec_field(updated, "discount_amount"), dec!(5));
    assert_eq!(dec_field(updated, "total_amount"), dec!(105));

    app.cleanup().await;
}

#[tokio::test]
async fn repricing_a_sent_quotation_is_rejected() {
    let app = TestApp::spawn().await;

    let data = app
        .create_quotation(json!({ "subject": "Sent already", "subtotal": "100" }))
        .await;
    let id = data["quotation_id"].as_str().unwrap();

    let response = app
        .post(&format!("/quotations/{}/status", id))
        .json(&json!({ "status": "sent" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .patch(&format!("/quotations/{}", id))
        .json(&json!({ "subtotal": "999" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Non-monetary fields remain editable
    let response = app
        .patch(&format!("/quotations/{}", id))
        .json(&json!({ "description": "still editable" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    app.cleanup().await;
}

#[tokio::test]
async fn legal_transition_chain_and_approval_stamp() {
    let app = TestApp::spawn().await;

    let data = app
        .create_quotation(json!({ "subject": "Approve me" }))
        .await;
    let id = data["quotation_id"].as_str().unwrap();

    let response = app
        .post(&format!("/quotations/{}/status", id))
        .json(&json!({ "status": "sent" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .post(&format!("/quotations/{}/status", id))
        .json(&json!({ "status": "approved" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let envelope: Value = response.json().await.unwrap();
    assert_eq!(envelope["data"]["status"], "approved");
    assert_eq!(envelope["data"]["approved_by"], common::TEST_USER_ID);
    assert!(!envelope["data"]["approved_at"].is_null());

    app.cleanup().await;
}

#[tokio::test]
async fn illegal_transition_fails_and_leaves_status_unchanged() {
    let app = TestApp::spawn().await;

    let data = app
        .create_quotation(json!({ "subject": "Terminal" }))
        .await;
    let id = data["quotation_id"].as_str().unwrap();

    for status in ["sent", "approved"] {
        let response = app
            .post(&format!("/quotations/{}/status", id))
            .json(&json!({ "status": status }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    // approved -> draft is not in the workflow table
    let response = app
        .post(&format!("/quotations/{}/status", id))
        .json(&json!({ "status": "draft" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = app.get(&format!("/quotations/{}", id)).send().await.unwrap();
    let envelope: Value = response.json().await.unwrap();
    assert_eq!(envelope["data"]["status"], "approved");

    app.cleanup().await;
}

#[tokio::test]
async fn rejection_requires_a_reason() {
    let app = TestApp::spawn().await;

    let data = app.create_quotation(json!({ "subject": "Reject me" })).await;
    let id = data["quotation_id"].as_str().unwrap();

    app.post(&format!("/quotations/{}/status", id))
        .json(&json!({ "status": "sent" }))
        .send()
        .await
        .unwrap();

    let response = app
        .post(&format!("/quotations/{}/status", id))
        .json(&json!({ "status": "rejected" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = app
        .post(&format!("/quotations/{}/status", id))
        .json(&json!({ "status": "rejected", "reason": "Budget cut" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let envelope: Value = response.json().await.unwrap();
    assert_eq!(envelope["data"]["status"], "rejected");
    assert_eq!(envelope["data"]["rejection_reason"], "Budget cut");

    app.cleanup().await;
}

#[tokio::test]
async fn unknown_status_value_is_a_bad_request() {
    let app = TestApp::spawn().await;

    let data = app.create_quotation(json!({ "subject": "Bad status" })).await;
    let id = data["quotation_id"].as_str().unwrap();

    let response = app
        .post(&format!("/quotations/{}/status", id))
        .json(&json!({ "status": "archived" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn soft_delete_hides_quotation_and_second_delete_is_404() {
    let app = TestApp::spawn().await;

    let data = app.create_quotation(json!({ "subject": "Delete me" })).await;
    let id = data["quotation_id"].as_str().unwrap();

    let response = app
        .delete(&format!("/quotations/{}", id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app.get(&format!("/quotations/{}", id)).send().await.unwrap();
    assert_eq!(response.status(), 404);

    // Deleting an already-deleted quotation reports NotFound
    let response = app
        .delete(&format!("/quotations/{}", id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn list_filters_by_status_and_paginates() {
    let app = TestApp::spawn().await;

    for subject in ["One", "Two", "Three"] {
        app.create_quotation(json!({ "subject": subject })).await;
    }
    let data = app.create_quotation(json!({ "subject": "Sent one" })).await;
    let sent_id = data["quotation_id"].as_str().unwrap().to_string();
    app.post(&format!("/quotations/{}/status", sent_id))
        .json(&json!({ "status": "sent" }))
        .send()
        .await
        .unwrap();

    let response = app
        .get("/quotations?status=sent")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let envelope: Value = response.json().await.unwrap();
    let rows = envelope["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["quotation_id"], sent_id.as_str());

    let response = app.get("/quotations?page_size=2").send().await.unwrap();
    let envelope: Value = response.json().await.unwrap();
    let first_page = envelope["data"].as_array().unwrap();
    assert_eq!(first_page.len(), 2);

    let cursor = first_page[1]["quotation_id"].as_str().unwrap();
    let response = app
        .get(&format!("/quotations?page_size=2&page_token={}", cursor))
        .send()
        .await
        .unwrap();
    let envelope: Value = response.json().await.unwrap();
    let second_page = envelope["data"].as_array().unwrap();
    assert_eq!(second_page.len(), 2);
    for row in second_page {
        assert!(first_page.iter().all(|r| r["quotation_id"] != row["quotation_id"]));
    }

    app.cleanup().await;
}

#[tokio::test]
async fn validation_errors_are_unprocessable() {
    let app = TestApp::spawn().await;

    // Empty subject
    let response = app
        .post("/quotations")
        .json(&json!({ "subject": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    // Discount rate above 100
    let response = app
        .post("/quotations")
        .json(&json!({ "subject": "Bad rate", "discount_rate": "150" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    app.cleanup().await;
}
