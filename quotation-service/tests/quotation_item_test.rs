//! Line item integration tests: ownership, draft gating, and the
//! item-to-quotation totals consistency guarantee.

mod common;

use common::{TestApp, dec_field};
use rust_decimal_macros::dec;
use serde_json::{Value, json};

async fn create_draft(app: &TestApp, tax_rate: &str, discount_rate: &str) -> String {
    let data = app
        .create_quotation(json!({
            "subject": "Itemized quotation",
            "tax_rate": tax_rate,
            "discount_rate": discount_rate
        }))
        .await;
    data["quotation_id"].as_str().unwrap().to_string()
}

async fn add_item(app: &TestApp, quotation_id: &str, body: Value) -> Value {
    let response = app
        .post(&format!("/quotations/{}/items", quotation_id))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201, "add item failed");
    let envelope: Value = response.json().await.unwrap();
    envelope["data"].clone()
}

async fn fetch_quotation(app: &TestApp, quotation_id: &str) -> Value {
    let response = app
        .get(&format!("/quotations/{}", quotation_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let envelope: Value = response.json().await.unwrap();
    envelope["data"].clone()
}

#[tokio::test]
async fn item_mutations_keep_quotation_totals_consistent() {
    let app = TestApp::spawn().await;
    let id = create_draft(&app, "10", "0").await;

    add_item(
        &app,
        &id,
        json!({ "name": "Widgets", "quantity": "2", "unit_price": "100" }),
    )
    .await;
    let quotation = fetch_quotation(&app, &id).await;
    assert_eq!(dec_field(&quotation, "subtotal"), dec!(200));

    let second = add_item(
        &app,
        &id,
        json!({ "name": "Gadgets", "quantity": "1", "unit_price": "50" }),
    )
    .await;
    let quotation = fetch_quotation(&app, &id).await;
    assert_eq!(dec_field(&quotation, "subtotal"), dec!(250));
    assert_eq!(dec_field(&quotation, "tax_amount"), dec!(25));
    assert_eq!(dec_field(&quotation, "total_amount"), dec!(275));

    // Deleting the second item recomputes with the same rates
    let item_id = second["item_id"].as_str().unwrap();
    let response = app
        .delete(&format!("/quotations/{}/items/{}", id, item_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let quotation = fetch_quotation(&app, &id).await;
    assert_eq!(dec_field(&quotation, "subtotal"), dec!(200));
    assert_eq!(dec_field(&quotation, "tax_amount"), dec!(20));
    assert_eq!(dec_field(&quotation, "total_amount"), dec!(220));

    app.cleanup().await;
}

#[tokio::test]
async fn worked_example_holds_end_to_end() {
    let app = TestApp::spawn().await;
    let id = create_draft(&app, "10", "5").await;

    let item = add_item(
        &app,
        &id,
        json!({ "name": "Consulting", "quantity": "3", "unit_price": "100" }),
    )
    .await;
    assert_eq!(dec_field(&item, "line_total"), dec!(300));

    let quotation = fetch_quotation(&app, &id).await;
    assert_eq!(dec_field(&quotation, "subtotal"), dec!(300));
    assert_eq!(dec_field(&quotation, "discount_amount"), dec!(15));
    assert_eq!(dec_field(&quotation, "tax_amount"), dec!(30));
    assert_eq!(dec_field(&quotation, "total_amount"), dec!(315));

    app.cleanup().await;
}

#[tokio::test]
async fn item_level_discount_applies_before_item_tax() {
    let app = TestApp::spawn().await;
    let id = create_draft(&app, "0", "0").await;

    let item = add_item(
        &app,
        &id,
        json!({
            "name": "Discounted",
            "quantity": "1",
            "unit_price": "100",
            "discount_percentage": "10",
            "tax_rate": "5"
        }),
    )
    .await;
    // 100 * 0.9 * 1.05
    assert_eq!(dec_field(&item, "line_total"), dec!(94.50));

    let quotation = fetch_quotation(&app, &id).await;
    assert_eq!(dec_field(&quotation, "subtotal"), dec!(94.50));

    app.cleanup().await;
}

#[tokio::test]
async fn update_item_recomputes_line_and_quotation_totals() {
    let app = TestApp::spawn().await;
    let id = create_draft(&app, "0", "0").await;

    let item = add_item(
        &app,
        &id,
        json!({ "name": "Hours", "quantity": "2", "unit_price": "100" }),
    )
    .await;
    let item_id = item["item_id"].as_str().unwrap();

    let response = app
        .patch(&format!("/quotations/{}/items/{}", id, item_id))
        .json(&json!({ "quantity": "3" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let envelope: Value = response.json().await.unwrap();
    assert_eq!(dec_field(&envelope["data"], "line_total"), dec!(300));
    // unit price untouched by the partial update
    assert_eq!(dec_field(&envelope["data"], "unit_price"), dec!(100));

    let quotation = fetch_quotation(&app, &id).await;
    assert_eq!(dec_field(&quotation, "subtotal"), dec!(300));

    app.cleanup().await;
}

#[tokio::test]
async fn items_on_missing_quotation_are_404() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/quotations/99999999-9999-9999-9999-999999999999/items")
        .json(&json!({ "name": "Orphan", "quantity": "1", "unit_price": "10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn items_are_frozen_once_quotation_leaves_draft() {
    let app = TestApp::spawn().await;
    let id = create_draft(&app, "0", "0").await;

    add_item(
        &app,
        &id,
        json!({ "name": "Frozen", "quantity": "1", "unit_price": "10" }),
    )
    .await;
    app.post(&format!("/quotations/{}/status", id))
        .json(&json!({ "status": "sent" }))
        .send()
        .await
        .unwrap();

    let response = app
        .post(&format!("/quotations/{}/items", id))
        .json(&json!({ "name": "Late", "quantity": "1", "unit_price": "10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn invalid_item_payloads_are_unprocessable() {
    let app = TestApp::spawn().await;
    let id = create_draft(&app, "0", "0").await;

    // Zero quantity
    let response = app
        .post(&format!("/quotations/{}/items", id))
        .json(&json!({ "name": "Zero", "quantity": "0", "unit_price": "10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    // Negative unit price
    let response = app
        .post(&format!("/quotations/{}/items", id))
        .json(&json!({ "name": "Negative", "quantity": "1", "unit_price": "-10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    app.cleanup().await;
}

#[tokio::test]
async fn listing_items_orders_by_sort_order() {
    let app = TestApp::spawn().await;
    let id = create_draft(&app, "0", "0").await;

    add_item(
        &app,
        &id,
        json!({ "name": "Second", "quantity": "1", "unit_price": "10", "sort_order": 2 }),
    )
    .await;
    add_item(
        &app,
        &id,
        json!({ "name": "First", "quantity": "1", "unit_price": "10", "sort_order": 1 }),
    )
    .await;

    let response = app
        .get(&format!("/quotations/{}/items", id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let envelope: Value = response.json().await.unwrap();
    let items = envelope["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "First");
    assert_eq!(items[1]["name"], "Second");

    app.cleanup().await;
}
